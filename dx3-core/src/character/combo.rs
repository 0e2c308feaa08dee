//! Effects and combos.
//!
//! An [`Effect`] is a single power with a base level. A [`Combo`] bundles
//! effects into one action and carries two variants, one for erosion
//! 99% and below and one for 100% and above.

use serde::{Deserialize, Serialize};

use crate::erosion::{self, ErosionBand};

/// Critical value used when the sheet leaves it blank.
pub const DEFAULT_CRITICAL: &str = "10";

/// A single effect row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effect {
    /// Effect name.
    pub name: String,
    /// Base (acquired) level.
    pub level: i32,
    /// Maximum level; 0 when the sheet leaves it blank.
    pub max_level: i32,
    /// Timing.
    pub timing: String,
    /// Skill.
    pub skill: String,
    /// Difficulty.
    pub difficulty: String,
    /// Target.
    pub target: String,
    /// Range.
    pub range: String,
    /// Erosion cost as written on the sheet.
    pub erosion_cost: String,
    /// Restriction.
    pub restriction: String,
    /// Effect text.
    pub description: String,
}

impl Effect {
    /// Level at the given erosion rate.
    #[must_use]
    pub fn level_at(&self, rate: i32, apex: bool) -> i32 {
        erosion::effect_level(self.level, self.max_level, rate, apex)
    }
}

/// One erosion-conditioned half of a combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboVariant {
    /// Effects used, as listed on the sheet.
    pub effects: String,
    /// Free-text content.
    pub content: String,
    /// Dice modifier.
    pub dice: String,
    /// Critical value.
    pub critical: String,
    /// Attack modifier.
    pub attack: String,
}

impl Default for ComboVariant {
    fn default() -> Self {
        Self {
            effects: String::new(),
            content: String::new(),
            dice: String::new(),
            critical: DEFAULT_CRITICAL.to_string(),
            attack: String::new(),
        }
    }
}

/// A combo decoded from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Combo {
    /// Combo name.
    pub name: String,
    /// Timing.
    pub timing: String,
    /// Skill.
    pub skill: String,
    /// Difficulty.
    pub difficulty: String,
    /// Target.
    pub target: String,
    /// Range.
    pub range: String,
    /// Restriction.
    pub restriction: String,
    /// Erosion cost as written on the sheet.
    pub erosion_cost: String,
    /// Variant for erosion 99% and below.
    pub low: ComboVariant,
    /// Variant for erosion 100% and above.
    pub high: ComboVariant,
}

impl Combo {
    /// The variant that applies in `band`.
    #[must_use]
    pub fn variant(&self, band: ErosionBand) -> &ComboVariant {
        match band {
            ErosionBand::Low => &self.low,
            ErosionBand::High => &self.high,
        }
    }

    /// Fixed part of the erosion cost.
    #[must_use]
    pub fn cost(&self) -> i32 {
        parse_cost(&self.erosion_cost)
    }
}

/// A combo registered by hand through chat, stored apart from the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalCombo {
    /// Combo name.
    pub name: String,
    /// Erosion cost applied on use.
    pub erosion_cost: i32,
    /// Free-text content.
    pub content: String,
}

/// Sum the plain integer terms of a cost such as `4+2`.
///
/// Dice terms (`1D10`), negative terms and anything unparseable count as
/// 0; the player rolls dice separately. The sum saturates at `i32::MAX`.
#[must_use]
pub fn parse_cost(text: &str) -> i32 {
    text.split('+')
        .filter_map(|term| term.trim().parse::<i32>().ok())
        .map(|term| term.max(0))
        .fold(0, i32::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_parsing() {
        assert_eq!(parse_cost("4"), 4);
        assert_eq!(parse_cost("4+3"), 7);
        assert_eq!(parse_cost(" 2 + 1D10 "), 2);
        assert_eq!(parse_cost(""), 0);
        assert_eq!(parse_cost("없음"), 0);
    }

    #[test]
    fn cost_never_lowers_erosion() {
        assert_eq!(parse_cost("-30"), 0);
        assert_eq!(parse_cost("5+-3"), 5);
    }

    #[test]
    fn cost_saturates_instead_of_overflowing() {
        assert_eq!(parse_cost("2000000000+2000000000"), i32::MAX);
        assert_eq!(parse_cost("2147483647+1+1D10"), i32::MAX);
    }

    #[test]
    fn variant_follows_band() {
        let combo = Combo {
            name: "코키토스".into(),
            low: ComboVariant {
                effects: "A".into(),
                ..ComboVariant::default()
            },
            high: ComboVariant {
                effects: "B".into(),
                ..ComboVariant::default()
            },
            ..Combo::default()
        };
        assert_eq!(combo.variant(ErosionBand::for_rate(99)).effects, "A");
        assert_eq!(combo.variant(ErosionBand::for_rate(100)).effects, "B");
    }

    #[test]
    fn blank_critical_defaults_to_ten() {
        assert_eq!(ComboVariant::default().critical, "10");
    }
}
