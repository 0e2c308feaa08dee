//! Erosion rules: erosion D and effect-level bonus.
//!
//! Both are descending step functions over the erosion rate: scan from the
//! highest threshold down and take the first entry whose threshold is
//! `<= rate`. Rates below every threshold map to 0.

use serde::{Deserialize, Serialize};

/// Erosion rate at which combos switch to their high-erosion variant.
pub const HIGH_EROSION_THRESHOLD: i32 = 100;

/// One `(threshold, value)` row of a step table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Minimum erosion rate for this row to apply.
    pub threshold: i32,
    /// Value returned when this row applies.
    pub value: i32,
}

const fn step(threshold: i32, value: i32) -> Step {
    Step { threshold, value }
}

/// Erosion D table, highest threshold first. There is no tier 2 row:
/// 60–99% stays at 1 and 100% goes straight to 3.
pub const EROSION_D_TABLE: [Step; 4] = [
    step(190, 5),
    step(130, 4),
    step(100, 3),
    step(60, 1),
];

/// Effect-level bonus for ordinary characters. Caps at 3.
pub const EFFECT_LEVEL_TABLE: [Step; 5] = [
    step(240, 3),
    step(200, 2),
    step(160, 2),
    step(130, 1),
    step(100, 1),
];

/// Effect-level bonus for apex (기원종) characters. Caps at 4.
pub const APEX_EFFECT_LEVEL_TABLE: [Step; 5] = [
    step(200, 4),
    step(160, 3),
    step(130, 3),
    step(100, 2),
    step(80, 1),
];

/// Look a rate up in a descending step table.
#[must_use]
pub fn lookup(table: &[Step], rate: i32) -> i32 {
    table
        .iter()
        .find(|s| rate >= s.threshold)
        .map_or(0, |s| s.value)
}

/// Erosion D (bonus dice) for an erosion rate.
#[must_use]
pub fn resolve_tier(rate: i32) -> i32 {
    lookup(&EROSION_D_TABLE, rate)
}

/// Effect-level bonus granted by the current erosion rate.
#[must_use]
pub fn effect_level_bonus(rate: i32, apex: bool) -> i32 {
    if apex {
        lookup(&APEX_EFFECT_LEVEL_TABLE, rate)
    } else {
        lookup(&EFFECT_LEVEL_TABLE, rate)
    }
}

/// Displayed level of an effect: base level plus the erosion bonus, capped
/// at `max_level`. A `max_level` of 0 means the effect has no cap.
#[must_use]
pub fn effect_level(base: i32, max_level: i32, rate: i32, apex: bool) -> i32 {
    let raised = base + effect_level_bonus(rate, apex);
    if max_level > 0 {
        raised.min(max_level.max(base))
    } else {
        raised
    }
}

/// Which combo variant applies at an erosion rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErosionBand {
    /// 99% and below.
    Low,
    /// 100% and above.
    High,
}

impl ErosionBand {
    /// Band for a rate.
    #[must_use]
    pub fn for_rate(rate: i32) -> Self {
        if rate >= HIGH_EROSION_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Label shown in combo output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "침식률 99% 이하",
            Self::High => "침식률 100% 이상",
        }
    }
}

/// Outcome of an erosion mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErosionChange {
    /// Rate before the change.
    pub old_rate: i32,
    /// Rate after the change.
    pub new_rate: i32,
    /// Erosion D before the change.
    pub old_tier: i32,
    /// Erosion D after the change.
    pub new_tier: i32,
}

impl ErosionChange {
    /// Whether erosion D moved.
    #[must_use]
    pub fn tier_changed(&self) -> bool {
        self.old_tier != self.new_tier
    }

    /// Signed rate delta.
    #[must_use]
    pub fn delta(&self) -> i32 {
        self.new_rate - self.old_rate
    }

    /// Whether the change crossed the 100% line in either direction.
    #[must_use]
    pub fn crossed_band(&self) -> bool {
        ErosionBand::for_rate(self.old_rate) != ErosionBand::for_rate(self.new_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_breakpoints() {
        assert_eq!(resolve_tier(0), 0);
        assert_eq!(resolve_tier(59), 0);
        assert_eq!(resolve_tier(60), 1);
        assert_eq!(resolve_tier(79), 1);
        assert_eq!(resolve_tier(80), 1);
        assert_eq!(resolve_tier(99), 1);
        assert_eq!(resolve_tier(100), 3);
        assert_eq!(resolve_tier(129), 3);
        assert_eq!(resolve_tier(130), 4);
        assert_eq!(resolve_tier(189), 4);
        assert_eq!(resolve_tier(190), 5);
        assert_eq!(resolve_tier(400), 5);
    }

    #[test]
    fn negative_rates_resolve_to_zero() {
        assert_eq!(resolve_tier(-10), 0);
        assert_eq!(effect_level_bonus(-10, true), 0);
    }

    #[test]
    fn tables_are_descending() {
        for table in [&EROSION_D_TABLE[..], &EFFECT_LEVEL_TABLE, &APEX_EFFECT_LEVEL_TABLE] {
            assert!(table.windows(2).all(|w| w[0].threshold > w[1].threshold));
        }
    }

    #[test]
    fn effect_bonus_caps_differ_by_variant() {
        assert_eq!(effect_level_bonus(99, false), 0);
        assert_eq!(effect_level_bonus(100, false), 1);
        assert_eq!(effect_level_bonus(160, false), 2);
        assert_eq!(effect_level_bonus(999, false), 3);

        assert_eq!(effect_level_bonus(79, true), 0);
        assert_eq!(effect_level_bonus(80, true), 1);
        assert_eq!(effect_level_bonus(100, true), 2);
        assert_eq!(effect_level_bonus(130, true), 3);
        assert_eq!(effect_level_bonus(999, true), 4);
    }

    #[test]
    fn effect_level_respects_max() {
        assert_eq!(effect_level(2, 5, 50, false), 2);
        assert_eq!(effect_level(2, 5, 160, false), 4);
        assert_eq!(effect_level(4, 5, 240, false), 5);
        // Uncapped.
        assert_eq!(effect_level(1, 0, 240, false), 4);
        // A max below the base never lowers the level.
        assert_eq!(effect_level(3, 2, 200, false), 3);
    }

    #[test]
    fn band_switches_at_one_hundred() {
        assert_eq!(ErosionBand::for_rate(99), ErosionBand::Low);
        assert_eq!(ErosionBand::for_rate(100), ErosionBand::High);
    }

    #[test]
    fn change_reports_tier_movement() {
        let change = ErosionChange {
            old_rate: 45,
            new_rate: 105,
            old_tier: resolve_tier(45),
            new_tier: resolve_tier(105),
        };
        assert!(change.tier_changed());
        assert!(change.crossed_band());
        assert_eq!(change.delta(), 60);
        assert_eq!(change.new_tier, 3);
    }
}
