//! Dice: the internal entry-erosion roll, dice-bot result recognition and
//! check expressions.

use std::fmt;
use std::sync::LazyLock;

use dx3_core::CharacterRecord;
use rand::Rng;
use regex::Regex;

use crate::command::CheckTarget;

/// Critical value for a plain check.
pub const CHECK_CRITICAL: i32 = 10;

static D10_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\s*1D10\s*\)?[^0-9\n]*?(?:＞|>|→|->)\s*(\d{1,2})\b").expect("valid regex")
});

/// Roll one ten-sided die.
pub fn roll_d10<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(1..=10)
}

/// Find a `1D10` result in another bot's message, e.g. `(1D10) ＞ 7` or
/// `1d10 → 7`. Values outside 1..=10 are rejected.
#[must_use]
pub fn parse_d10_result(text: &str) -> Option<i32> {
    let caps = D10_RESULT.captures(text)?;
    let value: i32 = caps.get(1)?.as_str().parse().ok()?;
    (1..=10).contains(&value).then_some(value)
}

/// A dice-bot roll request built from a character's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckRoll {
    /// Number of d10s: attribute + erosion D + modifier, at least 1.
    pub dice: i32,
    /// Flat bonus from the skill.
    pub skill: i32,
    /// Critical value.
    pub critical: i32,
}

impl CheckRoll {
    /// Build the roll for `target` on `record`.
    #[must_use]
    pub fn new(record: &CharacterRecord, target: CheckTarget, modifier: i32) -> Self {
        let (attribute, skill) = match target {
            CheckTarget::Skill(s) => (s.attribute(), record.skill(s)),
            CheckTarget::Attribute(a) => (a, 0),
        };
        let dice = record
            .attribute(attribute)
            .saturating_add(record.erosion_d())
            .saturating_add(modifier)
            .max(1);
        Self {
            dice,
            skill,
            critical: CHECK_CRITICAL,
        }
    }
}

impl fmt::Display for CheckRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}DX+{}@{}", self.dice, self.skill, self.critical)
    }
}
