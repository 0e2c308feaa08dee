//! Core type definitions for the DX3 game model.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Discord guild (server) snowflake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u64);

/// Discord user snowflake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full address of one character record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacterKey {
    /// Server the character is played in.
    pub server: ServerId,
    /// Owning player.
    pub user: UserId,
    /// Character name as typed by the player.
    pub name: String,
}

impl CharacterKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(server: ServerId, user: UserId, name: impl Into<String>) -> Self {
        Self {
            server,
            user,
            name: name.into(),
        }
    }
}

impl fmt::Display for CharacterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.server, self.user, self.name)
    }
}

// ---------------------------------------------------------------------------
// Attributes & skills
// ---------------------------------------------------------------------------

/// The four main attributes (능력치).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// 육체
    Body,
    /// 감각
    Sense,
    /// 정신
    Mind,
    /// 사회
    Social,
}

impl Attribute {
    /// All attributes in sheet order.
    pub const ALL: [Attribute; 4] = [Self::Body, Self::Sense, Self::Mind, Self::Social];

    /// Korean label used in commands and on the sheet.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Body => "육체",
            Self::Sense => "감각",
            Self::Mind => "정신",
            Self::Social => "사회",
        }
    }

    /// Position in [`Attribute::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Body => 0,
            Self::Sense => 1,
            Self::Mind => 2,
            Self::Social => 3,
        }
    }

    /// Parse a Korean label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label)
    }
}

/// Skills (기능), each bound to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// 백병
    Melee,
    /// 회피
    Dodge,
    /// 운전
    Ride,
    /// 사격
    Ranged,
    /// 지각
    Perception,
    /// 예술
    Art,
    /// RC
    Rc,
    /// 의지
    Will,
    /// 지식
    Knowledge,
    /// 교섭
    Negotiation,
    /// 조달
    Procure,
    /// 정보
    Info,
}

impl Skill {
    /// All skills, grouped by attribute in sheet order.
    pub const ALL: [Skill; 12] = [
        Self::Melee,
        Self::Dodge,
        Self::Ride,
        Self::Ranged,
        Self::Perception,
        Self::Art,
        Self::Rc,
        Self::Will,
        Self::Knowledge,
        Self::Negotiation,
        Self::Procure,
        Self::Info,
    ];

    /// Korean label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Melee => "백병",
            Self::Dodge => "회피",
            Self::Ride => "운전",
            Self::Ranged => "사격",
            Self::Perception => "지각",
            Self::Art => "예술",
            Self::Rc => "RC",
            Self::Will => "의지",
            Self::Knowledge => "지식",
            Self::Negotiation => "교섭",
            Self::Procure => "조달",
            Self::Info => "정보",
        }
    }

    /// The attribute this skill rolls with.
    #[must_use]
    pub fn attribute(self) -> Attribute {
        match self {
            Self::Melee | Self::Dodge | Self::Ride => Attribute::Body,
            Self::Ranged | Self::Perception | Self::Art => Attribute::Sense,
            Self::Rc | Self::Will | Self::Knowledge => Attribute::Mind,
            Self::Negotiation | Self::Procure | Self::Info => Attribute::Social,
        }
    }

    /// Position of the skill within its attribute's row (0..3).
    #[must_use]
    pub fn slot(self) -> usize {
        match self {
            Self::Melee | Self::Ranged | Self::Rc | Self::Negotiation => 0,
            Self::Dodge | Self::Perception | Self::Will | Self::Procure => 1,
            Self::Ride | Self::Art | Self::Knowledge | Self::Info => 2,
        }
    }

    /// Parse a Korean label (case-insensitive for `RC`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_cover_three_slots_per_attribute() {
        for attr in Attribute::ALL {
            let mut slots: Vec<usize> = Skill::ALL
                .into_iter()
                .filter(|s| s.attribute() == attr)
                .map(Skill::slot)
                .collect();
            slots.sort_unstable();
            assert_eq!(slots, vec![0, 1, 2], "attribute {attr}");
        }
    }

    #[test]
    fn labels_parse_back() {
        assert_eq!(Skill::from_label("rc"), Some(Skill::Rc));
        assert_eq!(Skill::from_label("사격"), Some(Skill::Ranged));
        assert_eq!(Attribute::from_label("정신"), Some(Attribute::Mind));
        assert_eq!(Attribute::from_label("마음"), None);
    }
}
