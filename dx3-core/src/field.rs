//! Named character fields addressable from chat (`!시트입력`, `!HP-3`).

use std::fmt;

use crate::character::CharacterRecord;
use crate::erosion::ErosionChange;
use crate::error::{Dx3Error, Result};
use crate::types::{Attribute, Skill};

/// A numeric stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    /// Current HP.
    Hp,
    /// Maximum HP.
    MaxHp,
    /// Erosion rate (drives erosion D).
    Erosion,
    /// Base erosion.
    BaseErosion,
    /// Initiative.
    Initiative,
    /// Movement.
    Movement,
    /// Stock points.
    StockPoints,
    /// One of the four attributes.
    Attribute(Attribute),
    /// One of the twelve skills.
    Skill(Skill),
}

/// A free-text profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    /// 코드네임
    CodeName,
    /// 웍스
    Works,
    /// 커버
    Cover,
    /// 브리드
    Breed,
    /// 신드롬 (comma or slash separated)
    Syndromes,
    /// 각성
    Awakening,
    /// 충동
    Impulse,
}

/// Any settable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Numeric stat.
    Numeric(NumericField),
    /// Profile text.
    Text(TextField),
}

/// How a numeric field is changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `+N`
    Add(i32),
    /// `-N`
    Sub(i32),
    /// `=N`
    Set(i32),
}

impl Op {
    /// Parse an operator symbol and its amount.
    #[must_use]
    pub fn parse(symbol: &str, amount: i32) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add(amount)),
            "-" => Some(Self::Sub(amount)),
            "=" => Some(Self::Set(amount)),
            _ => None,
        }
    }

    /// Apply to an old value.
    #[must_use]
    pub fn apply(self, old: i32) -> i32 {
        match self {
            Self::Add(n) => old.saturating_add(n),
            Self::Sub(n) => old.saturating_sub(n),
            Self::Set(n) => n,
        }
    }
}

/// What a field write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Field written.
    pub field: Field,
    /// Previous value, rendered.
    pub old: String,
    /// New value, rendered.
    pub new: String,
    /// Set when the erosion rate moved.
    pub erosion: Option<ErosionChange>,
}

const NUMERIC_LABELS: &[(&str, NumericField)] = &[
    ("HP", NumericField::Hp),
    ("최대HP", NumericField::MaxHp),
    ("침식률", NumericField::Erosion),
    ("침식", NumericField::Erosion),
    ("기본침식", NumericField::BaseErosion),
    ("행동치", NumericField::Initiative),
    ("이동", NumericField::Movement),
    ("재산점", NumericField::StockPoints),
];

const TEXT_LABELS: &[(&str, TextField)] = &[
    ("코드네임", TextField::CodeName),
    ("웍스", TextField::Works),
    ("커버", TextField::Cover),
    ("브리드", TextField::Breed),
    ("신드롬", TextField::Syndromes),
    ("각성", TextField::Awakening),
    ("충동", TextField::Impulse),
];

impl NumericField {
    /// Parse a chat label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        NUMERIC_LABELS
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, f)| *f)
            .or_else(|| Attribute::from_label(label).map(Self::Attribute))
            .or_else(|| Skill::from_label(label).map(Self::Skill))
    }

    /// Canonical label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Hp => "HP",
            Self::MaxHp => "최대HP",
            Self::Erosion => "침식률",
            Self::BaseErosion => "기본침식",
            Self::Initiative => "행동치",
            Self::Movement => "이동",
            Self::StockPoints => "재산점",
            Self::Attribute(a) => a.label(),
            Self::Skill(s) => s.label(),
        }
    }

    /// Current value on a record.
    #[must_use]
    pub fn get(self, record: &CharacterRecord) -> i32 {
        match self {
            Self::Hp => record.hp,
            Self::MaxHp => record.max_hp,
            Self::Erosion => record.erosion_rate(),
            Self::BaseErosion => record.base_erosion,
            Self::Initiative => record.initiative,
            Self::Movement => record.movement,
            Self::StockPoints => record.stock_points,
            Self::Attribute(a) => record.attribute(a),
            Self::Skill(s) => record.skill(s),
        }
    }

    /// Apply `op` to the record. Erosion goes through
    /// [`CharacterRecord::set_erosion`] so erosion D follows.
    pub fn apply(self, record: &mut CharacterRecord, op: Op) -> FieldChange {
        let old = self.get(record);
        let new = op.apply(old);
        let mut erosion = None;
        match self {
            Self::Hp => record.hp = new,
            Self::MaxHp => record.max_hp = new,
            Self::Erosion => erosion = Some(record.set_erosion(new)),
            Self::BaseErosion => record.base_erosion = new,
            Self::Initiative => record.initiative = new,
            Self::Movement => record.movement = new,
            Self::StockPoints => record.stock_points = new,
            Self::Attribute(a) => {
                record.attributes.insert(a, new);
            }
            Self::Skill(s) => {
                record.skills.insert(s, new);
            }
        }
        record.touch();
        FieldChange {
            field: Field::Numeric(self),
            old: old.to_string(),
            new: new.to_string(),
            erosion,
        }
    }
}

impl TextField {
    /// Parse a chat label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        TEXT_LABELS
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, f)| *f)
    }

    /// Canonical label.
    #[must_use]
    pub fn label(self) -> &'static str {
        TEXT_LABELS
            .iter()
            .find(|(_, f)| *f == self)
            .map_or("", |(l, _)| l)
    }

    /// Current value on a record.
    #[must_use]
    pub fn get(self, record: &CharacterRecord) -> String {
        match self {
            Self::CodeName => record.code_name.clone(),
            Self::Works => record.works.clone(),
            Self::Cover => record.cover.clone(),
            Self::Breed => record.breed.clone(),
            Self::Syndromes => record.syndromes.join("/"),
            Self::Awakening => record.awakening.clone(),
            Self::Impulse => record.impulse.clone(),
        }
    }

    /// Overwrite the field.
    pub fn set(self, record: &mut CharacterRecord, value: &str) -> FieldChange {
        let old = self.get(record);
        let value = value.trim().to_string();
        match self {
            Self::CodeName => record.code_name = value,
            Self::Works => record.works = value,
            Self::Cover => record.cover = value,
            Self::Breed => record.breed = value,
            Self::Syndromes => {
                record.syndromes = value
                    .split(['/', ','])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .take(3)
                    .map(str::to_string)
                    .collect();
            }
            Self::Awakening => record.awakening = value,
            Self::Impulse => record.impulse = value,
        }
        record.touch();
        FieldChange {
            field: Field::Text(self),
            old,
            new: self.get(record),
            erosion: None,
        }
    }
}

impl Field {
    /// Parse a chat label into a field.
    ///
    /// # Errors
    /// Returns [`Dx3Error::UnknownField`] for unrecognised labels.
    pub fn parse(label: &str) -> Result<Self> {
        NumericField::parse(label)
            .map(Self::Numeric)
            .or_else(|| TextField::parse(label).map(Self::Text))
            .ok_or_else(|| Dx3Error::UnknownField(label.to_string()))
    }

    /// Canonical label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Numeric(f) => f.label(),
            Self::Text(f) => f.label(),
        }
    }

    /// Write a raw chat value (stat entry). Numeric fields take a plain
    /// integer and overwrite the stat.
    ///
    /// # Errors
    /// Returns [`Dx3Error::InvalidValue`] if a numeric field gets a
    /// non-integer.
    pub fn set(self, record: &mut CharacterRecord, raw: &str) -> Result<FieldChange> {
        match self {
            Self::Numeric(f) => {
                let value = raw.trim().parse::<i32>().map_err(|_| Dx3Error::InvalidValue {
                    field: f.label().to_string(),
                    value: raw.to_string(),
                })?;
                Ok(f.apply(record, Op::Set(value)))
            }
            Self::Text(f) => Ok(f.set(record, raw)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
