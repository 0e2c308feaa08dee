//! Equipment entries as they appear on the character sheet.
//!
//! Values are kept as sheet text; the bot only displays them.

use serde::{Deserialize, Serialize};

/// A weapon row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weapon {
    /// Weapon name.
    pub name: String,
    /// Skill used to attack.
    pub skill: String,
    /// Accuracy modifier.
    pub accuracy: String,
    /// Attack power.
    pub attack: String,
    /// Guard value.
    pub guard: String,
    /// Range.
    pub range: String,
    /// Notes.
    pub note: String,
}

/// An armor row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Armor {
    /// Armor name.
    pub name: String,
    /// Dodge modifier.
    pub dodge: String,
    /// Initiative modifier.
    pub initiative: String,
    /// Armor value.
    pub armor: String,
    /// Notes.
    pub note: String,
}

/// A vehicle row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    /// Vehicle name.
    pub name: String,
    /// Attack power.
    pub attack: String,
    /// Initiative modifier.
    pub initiative: String,
    /// Armor value.
    pub armor: String,
    /// Movement.
    pub movement: String,
    /// Notes.
    pub note: String,
}

/// A general item row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    /// Item name.
    pub name: String,
    /// Notes.
    pub note: String,
}
