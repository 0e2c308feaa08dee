//! Lois: "who I'm bound to".
//!
//! A Lois is a named emotional bond with one positive and one negative
//! emotion. Burning it (Titus) is a one-way transition: the entry stays on
//! the sheet, marked, and can never be restored.

use serde::{Deserialize, Serialize};

/// A relationship entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lois {
    /// Name of the person or thing the bond is with.
    pub name: String,
    /// Positive emotion tag (P감정).
    pub positive: String,
    /// Negative emotion tag (N감정).
    pub negative: String,
    /// Free-text description.
    pub description: String,
    /// Whether the Lois has been converted to a Titus.
    pub burned: bool,
    /// Row slot on the linked sheet, when imported from one.
    pub sheet_slot: Option<usize>,
}

/// Result of a Titus conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitusOutcome {
    /// The Lois was intact and is now burned.
    Converted,
    /// The Lois was already a Titus; nothing changed.
    AlreadyConverted,
}

/// Result of adding a Lois.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoisUpsert {
    /// Appended as a new entry at this index.
    Added(usize),
    /// Replaced the same-named entry at this index.
    Replaced(usize),
}

impl Lois {
    /// Create an intact Lois.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        positive: impl Into<String>,
        negative: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            positive: positive.into(),
            negative: negative.into(),
            description: description.into(),
            burned: false,
            sheet_slot: None,
        }
    }

    /// Convert to Titus. Idempotent: a second call reports
    /// [`TitusOutcome::AlreadyConverted`].
    pub fn burn(&mut self) -> TitusOutcome {
        if self.burned {
            TitusOutcome::AlreadyConverted
        } else {
            self.burned = true;
            TitusOutcome::Converted
        }
    }
}

/// A memory (메모리) entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Memory {
    /// Subject of the memory.
    pub name: String,
    /// Emotion attached to it.
    pub emotion: String,
    /// Free-text description.
    pub description: String,
}

/// The D-Lois slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DLois {
    /// Number / identifier of the D-Lois (e.g. `No.17`).
    pub number: String,
    /// Name or description.
    pub description: String,
}
