//! The narrow write path: single-cell updates for the few stats that
//! change during play.

use std::fmt;

use crate::coord::CellRef;
use crate::layout::{cell_for, FieldKey, LoisColumn, ScalarField};

/// One cell update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellWrite {
    /// Current HP.
    Hp(i32),
    /// Erosion rate.
    Erosion(i32),
    /// D-Lois number.
    DLoisNumber(String),
    /// D-Lois description.
    DLoisDescription(String),
    /// Titus checkbox of the Lois in sheet slot `slot`.
    LoisBurned {
        /// Sheet slot of the Lois.
        slot: usize,
        /// New checkbox value.
        burned: bool,
    },
}

impl CellWrite {
    /// Target cell, `None` when the slot is outside the Lois block.
    #[must_use]
    pub fn cell(&self) -> Option<CellRef> {
        match self {
            Self::Hp(_) => Some(ScalarField::Hp.cell()),
            Self::Erosion(_) => Some(ScalarField::Erosion.cell()),
            Self::DLoisNumber(_) => Some(ScalarField::DLoisNumber.cell()),
            Self::DLoisDescription(_) => Some(ScalarField::DLoisDescription.cell()),
            Self::LoisBurned { slot, .. } => cell_for(FieldKey::Lois(LoisColumn::Burned), *slot),
        }
    }

    /// Value as sent with `USER_ENTERED`.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Hp(v) | Self::Erosion(v) => v.to_string(),
            Self::DLoisNumber(s) | Self::DLoisDescription(s) => s.clone(),
            Self::LoisBurned { burned, .. } => if *burned { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl fmt::Display for CellWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hp(_) => write!(f, "HP"),
            Self::Erosion(_) => write!(f, "erosion"),
            Self::DLoisNumber(_) => write!(f, "D-Lois number"),
            Self::DLoisDescription(_) => write!(f, "D-Lois description"),
            Self::LoisBurned { slot, .. } => write!(f, "Lois #{slot} burned flag"),
        }
    }
}
