//! # dx3-sheets: Google Sheets Layer for DX3
//!
//! The spreadsheet is the canonical character sheet. This crate knows the
//! template's cell layout and moves data between it and
//! [`dx3_core::CharacterRecord`]:
//!
//! ```text
//! read:  3 batched ranges ──► Snapshot ──► value_at(cell) ──► CharacterRecord
//! write: CellWrite ──► cell_for(field) ──► single-cell PUT
//! ```
//!
//! All network access goes through the [`SheetGateway`] trait so that the
//! bot can run against [`MemorySheet`] in tests.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod coord;
pub mod decode;
pub mod error;
pub mod gateway;
pub mod layout;
pub mod snapshot;
pub mod write;

pub use client::{spreadsheet_id, SheetsClient};
pub use coord::CellRef;
pub use decode::decode_character;
pub use error::SheetsError;
pub use gateway::{MemorySheet, SheetGateway};
pub use snapshot::{CellSource, SheetData, Snapshot};
pub use write::CellWrite;
