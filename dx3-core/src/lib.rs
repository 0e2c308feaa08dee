//! # DX3 Core Library
//!
//! Game model for running Double Cross 3rd Edition sessions over chat.
//!
//! Every player character is a [`CharacterRecord`] keyed by
//! `(server, user, name)` and holds:
//!
//! - **Profile**: code name, cover, works, breed, syndromes
//! - **Numbers**: HP, attributes, skills, erosion rate and the derived erosion D
//! - **Lois**: emotional bonds that can be burned into Titus
//! - **Equipment**: weapons, armor, vehicles, items
//! - **Effects & combos**: powers and their erosion-conditioned variants
//!
//! The [`store::Store`] owns all records for the process lifetime and
//! flushes each JSON document on every write.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod character;
pub mod config;
pub mod correlation;
pub mod erosion;
pub mod error;
pub mod field;
pub mod store;
pub mod types;

pub use character::CharacterRecord;
pub use config::Dx3Config;
pub use error::Dx3Error;
pub use types::*;
