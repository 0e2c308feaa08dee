//! # dx3-bot: Discord Front End for DX3
//!
//! Chat and slash commands are parsed into one closed [`command::Command`]
//! enum and executed by a single [`dispatch::Dispatcher`]:
//!
//! ```text
//! !침식률+5 ─┐
//!            ├─► Command ──► Dispatcher ──► Store / SheetGateway ──► Reply
//! /판정 …  ──┘
//! dice bot "(1D10) ＞ 7" ──► PendingRolls ──► erosion on the requester
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod dice;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod handler;
pub mod slash;

pub use command::Command;
pub use dispatch::{Dispatcher, Invocation};
pub use error::BotError;
pub use format::{Card, Reply};
pub use handler::Handler;
