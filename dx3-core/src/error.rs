//! Error types for the DX3 core library.

use thiserror::Error;

/// Top-level error type for all DX3 core operations.
#[derive(Error, Debug)]
pub enum Dx3Error {
    /// The user has no active character in this server.
    #[error("No active character")]
    NoActiveCharacter,

    /// A character with the given name was not found.
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    /// A Lois with the given name was not found on the character.
    #[error("Lois not found: {0}")]
    LoisNotFound(String),

    /// A combo or effect with the given name was not found.
    #[error("Combo not found: {0}")]
    ComboNotFound(String),

    /// The stat/field label is not recognised.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The value does not fit the field.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Which field was being written.
        field: String,
        /// The rejected input.
        value: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, Dx3Error>;
