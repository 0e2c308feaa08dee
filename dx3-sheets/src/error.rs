//! Sheets error types.

use thiserror::Error;

/// Errors that can occur while talking to a spreadsheet.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// HTTP request failed.
    #[error("Sheets request failed: {0}")]
    RequestFailed(String),

    /// The API answered with a non-success status.
    #[error("Sheets API returned HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Response was not the JSON we expected.
    #[error("Failed to parse Sheets response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("Sheets request timed out after {0}ms")]
    Timeout(u64),

    /// Could not reach the API.
    #[error("Sheets API unavailable: {0}")]
    Unavailable(String),

    /// Service-account key is missing or malformed.
    #[error("Invalid service-account credentials: {0}")]
    Credentials(String),

    /// Token exchange failed.
    #[error("Google authentication failed: {0}")]
    Auth(String),

    /// The spreadsheet does not follow the character sheet template.
    #[error("Sheet not recognised: {0}")]
    NotRecognized(String),

    /// An A1 coordinate could not be parsed.
    #[error("Invalid cell coordinate: {0}")]
    InvalidCoordinate(String),

    /// Field has no cell in the template (index past the block end).
    #[error("No cell for {0}")]
    NoCell(String),
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SheetsError::Timeout(0)
        } else if err.is_connect() {
            SheetsError::Unavailable(err.to_string())
        } else if err.is_decode() {
            SheetsError::ParseError(err.to_string())
        } else {
            SheetsError::RequestFailed(err.to_string())
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SheetsError>;
