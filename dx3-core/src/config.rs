//! Configuration for the DX3 bot.
//!
//! Maps directly to `dx3.toml`. Every section is optional; environment
//! variables override secrets after loading (see [`Dx3Config::apply_env`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dx3Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Discord connection.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Google Sheets integration.
    #[serde(default)]
    pub sheets: SheetsConfig,
    /// Erosion roll handling.
    #[serde(default)]
    pub erosion: ErosionConfig,
}

impl Dx3Config {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `Dx3Error::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::Dx3Error::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Override secrets and ids from the process environment:
    /// `DISCORD_TOKEN`, `OWNER_ID`, `GOOGLE_APPLICATION_CREDENTIALS`,
    /// `GOOGLE_CREDENTIALS_JSON`.
    ///
    /// # Errors
    /// Returns `Dx3Error::Config` if `OWNER_ID` is not a number.
    pub fn apply_env(&mut self) -> crate::error::Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// [`Dx3Config::apply_env`] over an arbitrary lookup.
    ///
    /// # Errors
    /// Returns `Dx3Error::Config` if `OWNER_ID` is not a number.
    pub fn apply_vars<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.is_empty()) {
            self.discord.token = token;
        }
        if let Some(owner) = lookup("OWNER_ID").filter(|o| !o.is_empty()) {
            let id = owner
                .trim()
                .parse::<u64>()
                .map_err(|e| crate::Dx3Error::Config(format!("OWNER_ID: {e}")))?;
            self.discord.owner_id = Some(id);
        }
        if let Some(path) = lookup("GOOGLE_APPLICATION_CREDENTIALS").filter(|p| !p.is_empty()) {
            self.sheets.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(json) = lookup("GOOGLE_CREDENTIALS_JSON").filter(|j| !j.is_empty()) {
            self.sheets.credentials_json = Some(json);
        }
        Ok(())
    }

    /// Whether spreadsheet features should be switched on.
    #[must_use]
    pub fn sheets_enabled(&self) -> bool {
        self.sheets.enabled
            && (self.sheets.credentials_path.is_some() || self.sheets.credentials_json.is_some())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
    /// Directory holding the JSON documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Chat command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            data_dir: default_data_dir(),
            prefix: default_prefix(),
        }
    }
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied through `DISCORD_TOKEN`.
    #[serde(default)]
    pub token: String,
    /// User allowed to run administrative commands.
    #[serde(default)]
    pub owner_id: Option<u64>,
    /// Register slash commands on startup.
    #[serde(default = "default_true")]
    pub register_slash_commands: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner_id: None,
            register_slash_commands: true,
        }
    }
}

/// Google Sheets integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Master switch; credentials are still required.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Service-account key file.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    /// Service-account key, inline JSON.
    #[serde(default)]
    pub credentials_json: Option<String>,
    /// Tab holding the character sheet template.
    #[serde(default = "default_tab_name")]
    pub tab_name: String,
    /// Hard timeout for any Sheets request in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_path: None,
            credentials_json: None,
            tab_name: default_tab_name(),
            request_timeout_ms: default_timeout_ms(),
        }
    }
}

/// Erosion roll handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErosionConfig {
    /// Roll entry erosion in-process instead of waiting for a dice bot.
    #[serde(default)]
    pub internal_roll: bool,
    /// Pending dice-bot requests older than this are ignored.
    #[serde(default = "default_ttl")]
    pub pending_roll_ttl_secs: u64,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            internal_roll: false,
            pending_roll_ttl_secs: default_ttl(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_prefix() -> String { "!".to_string() }
fn default_tab_name() -> String { "캐릭터시트".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_ttl() -> u64 { 300 }
