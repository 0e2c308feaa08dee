//! Sheets REST client: batched reads and single-cell writes.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use dx3_core::config::SheetsConfig;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth::{ServiceAccountKey, TokenProvider};
use crate::coord::{CellRef, RangeRef};
use crate::error::{Result, SheetsError};
use crate::snapshot::Snapshot;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

static URL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{20,}$").expect("valid regex"));

/// Extract a spreadsheet id from a share URL, or accept a bare id.
#[must_use]
pub fn spreadsheet_id(input: &str) -> Option<String> {
    let input = input.trim().trim_matches(|c| c == '<' || c == '>');
    if let Some(caps) = URL_ID.captures(input) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    BARE_ID.is_match(input).then(|| input.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Authenticated client for one service account.
pub struct SheetsClient {
    http: Client,
    auth: TokenProvider,
    tab: String,
    timeout_ms: u64,
}

impl SheetsClient {
    /// Create a client.
    #[must_use]
    pub fn new(http: Client, auth: TokenProvider, tab: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            http,
            auth,
            tab: tab.into(),
            timeout_ms,
        }
    }

    /// Build a client from configuration. Returns `Ok(None)` when Sheets
    /// support is disabled or no credentials are configured.
    ///
    /// # Errors
    /// Returns [`SheetsError::Credentials`] if the configured key cannot
    /// be loaded.
    pub fn from_config(config: &SheetsConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let key = match (&config.credentials_json, &config.credentials_path) {
            (Some(json), _) => ServiceAccountKey::from_json(json)?,
            (None, Some(path)) => ServiceAccountKey::from_file(path)?,
            (None, None) => return Ok(None),
        };
        let http = Client::new();
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let auth = TokenProvider::new(key, http.clone(), timeout)?;
        info!(tab = %config.tab_name, "Sheets client ready");
        Ok(Some(Self::new(
            http,
            auth,
            config.tab_name.clone(),
            config.request_timeout_ms,
        )))
    }

    /// Tab the template lives on.
    #[must_use]
    pub fn tab(&self) -> &str {
        &self.tab
    }

    fn url(spreadsheet_id: &str, tail: &[&str]) -> Result<Url> {
        let mut url =
            Url::parse(API_BASE).map_err(|e| SheetsError::RequestFailed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::RequestFailed("base URL cannot take a path".into()))?
            .pop_if_empty()
            .push(spreadsheet_id)
            .extend(tail);
        Ok(url)
    }

    fn classify(&self, err: reqwest::Error) -> SheetsError {
        if err.is_timeout() {
            SheetsError::Timeout(self.timeout_ms)
        } else {
            SheetsError::from(err)
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: String = resp.text().await.unwrap_or_default().chars().take(500).collect();
        warn!(status = status.as_u16(), "Sheets API returned error");
        Err(SheetsError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch several ranges in one request. Snapshots come back in request
    /// order, each anchored at its range's top-left cell.
    ///
    /// # Errors
    /// Returns a [`SheetsError`] on auth, transport or HTTP failure.
    pub async fn batch_get(&self, spreadsheet_id: &str, ranges: &[RangeRef]) -> Result<Vec<Snapshot>> {
        let token = self.auth.token().await?;
        let url = Self::url(spreadsheet_id, &["values:batchGet"])?;
        let mut query: Vec<(&str, String)> = ranges
            .iter()
            .map(|r| ("ranges", r.qualified(Some(&self.tab))))
            .collect();
        query.push(("valueRenderOption", "FORMATTED_VALUE".into()));
        query.push(("majorDimension", "ROWS".into()));

        let start = Instant::now();
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&query)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let resp = Self::check(resp).await?;
        let body: BatchGetResponse = resp
            .json()
            .await
            .map_err(|e| SheetsError::ParseError(e.to_string()))?;

        if body.value_ranges.len() != ranges.len() {
            return Err(SheetsError::ParseError(format!(
                "asked for {} ranges, got {}",
                ranges.len(),
                body.value_ranges.len()
            )));
        }
        let snapshots: Vec<Snapshot> = ranges
            .iter()
            .zip(body.value_ranges)
            .map(|(range, vr)| {
                let rows = vr
                    .values
                    .into_iter()
                    .map(|row| row.into_iter().map(cell_text).collect())
                    .collect();
                Snapshot::new(range.start, rows)
            })
            .collect();

        debug!(
            spreadsheet = %spreadsheet_id,
            ranges = ranges.len(),
            rows = snapshots.iter().map(|s| s.rows.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis(),
            "Sheets batchGet"
        );
        Ok(snapshots)
    }

    /// Overwrite a single cell with `USER_ENTERED` semantics.
    ///
    /// # Errors
    /// Returns a [`SheetsError`] on auth, transport or HTTP failure.
    pub async fn update_cell(&self, spreadsheet_id: &str, cell: CellRef, value: &str) -> Result<()> {
        let token = self.auth.token().await?;
        let range = RangeRef::new(cell, cell).qualified(Some(&self.tab));
        let url = Self::url(spreadsheet_id, &["values", range.as_str()])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let start = Instant::now();
        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        Self::check(resp).await?;

        debug!(
            spreadsheet = %spreadsheet_id,
            cell = %cell,
            elapsed_ms = start.elapsed().as_millis(),
            "Sheets cell update"
        );
        Ok(())
    }
}
