//! Service-account authentication.
//!
//! Google's JWT bearer grant: sign a short-lived RS256 assertion with the
//! service-account key, trade it for an access token, and reuse the token
//! until shortly before it expires.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SheetsError};

/// OAuth scope for reading and writing spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The fields of a service-account key file that the grant needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service-account e-mail, the assertion issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String { DEFAULT_TOKEN_URI.to_string() }

impl ServiceAccountKey {
    /// Parse inline key JSON.
    ///
    /// # Errors
    /// Returns [`SheetsError::Credentials`] if the JSON is not a key.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    /// Read a key file.
    ///
    /// # Errors
    /// Returns [`SheetsError::Credentials`] if the file is unreadable or
    /// not a key.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SheetsError::Credentials(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Mints and caches access tokens for one service account.
pub struct TokenProvider {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    http: Client,
    timeout: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Build a provider.
    ///
    /// # Errors
    /// Returns [`SheetsError::Credentials`] if the private key is not a
    /// valid RSA PEM.
    pub fn new(key: ServiceAccountKey, http: Client, timeout: Duration) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private_key: {e}")))?;
        info!(account = %key.client_email, "Service account loaded");
        Ok(Self {
            key,
            signing_key,
            http,
            timeout,
            cached: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one if the cached token is
    /// missing or about to expire.
    ///
    /// # Errors
    /// Returns [`SheetsError::Auth`] if the token endpoint refuses the
    /// assertion.
    pub async fn token(&self) -> Result<String> {
        let now = Utc::now();
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| t.expires_at > now) {
            return Ok(token.value);
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *self.cached.lock() = Some(fresh);
        Ok(value)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SheetsError::Auth(format!("signing assertion: {e}")))
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.assertion(now)?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("HTTP {status}: {body}")));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SheetsError::Auth(format!("token response: {e}")))?;

        let lifetime = (token.expires_in - EXPIRY_MARGIN_SECS).max(0);
        debug!(expires_in = token.expires_in, "Fetched access token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + chrono::Duration::seconds(lifetime),
        })
    }
}
