//! Service-account authentication for Google APIs.
//!
//! A signed RS256 assertion is exchanged at the key's token endpoint for a short-lived bearer
//! token (the OAuth 2.0 JWT bearer grant).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Scope granting read/write access to Google Slides presentations.
pub const PRESENTATIONS_SCOPE: &str = "https://www.googleapis.com/auth/presentations";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file we need. Other fields are ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid service account key")
    }

    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read service account key {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

/// Exchanges service-account assertions for access tokens.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    client: Client,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, scopes: &[&str], client: Client) -> Self {
        Self {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            client,
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Sign a fresh assertion for the configured scopes.
    pub fn assertion(&self) -> anyhow::Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME.as_secs() as i64,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).context("Invalid service account private key")?;
        encode(&header, &claims, &signing_key).context("Failed to sign service account assertion")
    }

    #[instrument(skip(self), fields(client_email = %self.key.client_email), err)]
    pub async fn fetch_token(&self) -> anyhow::Result<AccessToken> {
        let assertion = self.assertion()?;

        debug!("Requesting access token from {}", self.key.token_uri);
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Token endpoint error: {} - {}", status, body));
        }

        let token: TokenResponse = response.json().await.context("error decoding token response")?;
        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in.map(Duration::from_secs),
        })
    }
}
