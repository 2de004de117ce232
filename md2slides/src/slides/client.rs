//! Minimal Google Slides REST client.

use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use super::auth::{PRESENTATIONS_SCOPE, ServiceAccountKey, TokenProvider};
use crate::converter::output::presentation_url;

pub const DEFAULT_SLIDES_BASE_URL: &str = "https://slides.googleapis.com/";

#[derive(Debug, Serialize)]
struct CreatePresentationRequest<'a> {
    title: &'a str,
}

/// A presentation as returned by the Slides API. Only the fields we read are kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub presentation_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Presentation {
    pub fn url(&self) -> String {
        presentation_url(&self.presentation_id)
    }
}

pub struct SlidesClient {
    client: Client,
    base_url: Url,
    tokens: TokenProvider,
}

impl SlidesClient {
    const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(key: ServiceAccountKey) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Self::DEFAULT_REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(DEFAULT_SLIDES_BASE_URL)?;
        let tokens = TokenProvider::new(key, &[PRESENTATIONS_SCOPE], client.clone());
        Ok(Self { client, base_url, tokens })
    }

    /// Point the client at a different Slides API root.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Create an empty presentation with the given title.
    #[instrument(skip(self), fields(client_email = %self.tokens.client_email()), err)]
    pub async fn create_presentation(&self, title: &str) -> anyhow::Result<Presentation> {
        let url = ensure_slash(&self.base_url)
            .join("v1/presentations")
            .map_err(|e| anyhow!("Failed to construct presentations URL: {}", e))?;
        let token = self.tokens.fetch_token().await?;
        debug!(expires_in = ?token.expires_in, "Obtained access token");

        debug!("Creating presentation at {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&token.token)
            .json(&CreatePresentationRequest { title })
            .send()
            .await
            .context("Slides API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Slides API error: {} - {}", status, body));
        }

        let presentation: Presentation = response.json().await.context("error decoding presentation response")?;
        info!(presentation_id = %presentation.presentation_id, "Created presentation");
        Ok(presentation)
    }
}

/// Makes sure a url has a trailing slash, so that `join` appends rather than replaces the last
/// path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slides::auth::tests::test_key;
    use crate::test_utils::install_crypto_provider;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token_endpoint(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer",
            })))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer, base: &str) -> SlidesClient {
        SlidesClient::new(test_key(&format!("{}/token", server.uri())))
            .unwrap()
            .with_base_url(Url::parse(&format!("{}{}", server.uri(), base)).unwrap())
    }

    #[test]
    fn test_ensure_slash() {
        let url = Url::parse("https://example.com/api").unwrap();
        assert_eq!(ensure_slash(&url).join("v1/presentations").unwrap().as_str(), "https://example.com/api/v1/presentations");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(ensure_slash(&url).as_str(), "https://example.com/");
    }

    #[test_log::test(tokio::test)]
    async fn test_create_presentation() {
        install_crypto_provider();
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/presentations"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_json(serde_json::json!({ "title": "Quarterly review" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "presentationId": "NEW123",
                "title": "Quarterly review",
                "slides": [],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let presentation = client_for(&server, "/").create_presentation("Quarterly review").await.unwrap();

        assert_eq!(presentation.presentation_id, "NEW123");
        assert_eq!(presentation.title.as_deref(), Some("Quarterly review"));
        assert_eq!(presentation.url(), "https://docs.google.com/presentation/d/NEW123");
    }

    #[tokio::test]
    async fn test_create_presentation_under_base_path() {
        install_crypto_provider();
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("POST"))
            .and(path("/slides/v1/presentations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "presentationId": "P9" })))
            .expect(1)
            .mount(&server)
            .await;

        let presentation = client_for(&server, "/slides").create_presentation("t").await.unwrap();
        assert_eq!(presentation.presentation_id, "P9");
    }

    #[tokio::test]
    async fn test_create_presentation_api_error() {
        install_crypto_provider();
        let server = MockServer::start().await;
        mount_token_endpoint(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/presentations"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = client_for(&server, "/").create_presentation("t").await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn test_token_failure_skips_slides_call() {
        install_crypto_provider();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/presentations"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, "/").create_presentation("t").await.unwrap_err();
        assert!(err.to_string().contains("Token endpoint error"));
    }
}
