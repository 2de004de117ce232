//! The `create-presentation` command.
//!
//! Any error returned from [`run`] makes the binary exit with status 1.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing::warn;
use url::Url;

use super::{Presentation, ServiceAccountKey, SlidesClient};

#[derive(Parser, Debug, Clone)]
#[command(name = "create-presentation", about = "Create an empty Google Slides presentation")]
pub struct CreatePresentationArgs {
    /// Markdown source. Recorded but not uploaded; the presentation is created empty.
    #[arg(default_value = "# Title\n\n## Slide 1")]
    pub markdown: String,

    /// Title of the new presentation
    #[arg(default_value = "New presentation")]
    pub title: String,

    /// Path to the service-account key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Override the Slides API root
    #[arg(long, env = "MD2SLIDES_SLIDES_BASE_URL")]
    pub base_url: Option<Url>,
}

/// Create the presentation described by `args`.
pub async fn run(args: CreatePresentationArgs) -> anyhow::Result<Presentation> {
    let Some(credentials) = args.credentials.filter(|path| path.is_file()) else {
        bail!("Credentials file not found. Set GOOGLE_APPLICATION_CREDENTIALS or pass --credentials");
    };

    if !args.markdown.is_empty() {
        warn!(bytes = args.markdown.len(), "Markdown content is not transmitted; creating an empty presentation");
    }

    let key = ServiceAccountKey::from_file(&credentials).await?;
    let mut client = SlidesClient::new(key)?;
    if let Some(base_url) = args.base_url {
        client = client.with_base_url(base_url);
    }

    client.create_presentation(&args.title).await
}
