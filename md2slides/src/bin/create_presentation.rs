//! Create an empty Google Slides presentation with a service account and print its URL.
//!
//! ```bash
//! GOOGLE_APPLICATION_CREDENTIALS=/secrets/key.json create-presentation deck.md "Quarterly review"
//! ```

use std::process::ExitCode;

use clap::Parser;
use md2slides::slides::cli::{self, CreatePresentationArgs};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        eprintln!("Failed to install rustls crypto provider");
        return ExitCode::FAILURE;
    }

    let args = CreatePresentationArgs::parse();

    // Stdout carries the URL only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match cli::run(args).await {
        Ok(presentation) => {
            println!("Presentation created: {}", presentation.url());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
