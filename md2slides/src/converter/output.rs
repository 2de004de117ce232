//! Parsing of converter output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const PRESENTATION_URL_PREFIX: &str = "https://docs.google.com/presentation/d/";

static PRESENTATION_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://docs\.google\.com/presentation/d/([a-zA-Z0-9_-]+)").unwrap());

/// A presentation located in converter output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationRef {
    pub id: String,
    pub url: String,
}

/// Find the first Google Slides URL in `output`.
///
/// Output without a URL is not an error; the caller reports `null` for id and url.
pub fn extract_presentation(output: &str) -> Option<PresentationRef> {
    let captures = PRESENTATION_URL.captures(output)?;
    Some(PresentationRef {
        id: captures[1].to_string(),
        url: captures[0].to_string(),
    })
}

/// Viewable URL for a presentation id.
pub fn presentation_url(id: &str) -> String {
    format!("{PRESENTATION_URL_PREFIX}{id}")
}
