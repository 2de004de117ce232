//! Direct access to the Google Slides API.
//!
//! Used by the `create-presentation` binary, which creates an empty presentation without going
//! through the external converter.

pub mod auth;
pub mod cli;
pub mod client;

pub use auth::{PRESENTATIONS_SCOPE, ServiceAccountKey, TokenProvider};
pub use client::{Presentation, SlidesClient};
