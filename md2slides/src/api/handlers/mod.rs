//! HTTP request handlers.
//!
//! - [`health`]: liveness probe
//! - [`convert`]: markdown conversion from uploads and JSON text
//!
//! Handlers return [`crate::errors::Error`], which converts to the matching status code and JSON
//! body.

pub mod convert;
pub mod health;
