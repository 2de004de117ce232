//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # Routes
//!
//! - `GET /health`: liveness
//! - `POST /convert`: multipart markdown upload
//! - `POST /convert-text`: markdown in a JSON body
//!
//! All routes are documented with `utoipa`. The OpenAPI document is served at `/openapi.json`
//! and rendered at `/docs`.

pub mod handlers;
pub mod models;
