//! HTTP handler for the health check endpoint.

use axum::Json;

use crate::api::models::health::HealthResponse;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check",
    description = "Reports that the service is up. Does not check the converter or credentials.",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse),
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::path::Path;

    #[tokio::test]
    async fn test_health_ignores_system_state() {
        let dir = tempfile::TempDir::new().unwrap();
        // Converter does not exist; health must not care
        let config = create_test_config(dir.path(), Path::new("/nonexistent/md2gslides"));
        let server = create_test_app(config).await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        response.assert_json(&json!({ "status": "healthy", "service": "md2slides" }));
    }
}
