use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness response. Does not depend on the converter or credentials.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "md2slides")]
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            service: "md2slides".to_string(),
        }
    }
}
