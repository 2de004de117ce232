use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::converter::{ConversionOptions, ConversionOutput, erase_requested};

/// Body of `POST /convert-text`.
///
/// Every field is optional at the parsing level so that a missing `markdown` is reported as a
/// 400 with the usual error body instead of a deserialization failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTextRequest {
    /// Markdown source to convert
    pub markdown: Option<String>,
    /// Title for a newly created presentation. Numbers and booleans are used as their text.
    #[schema(value_type = Option<String>)]
    pub title: Option<Value>,
    /// Append to this existing presentation instead of creating one
    #[schema(value_type = Option<String>)]
    pub presentation_id: Option<Value>,
    /// Erase the existing slides first. Only the string `"true"` enables it; a JSON boolean
    /// does not.
    #[schema(value_type = Option<String>, example = "true")]
    pub erase: Option<Value>,
}

/// Text of a scalar JSON field. Arrays and objects are ignored.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl ConvertTextRequest {
    pub fn options(&self) -> ConversionOptions {
        ConversionOptions::new(
            self.title.as_ref().and_then(scalar_text),
            self.presentation_id.as_ref().and_then(scalar_text),
            erase_requested(self.erase.as_ref().and_then(Value::as_str)),
        )
    }
}

/// Successful conversion envelope shared by both conversion routes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    /// Always `true`
    pub success: bool,
    /// Trimmed stdout of the converter
    pub output: String,
    /// Presentation id found in the output, `null` when none was printed
    pub presentation_id: Option<String>,
    /// Presentation URL found in the output, `null` when none was printed
    pub url: Option<String>,
}

impl From<ConversionOutput> for ConversionResponse {
    fn from(result: ConversionOutput) -> Self {
        let (presentation_id, url) = match result.presentation {
            Some(presentation) => (Some(presentation.id), Some(presentation.url)),
            None => (None, None),
        };

        Self {
            success: true,
            output: result.output,
            presentation_id,
            url,
        }
    }
}

/// Failure envelope returned with HTTP 500.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionFailure {
    /// Always `false`
    pub success: bool,
    /// Error message
    pub error: String,
    /// Full error description, including converter stderr
    pub details: String,
}

/// Body of 4xx responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::PresentationRef;
    use serde_json::json;

    #[test]
    fn test_request_field_names() {
        let request: ConvertTextRequest = serde_json::from_value(json!({
            "markdown": "# Hi",
            "title": "T",
            "presentationId": "ABC",
            "erase": "true"
        }))
        .unwrap();

        let options = request.options();
        assert_eq!(options.title.as_deref(), Some("T"));
        assert_eq!(options.presentation_id.as_deref(), Some("ABC"));
        assert!(options.erase);
    }

    #[test]
    fn test_boolean_erase_is_falsy() {
        let request: ConvertTextRequest = serde_json::from_value(json!({ "markdown": "# Hi", "erase": true })).unwrap();
        assert!(!request.options().erase);

        let request: ConvertTextRequest = serde_json::from_value(json!({ "markdown": "# Hi", "erase": "yes" })).unwrap();
        assert!(!request.options().erase);
    }

    #[test]
    fn test_scalar_title_and_id_become_text() {
        let request: ConvertTextRequest = serde_json::from_value(json!({
            "markdown": "# Hi",
            "title": 2024,
            "presentationId": 42
        }))
        .unwrap();

        let options = request.options();
        assert_eq!(options.title.as_deref(), Some("2024"));
        assert_eq!(options.presentation_id.as_deref(), Some("42"));

        let request: ConvertTextRequest =
            serde_json::from_value(json!({ "markdown": "# Hi", "title": null, "presentationId": ["a"] })).unwrap();
        let options = request.options();
        assert!(options.title.is_none());
        assert!(options.presentation_id.is_none());
    }

    #[test]
    fn test_response_serializes_nulls() {
        let response = ConversionResponse::from(ConversionOutput {
            output: "done".to_string(),
            presentation: None,
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "success": true, "output": "done", "presentationId": null, "url": null })
        );
    }

    #[test]
    fn test_response_from_presentation() {
        let response = ConversionResponse::from(ConversionOutput {
            output: "ok".to_string(),
            presentation: Some(PresentationRef {
                id: "ABC123".to_string(),
                url: "https://docs.google.com/presentation/d/ABC123".to_string(),
            }),
        });

        assert_eq!(response.presentation_id.as_deref(), Some("ABC123"));
        assert_eq!(response.url.as_deref(), Some("https://docs.google.com/presentation/d/ABC123"));
    }
}
