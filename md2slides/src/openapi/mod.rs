//! OpenAPI documentation for the conversion service.
//!
//! The document is served at `/openapi.json` with a Scalar UI at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "md2slides",
        description = "Convert markdown documents into Google Slides presentations.

Conversion is delegated to an external converter executable authenticated with a Google service account. \
Each request runs one converter process, bounded by the configured timeout."
    ),
    paths(
        api::handlers::health::health,
        api::handlers::convert::convert_file,
        api::handlers::convert::convert_text,
    ),
    components(
        schemas(
            api::models::health::HealthResponse,
            api::models::convert::ConvertTextRequest,
            api::models::convert::ConversionResponse,
            api::models::convert::ConversionFailure,
            api::models::convert::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service liveness."),
        (name = "convert", description = "Markdown to Google Slides conversion.

Send markdown either as a multipart file upload (`/convert`) or as JSON text (`/convert-text`). \
Optional fields:
- `title`: title for a new presentation
- `presentationId`: append to an existing presentation instead
- `erase`: the string `\"true\"` erases existing slides before appending"),
    )
)]
pub struct ApiDoc;
