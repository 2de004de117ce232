//! HTTP handlers for markdown conversion.
//!
//! Both routes follow the same sequence: stage the markdown in a temp file, take a conversion
//! slot, materialize credentials, run the converter, and respond with the conversion envelope.
//! Temp files are removed when the request finishes, whatever the outcome.

use std::path::{Path, PathBuf};

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError},
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use chrono::Utc;
use scopeguard::ScopeGuard;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::AppState;
use crate::api::models::convert::{ConversionResponse, ConvertTextRequest};
use crate::converter::{ConversionOptions, erase_requested};
use crate::errors::{Error, Result};

/// A staged markdown file, deleted when dropped.
type TempMarkdown = ScopeGuard<PathBuf, fn(PathBuf)>;

fn discard(path: PathBuf) {
    match std::fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "Removed temp markdown"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp markdown"),
    }
}

fn temp_markdown(path: PathBuf) -> TempMarkdown {
    scopeguard::guard(path, discard as fn(PathBuf))
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", e.body_text()),
        }
    }
}

/// Stream the uploaded file field to a uniquely named file in `dir`.
async fn stage_upload(dir: &Path, mut field: Field<'_>) -> Result<TempMarkdown> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| Error::Internal {
        operation: format!("create upload directory {}: {e}", dir.display()),
    })?;

    let upload = temp_markdown(dir.join(Uuid::new_v4().simple().to_string()));
    let mut file = tokio::fs::File::create(&*upload).await.map_err(|e| Error::Internal {
        operation: format!("store uploaded markdown: {e}"),
    })?;

    let mut total_size = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        total_size += chunk.len();
        file.write_all(&chunk).await.map_err(|e| Error::Internal {
            operation: format!("store uploaded markdown: {e}"),
        })?;
    }
    file.flush().await.map_err(|e| Error::Internal {
        operation: format!("store uploaded markdown: {e}"),
    })?;

    debug!(
        path = %upload.display(),
        filename = ?field.file_name(),
        total_size,
        "Stored uploaded markdown"
    );

    Ok(upload)
}

/// Write markdown text to a timestamp-named file in `dir`.
async fn stage_text(dir: &Path, markdown: &str) -> Result<TempMarkdown> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| Error::Internal {
        operation: format!("create temp directory {}: {e}", dir.display()),
    })?;

    // The uuid suffix keeps concurrent requests within the same millisecond apart
    let name = format!("markdown_{}_{}.md", Utc::now().timestamp_millis(), Uuid::new_v4().simple());
    let staged = temp_markdown(dir.join(name));
    tokio::fs::write(&*staged, markdown).await.map_err(|e| Error::Internal {
        operation: format!("write markdown to temp file: {e}"),
    })?;

    Ok(staged)
}

/// Run the converter on a staged file. The caller holds the conversion slot.
async fn run_conversion(state: &AppState, markdown: &Path, options: &ConversionOptions) -> Result<ConversionResponse> {
    let credentials = state.credentials.materialize().await.map_err(|e| Error::Internal {
        operation: format!("write credentials file: {e}"),
    })?;

    let result = state.converter.convert(markdown, options, credentials.as_deref()).await?;

    Ok(ConversionResponse::from(result))
}

#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    summary = "Convert uploaded markdown",
    description = "Convert an uploaded markdown file into a Google Slides presentation. \
        Form fields: `file` (required), `title`, `presentationId`, `erase` (`\"true\"` to erase).",
    request_body(
        content_type = "multipart/form-data",
        description = "Markdown file upload with optional conversion fields"
    ),
    responses(
        (status = 200, description = "Conversion finished", body = ConversionResponse),
        (status = 400, description = "No file provided", body = crate::api::models::convert::ErrorResponse),
        (status = 413, description = "Payload too large", body = crate::api::models::convert::ErrorResponse),
        (status = 429, description = "Too many conversions in progress", body = crate::api::models::convert::ErrorResponse),
        (status = 500, description = "Conversion failed", body = crate::api::models::convert::ConversionFailure),
    )
)]
#[instrument(skip_all)]
pub async fn convert_file(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<ConversionResponse>> {
    let mut upload: Option<TempMarkdown> = None;
    let mut title: Option<String> = None;
    let mut presentation_id: Option<String> = None;
    let mut erase: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            // Only a real file part counts; a plain `file` text field is ignored
            "file" if upload.is_none() && field.file_name().is_some() => {
                upload = Some(stage_upload(&state.config.uploads.dir, field).await?);
            }
            "title" => title = Some(field.text().await.map_err(multipart_error)?),
            "presentationId" => presentation_id = Some(field.text().await.map_err(multipart_error)?),
            "erase" => erase = Some(field.text().await.map_err(multipart_error)?),
            _ => {
                debug!(field = %field_name, "Ignoring multipart field");
            }
        }
    }

    let upload = upload.ok_or_else(|| Error::BadRequest {
        message: "No markdown file provided".to_string(),
    })?;

    let options = ConversionOptions::new(title, presentation_id, erase_requested(erase.as_deref()));
    info!(title = ?options.title, presentation_id = ?options.presentation_id, erase = options.erase, "Converting uploaded markdown");

    let _permit = state.limiters.acquire_conversion().await?;
    let response = run_conversion(&state, &upload, &options).await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/convert-text",
    tag = "convert",
    summary = "Convert markdown text",
    description = "Convert markdown sent in a JSON body into a Google Slides presentation.",
    request_body = ConvertTextRequest,
    responses(
        (status = 200, description = "Conversion finished", body = ConversionResponse),
        (status = 400, description = "No markdown provided", body = crate::api::models::convert::ErrorResponse),
        (status = 413, description = "Payload too large", body = crate::api::models::convert::ErrorResponse),
        (status = 429, description = "Too many conversions in progress", body = crate::api::models::convert::ErrorResponse),
        (status = 500, description = "Conversion failed", body = crate::api::models::convert::ConversionFailure),
    )
)]
#[instrument(skip_all)]
pub async fn convert_text(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConvertTextRequest>, JsonRejection>,
) -> Result<Json<ConversionResponse>> {
    let Json(request) = payload.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge { message: e.body_text() }
        } else {
            Error::BadRequest { message: e.body_text() }
        }
    })?;

    let options = request.options();
    let markdown = request.markdown.filter(|m| !m.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "No markdown content provided".to_string(),
    })?;

    info!(title = ?options.title, presentation_id = ?options.presentation_id, erase = options.erase, "Converting markdown text");

    let _permit = state.limiters.acquire_conversion().await?;
    let staged = stage_text(&state.config.uploads.text_dir, &markdown).await?;
    let response = run_conversion(&state, &staged, &options).await?;

    Ok(Json(response))
}
