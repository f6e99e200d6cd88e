use std::path::Path as FsPath;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::storage::BoxReader;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use tempfile::TempPath;

use crate::error::{AppError, ErrorBody};
use crate::metadata::FileMetadata;
use crate::models::file::UploadResponse;
use crate::service::NewFile;
use crate::state::AppState;
use crate::utils::filename::{content_disposition_value, validate_flat_filename};

/// Room for multipart boundaries and the small text fields.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

const MAX_OWNER_TYPE_LEN: usize = 64;

pub fn upload_body_limit(max_upload_size: u64) -> DefaultBodyLimit {
    let limit = max_upload_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Stores the `file` multipart field under a fresh unique name. `owner_type` is \
        required; `mime_type` overrides the type guessed from the file name.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    // Removed on drop, including when the client goes away mid-upload.
    let temp_path = spool_path()?;

    let unique_name = receive_upload(&state, multipart, &temp_path).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { unique_name })))
}

fn spool_path() -> Result<TempPath, AppError> {
    tempfile::Builder::new()
        .prefix("stowage-upload-")
        .tempfile()
        .map(|file| file.into_temp_path())
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))
}

async fn receive_upload(
    state: &AppState,
    mut multipart: Multipart,
    temp_path: &FsPath,
) -> Result<String, AppError> {
    let mut spooled = false;
    let mut file_name: Option<String> = None;
    let mut owner_type: Option<String> = None;
    let mut mime_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                if spooled {
                    return Err(AppError::Validation("Only one 'file' field is allowed".into()));
                }
                file_name = field
                    .file_name()
                    .filter(|name| !name.trim().is_empty())
                    .map(|name| name.to_string());
                spool_field(field, temp_path, state.config.file.max_upload_size).await?;
                spooled = true;
            }
            Some("owner_type") => {
                owner_type = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read owner_type: {e}"))
                })?);
            }
            Some("mime_type") => {
                mime_type = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read mime_type: {e}"))
                })?);
            }
            _ => {} // Ignore unknown fields.
        }
    }

    if !spooled {
        return Err(AppError::Validation("Missing 'file' field".into()));
    }
    let owner_type = validate_owner_type(owner_type.as_deref())?;

    let mut file = match file_name {
        Some(name) => {
            let name = validate_flat_filename(&name)
                .map_err(|e| AppError::Validation(e.message().into()))?;
            NewFile::named(owner_type, name)
        }
        None => NewFile::new(owner_type),
    };
    if let Some(mime) = mime_type.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        file = file.with_mime_type(mime);
    }

    let reader: BoxReader = Box::new(
        tokio::fs::File::open(temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?,
    );
    Ok(state.files.add(file, reader).await?)
}

async fn spool_field(
    mut field: axum::extract::multipart::Field<'_>,
    temp_path: &FsPath,
    max_size: u64,
) -> Result<(), AppError> {
    let mut temp_file = tokio::fs::File::create(temp_path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

    let mut total_size: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        total_size += chunk.len() as u64;
        if total_size > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        temp_file
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
    }

    temp_file
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
    Ok(())
}

fn validate_owner_type(owner_type: Option<&str>) -> Result<String, AppError> {
    let owner_type = owner_type.map(str::trim).unwrap_or_default();
    if owner_type.is_empty() {
        return Err(AppError::Validation("owner_type is required".into()));
    }
    if owner_type.len() > MAX_OWNER_TYPE_LEN
        || !owner_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::Validation(format!(
            "owner_type must be 1-{MAX_OWNER_TYPE_LEN} characters of [A-Za-z0-9_.-]"
        )));
    }
    Ok(owner_type.to_string())
}

#[utoipa::path(
    get,
    path = "/{unique_name}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download a file",
    description = "Returns the file content. The checksum is the ETag; a matching \
        If-None-Match yields 304. Pending uploads are not served.",
    params(("unique_name" = String, Path, description = "Unique name returned by the upload")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(unique_name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let download = &state.config.download;
    if unique_name.len() < download.min_unique_name_length {
        return Err(file_not_found());
    }

    let metadata = state
        .cache
        .fetch_metadata(&unique_name)
        .await?
        .filter(|m| !m.is_pending())
        .ok_or_else(file_not_found)?;

    let checksum = metadata.checksum.as_deref().unwrap_or_default();
    let etag_value = format!("\"{checksum}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && etag_matches(val, checksum)
    {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
    }

    let size = metadata
        .size
        .and_then(|s| u64::try_from(s).ok())
        .unwrap_or_default();
    let body = if size > download.stream_threshold_bytes {
        let reader = state
            .files
            .fetch_stream(&unique_name)
            .await?
            .ok_or_else(file_not_found)?;
        Body::from_stream(ReaderStream::new(reader))
    } else {
        let data = state
            .cache
            .fetch_data(&unique_name)
            .await?
            .ok_or_else(file_not_found)?;
        Body::from(data)
    };

    let content_type = metadata
        .mime_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::ETAG, &etag_value);

    if download.cache_control_max_age_secs > 0 {
        response = response.header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", download.cache_control_max_age_secs),
        );
    }
    if download.keep_original_name
        && let Some(original_name) = metadata.original_name.as_deref()
    {
        response = response.header(
            header::CONTENT_DISPOSITION,
            content_disposition_value("attachment", original_name),
        );
    }

    response
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/{unique_name}/metadata",
    tag = "Files",
    operation_id = "getFileMetadata",
    summary = "Get file metadata",
    description = "Returns the stored metadata. `size` and `checksum` are null while the upload \
        is still pending.",
    params(("unique_name" = String, Path, description = "Unique name returned by the upload")),
    responses(
        (status = 200, description = "File metadata", body = FileMetadata),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_file_metadata(
    State(state): State<AppState>,
    Path(unique_name): Path<String>,
) -> Result<Json<FileMetadata>, AppError> {
    if unique_name.len() < state.config.download.min_unique_name_length {
        return Err(file_not_found());
    }

    state
        .cache
        .fetch_metadata(&unique_name)
        .await?
        .map(Json)
        .ok_or_else(file_not_found)
}

fn file_not_found() -> AppError {
    AppError::NotFound("File not found".into())
}

/// Matches an `If-None-Match` value against a checksum, quoted or bare.
fn etag_matches(if_none_match: &str, checksum: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|tag| {
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        tag == "*" || tag.trim_matches('"') == checksum
    })
}
