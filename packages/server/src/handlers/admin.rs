use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::file::GcRequest;
use crate::service::GcReport;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/gc",
    tag = "Admin",
    operation_id = "runGarbageCollection",
    summary = "Delete unreferenced files",
    description = "Deletes every file of the given owner types that no `file_ref` row points to. \
        Blobs whose deletion fails are reported and keep their metadata for the next sweep.",
    request_body = GcRequest,
    responses(
        (status = 200, description = "Sweep finished", body = GcReport),
        (status = 400, description = "No owner types given or configured (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn run_gc(
    State(state): State<AppState>,
    AppJson(payload): AppJson<GcRequest>,
) -> Result<Json<GcReport>, AppError> {
    let owner_types = if payload.owner_types.is_empty() {
        state.config.gc.owner_types.clone()
    } else {
        payload.owner_types
    };
    if owner_types.is_empty() {
        return Err(AppError::Validation(
            "owner_types is required when none are configured".into(),
        ));
    }

    let report = state.gc.delete_unreferenced(&owner_types).await?;
    Ok(Json(report))
}
