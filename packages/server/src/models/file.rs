use serde::{Deserialize, Serialize};

/// Response DTO for a completed upload.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadResponse {
    /// Storage name to reference the file by.
    #[schema(example = "0192e4a1-7c3e-4b7a-9f1d-2a6c8e0b5d43.jpg")]
    pub unique_name: String,
}

/// Request body for an on-demand garbage collection sweep.
#[derive(Default, Deserialize, utoipa::ToSchema)]
pub struct GcRequest {
    /// Owner types to sweep. Falls back to the configured list when omitted or empty.
    #[serde(default)]
    #[schema(example = json!(["avatar", "attachment"]))]
    pub owner_types: Vec<String>,
}
