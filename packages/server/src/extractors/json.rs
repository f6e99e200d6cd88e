use axum::{
    extract::{FromRequest, Request},
    http::header,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON request body where an empty body stands for `T::default()`.
///
/// Malformed bodies and non-JSON content types become `AppError::Validation`.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(AppJson(T::default()));
        }

        if !content_type.as_deref().is_some_and(is_json_content_type) {
            return Err(AppError::Validation(
                "Expected request with `Content-Type: application/json`".into(),
            ));
        }

        serde_json::from_slice(&body)
            .map(AppJson)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
    }
}

fn is_json_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence
            .rsplit_once('+')
            .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case("json"))
}
