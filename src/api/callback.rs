use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    Json,
};
use tracing::info;

use crate::error::AppResult;
use crate::payments::types::CallbackResponse;
use crate::server::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// POST /api/callback
///
/// The body is taken raw so the signature is checked against the exact bytes
/// the caller signed.
pub async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<CallbackResponse>> {
    let body = body?;
    info!(bytes = body.len(), "Received payment callback");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let response = state.payments.process_callback(&body, signature).await?;
    Ok(Json(response))
}
