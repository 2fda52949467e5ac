use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use tracing::info;

use crate::error::AppResult;
use crate::middleware::auth::MerchantAuth;
use crate::payments::types::{RedirectRequest, RedirectResponse};
use crate::server::AppState;

/// POST /api/redirect
pub async fn create_redirect(
    State(state): State<AppState>,
    Extension(auth): Extension<MerchantAuth>,
    payload: Result<Json<RedirectRequest>, JsonRejection>,
) -> AppResult<Json<RedirectResponse>> {
    let Json(request) = payload?;
    info!(order_id = %request.order_id, auth = ?auth, "Redirect requested");

    let response = state
        .payments
        .redirect(request, auth.instance_id())
        .await?;
    Ok(Json(response))
}
