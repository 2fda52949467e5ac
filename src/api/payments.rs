use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::error::AppResult;
use crate::payments::types::{
    CancelPaymentRequest, CancelResponse, CapturePaymentRequest, CaptureResponse,
    CreatePaymentRequest, CreatePaymentResponse, PaymentRecord, RefundPaymentRequest,
    RefundResponse,
};
use crate::server::AppState;

/// POST /api/payments/create
pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> AppResult<Json<CreatePaymentResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.payments.create_payment(request).await?))
}

/// POST /api/payments/capture
pub async fn capture_payment(
    State(state): State<AppState>,
    payload: Result<Json<CapturePaymentRequest>, JsonRejection>,
) -> AppResult<Json<CaptureResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.payments.capture_payment(request).await?))
}

/// POST /api/payments/refund
pub async fn refund_payment(
    State(state): State<AppState>,
    payload: Result<Json<RefundPaymentRequest>, JsonRejection>,
) -> AppResult<Json<RefundResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.payments.refund_payment(request).await?))
}

/// POST /api/payments/cancel
pub async fn cancel_payment(
    State(state): State<AppState>,
    payload: Result<Json<CancelPaymentRequest>, JsonRejection>,
) -> AppResult<Json<CancelResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.payments.cancel_payment(request).await?))
}

/// GET /api/payments/{payment_id}
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> AppResult<Json<PaymentRecord>> {
    Ok(Json(state.payments.get_payment(&payment_id).await?))
}
