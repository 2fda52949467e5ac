use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub endpoints: Vec<&'static str>,
}

pub const ENDPOINTS: [&str; 9] = [
    "GET  /",
    "GET  /health",
    "POST /api/redirect",
    "POST /api/payments/create",
    "POST /api/payments/capture",
    "POST /api/payments/refund",
    "POST /api/payments/cancel",
    "GET  /api/payments/{paymentId}",
    "POST /api/callback",
];

/// GET /
pub async fn root() -> Json<RootResponse> {
    debug!("Root endpoint accessed");
    Json(RootResponse {
        message: "Checkout bridge payment API",
        endpoints: ENDPOINTS.to_vec(),
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let payments = match state.payments.store().len().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Payment store unavailable for health check");
            None
        }
    };

    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        payments,
    })
}
