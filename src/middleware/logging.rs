//! Request id generation and request logging

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{attach_request_id, get_request_id_from_headers};

/// Generates a UUID v4 `x-request-id` for requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = get_request_id_from_headers(request.headers());
    let started = Instant::now();

    let mut response = next.run(request).await;
    if let Some(id) = &request_id {
        response = attach_request_id(response, id);
    }
    let request_id = request_id.unwrap_or_else(|| "-".to_string());

    let status = response.status();
    let latency_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        error!(%method, %path, %request_id, status = status.as_u16(), latency_ms, "request failed");
    } else if status.is_client_error() {
        warn!(%method, %path, %request_id, status = status.as_u16(), latency_ms, "request rejected");
    } else {
        info!(%method, %path, %request_id, status = status.as_u16(), latency_ms, "request completed");
    }

    response
}
