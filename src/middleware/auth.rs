//! Request authentication
//!
//! - `x-api-key`: shared secret, required on the payment endpoints.
//! - `x-wix-signature` + `x-wix-instance`: host platform credentials, accepted
//!   instead of the API key on the redirect endpoint. The signature is the hex
//!   HMAC-SHA256 of the raw request body under the platform secret.

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{AppError, AuthError};
use crate::payments::signature::{secure_eq, SignatureService};
use crate::server::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const PLATFORM_SIGNATURE_HEADER: &str = "x-wix-signature";
pub const PLATFORM_INSTANCE_HEADER: &str = "x-wix-instance";

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AuthConfig {
    pub api_key: String,
    pub platform_signer: SignatureService,
}

/// How a merchant request was authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerchantAuth {
    ApiKey,
    Platform { instance_id: Option<String> },
}

impl MerchantAuth {
    pub fn instance_id(&self) -> Option<String> {
        match self {
            MerchantAuth::ApiKey => None,
            MerchantAuth::Platform { instance_id } => instance_id.clone(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn route_of(request: &Request) -> String {
    format!("{} {}", request.method(), request.uri().path())
}

impl AuthConfig {
    pub fn check_api_key(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let presented = presented.ok_or(AuthError::MissingApiKey)?;
        if secure_eq(presented.as_bytes(), self.api_key.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

/// Decode the platform instance header: base64 JSON, optionally preceded by
/// a `signature.` segment. Returns the `instanceId` if present.
pub fn decode_platform_instance(raw: &str) -> Result<Option<String>, AuthError> {
    let encoded = raw.rsplit('.').next().unwrap_or(raw).trim();
    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')))
        .map_err(|e| AuthError::InvalidPlatformInstance {
            reason: format!("not base64: {}", e),
        })?;
    let value: JsonValue =
        serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidPlatformInstance {
            reason: format!("not JSON: {}", e),
        })?;
    let object = value
        .as_object()
        .ok_or_else(|| AuthError::InvalidPlatformInstance {
            reason: "expected a JSON object".to_string(),
        })?;

    Ok(object
        .get("instanceId")
        .and_then(JsonValue::as_str)
        .map(str::to_string))
}

/// Gate for endpoints that accept the API key only.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state
        .auth
        .check_api_key(header(request.headers(), API_KEY_HEADER))
        .map_err(|e| {
            warn!(path = %request.uri().path(), "API key rejected");
            AppError::auth(e).with_context(route_of(&request))
        })?;

    Ok(next.run(request).await)
}

/// Gate for the redirect endpoint: API key, or the host platform's signed
/// headers. Inserts a [`MerchantAuth`] extension for the handler.
pub async fn require_merchant_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    let use_api_key = header(headers, API_KEY_HEADER).is_some()
        || header(headers, PLATFORM_SIGNATURE_HEADER).is_none();

    if use_api_key {
        state
            .auth
            .check_api_key(header(headers, API_KEY_HEADER))
            .map_err(|e| AppError::auth(e).with_context(route_of(&request)))?;
        let mut request = request;
        request.extensions_mut().insert(MerchantAuth::ApiKey);
        return Ok(next.run(request).await);
    }

    let signature = header(headers, PLATFORM_SIGNATURE_HEADER)
        .map(str::to_string)
        .ok_or_else(|| AppError::auth(AuthError::MissingSignature))?;
    let instance = header(headers, PLATFORM_INSTANCE_HEADER)
        .ok_or_else(|| {
            AppError::auth(AuthError::InvalidPlatformInstance {
                reason: format!("missing {} header", PLATFORM_INSTANCE_HEADER),
            })
        })
        .and_then(|raw| decode_platform_instance(raw).map_err(AppError::auth))?;

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            AppError::validation(crate::error::ValidationError::MalformedBody {
                reason: e.to_string(),
            })
        })?;

    if !state.auth.platform_signer.verify_bytes(&bytes, &signature) {
        warn!("Platform signature rejected");
        return Err(AppError::auth(AuthError::InvalidSignature)
            .with_context(format!("{} {}", parts.method, parts.uri.path())));
    }

    debug!(instance_id = ?instance, "Platform request authenticated");

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request
        .extensions_mut()
        .insert(MerchantAuth::Platform { instance_id: instance });
    Ok(next.run(request).await)
}
