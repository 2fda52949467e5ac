//! HMAC-SHA256 signing and verification
//!
//! Two signature forms are produced and checked here:
//! - raw: the MAC of the exact bytes received (inbound callbacks, platform
//!   requests);
//! - canonical: the MAC of [`canonical_json`] of a JSON value (outbound
//!   redirect URLs and platform notifications).
//!
//! Signatures are lowercase hex.

use hmac::{Hmac, Mac};
use reqwest::Url;
use serde_json::Value as JsonValue;
use sha2::Sha256;

use crate::error::{AppError, AppResult, ValidationError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct SignatureService {
    mac: HmacSha256,
}

impl std::fmt::Debug for SignatureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignatureService { .. }")
    }
}

impl SignatureService {
    pub fn new(secret: &str) -> AppResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::internal(format!("invalid HMAC key: {}", e)))?;
        Ok(Self { mac })
    }

    pub fn sign_bytes(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn sign_canonical(&self, payload: &JsonValue) -> String {
        self.sign_bytes(canonical_json(payload).as_bytes())
    }

    /// Constant-time check of a hex signature over the exact payload bytes.
    pub fn verify_bytes(&self, payload: &[u8], signature: &str) -> bool {
        let expected = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }

    pub fn verify_canonical(&self, payload: &JsonValue, signature: &str) -> bool {
        self.verify_bytes(canonical_json(payload).as_bytes(), signature)
    }

    /// Append `paymentId`, `status`, any `extra` pairs and a `sig` query
    /// parameter to `base`. The signature covers `{paymentId, status}` only.
    pub fn signed_redirect_url(
        &self,
        base: &str,
        payment_id: &str,
        status: &str,
        extra: &[(&str, &str)],
    ) -> AppResult<String> {
        let mut url = Url::parse(base).map_err(|e| {
            AppError::validation(ValidationError::InvalidUrl {
                field: "redirectUrl".to_string(),
                reason: e.to_string(),
            })
        })?;

        let sig = self.sign_canonical(&redirect_payload(payment_id, status));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("paymentId", payment_id);
            query.append_pair("status", status);
            for (key, value) in extra {
                query.append_pair(key, value);
            }
            query.append_pair("sig", &sig);
        }

        Ok(url.into())
    }
}

/// Constant-time byte comparison for shared secrets.
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// The payload covered by a redirect URL signature.
pub fn redirect_payload(payment_id: &str, status: &str) -> JsonValue {
    serde_json::json!({ "paymentId": payment_id, "status": status })
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
