use crate::payments::signature::{canonical_json, SignatureService};
use crate::payments::types::PaymentRecord;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Best-effort status notifications to the host platform.
///
/// Each notification runs on its own task. Failures are logged and dropped.
#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    target: Option<String>,
    signer: SignatureService,
}

impl NotificationService {
    pub fn new(
        target: Option<String>,
        timeout: Duration,
        signer: SignatureService,
    ) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target,
            signer,
        })
    }

    /// A notifier that only logs.
    pub fn disabled(signer: SignatureService) -> Self {
        Self {
            client: Client::new(),
            target: None,
            signer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Signed JSON body and its `x-signature` for `record`.
    pub fn build_payload(&self, record: &PaymentRecord) -> (String, String) {
        let body = canonical_json(&json!({
            "paymentId": record.payment_id,
            "orderId": record.order_id,
            "status": record.status.as_str(),
            "amount": record.amount.to_string(),
            "currency": record.currency,
            "timestamp": Utc::now().to_rfc3339(),
        }));
        let signature = self.signer.sign_bytes(body.as_bytes());
        (body, signature)
    }

    /// Fire and forget. Never blocks the caller on the platform's response.
    pub fn notify_status(&self, record: &PaymentRecord) {
        let Some(target) = self.target.clone() else {
            debug!(
                payment_id = %record.payment_id,
                status = %record.status,
                "Platform notification skipped (no target configured)"
            );
            return;
        };

        let (body, signature) = self.build_payload(record);
        let client = self.client.clone();
        let payment_id = record.payment_id.clone();
        let status = record.status;

        tokio::spawn(async move {
            let result = client
                .post(&target)
                .header(http::header::CONTENT_TYPE, "application/json")
                .header("x-signature", signature)
                .body(body)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(resp) => info!(
                    payment_id = %payment_id,
                    status = %status,
                    http_status = resp.status().as_u16(),
                    "🔔 Platform notified of payment status"
                ),
                Err(e) => warn!(
                    payment_id = %payment_id,
                    status = %status,
                    error = %e,
                    "Platform notification failed"
                ),
            }
        });
    }
}
