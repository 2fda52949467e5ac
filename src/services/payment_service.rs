//! Payment orchestration
//!
//! Each public operation looks up a record, checks the status guard for the
//! operation and mutates the record through the store. The signature service
//! is consulted for callback verification and for signing outbound URLs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, AuthError, ValidationError};
use crate::payments::signature::SignatureService;
use crate::payments::state::Transition;
use crate::payments::store::PaymentStore;
use crate::payments::types::{
    normalize_currency, validate_positive, CallbackRequest, CallbackResponse, CallbackStatus,
    CancelPaymentRequest, CancelResponse, CapturePaymentRequest, CaptureResponse,
    CreatePaymentRequest, CreatePaymentResponse, PaymentRecord, PaymentStatus, RedirectRequest,
    RedirectResponse, RefundPaymentRequest, RefundResponse,
};
use crate::services::notification::NotificationService;

/// Where the hosted checkout form lives and what currency to assume.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub checkout_url: String,
    pub default_currency: String,
}

pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    signer: SignatureService,
    notifier: NotificationService,
    settings: CheckoutSettings,
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

fn require_id(payment_id: &str) -> AppResult<&str> {
    let payment_id = payment_id.trim();
    if payment_id.is_empty() {
        return Err(AppError::validation(ValidationError::MissingField {
            field: "paymentId".to_string(),
        }));
    }
    Ok(payment_id)
}

fn non_empty(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        signer: SignatureService,
        notifier: NotificationService,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            signer,
            notifier,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn signer(&self) -> &SignatureService {
        &self.signer
    }

    /// Create a pending payment and the URL of the hosted checkout form.
    pub async fn redirect(
        &self,
        request: RedirectRequest,
        platform_instance_id: Option<String>,
    ) -> AppResult<RedirectResponse> {
        let order_id = request.order_id.trim().to_string();
        if order_id.is_empty() {
            return Err(AppError::validation(ValidationError::MissingField {
                field: "orderId".to_string(),
            }));
        }
        validate_positive(&request.amount, "amount")?;
        let currency = normalize_currency(
            request.currency.as_deref(),
            &self.settings.default_currency,
        )?;
        request.callback_urls.validate()?;

        let payment_id = new_id("pay");
        let mut record = PaymentRecord::new_pending(
            payment_id.clone(),
            order_id,
            request.amount,
            currency,
            request.callback_urls,
        );
        record.platform_instance_id = platform_instance_id;

        let amount = record.amount.to_string();
        let redirect_url = self.signer.signed_redirect_url(
            &self.settings.checkout_url,
            &payment_id,
            PaymentStatus::Pending.as_str(),
            &[
                ("orderId", record.order_id.as_str()),
                ("amount", amount.as_str()),
                ("currency", record.currency.as_str()),
            ],
        )?;

        info!(
            payment_id = %record.payment_id,
            order_id = %record.order_id,
            amount = %record.amount,
            currency = %record.currency,
            "Pending payment created"
        );
        self.store.put(record).await?;

        Ok(RedirectResponse {
            redirect_url,
            transaction_id: payment_id,
            status: PaymentStatus::Pending,
        })
    }

    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> AppResult<CreatePaymentResponse> {
        let payment_id = require_id(&request.payment_id)?;
        let card = request.card_details.validate(Utc::now())?;

        let record = self
            .store
            .update(
                payment_id,
                Box::new(move |record: &mut PaymentRecord| {
                    record.apply(Transition::Create { card })
                }),
            )
            .await?;

        let card = record
            .card
            .clone()
            .ok_or_else(|| AppError::internal("created payment has no card"))?;

        info!(
            payment_id = %record.payment_id,
            card_last4 = %card.last4,
            "Card payment created"
        );

        Ok(CreatePaymentResponse {
            payment_id: record.payment_id,
            status: record.status,
            amount: record.amount,
            currency: record.currency,
            card,
            timestamp: record.updated_at,
        })
    }

    pub async fn capture_payment(
        &self,
        request: CapturePaymentRequest,
    ) -> AppResult<CaptureResponse> {
        let payment_id = require_id(&request.payment_id)?;
        let amount = request.amount;

        let record = self
            .store
            .update(
                payment_id,
                Box::new(move |record: &mut PaymentRecord| {
                    record.apply(Transition::Capture { amount })
                }),
            )
            .await?;

        let captured = record
            .captured_amount
            .clone()
            .ok_or_else(|| AppError::internal("captured payment has no captured amount"))?;

        info!(payment_id = %record.payment_id, amount = %captured, "Payment captured");

        Ok(CaptureResponse {
            capture_id: new_id("cap"),
            payment_id: record.payment_id,
            status: record.status,
            amount: captured,
            timestamp: record.updated_at,
        })
    }

    pub async fn refund_payment(&self, request: RefundPaymentRequest) -> AppResult<RefundResponse> {
        let payment_id = require_id(&request.payment_id)?;
        let amount = request.amount;
        let reason = non_empty(request.reason);

        let record = self
            .store
            .update(
                payment_id,
                Box::new(move |record: &mut PaymentRecord| {
                    record.apply(Transition::Refund { amount, reason })
                }),
            )
            .await?;

        let refunded = record
            .refunded_amount
            .clone()
            .ok_or_else(|| AppError::internal("refunded payment has no refunded amount"))?;

        info!(payment_id = %record.payment_id, amount = %refunded, "Payment refunded");

        Ok(RefundResponse {
            refund_id: new_id("ref"),
            payment_id: record.payment_id,
            status: record.status,
            amount: refunded,
            reason: record.refund_reason,
            timestamp: record.updated_at,
        })
    }

    pub async fn cancel_payment(&self, request: CancelPaymentRequest) -> AppResult<CancelResponse> {
        let payment_id = require_id(&request.payment_id)?;
        let reason = non_empty(request.reason);

        let record = self
            .store
            .update(
                payment_id,
                Box::new(move |record: &mut PaymentRecord| {
                    record.apply(Transition::Cancel { reason })
                }),
            )
            .await?;

        info!(payment_id = %record.payment_id, "Payment canceled");

        Ok(CancelResponse {
            cancellation_id: new_id("can"),
            payment_id: record.payment_id,
            status: record.status,
            reason: record.cancel_reason,
            timestamp: record.updated_at,
        })
    }

    /// Verify and apply a checkout callback, then point the shopper back to
    /// the host platform.
    ///
    /// `body` must be the exact bytes received; the signature covers them.
    pub async fn process_callback(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> AppResult<CallbackResponse> {
        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::auth(AuthError::MissingSignature))?;

        if !self.signer.verify_bytes(body, signature) {
            warn!("Callback rejected: signature mismatch");
            return Err(AppError::auth(AuthError::InvalidSignature));
        }

        let request: CallbackRequest = serde_json::from_slice(body).map_err(|e| {
            AppError::validation(ValidationError::MalformedBody {
                reason: e.to_string(),
            })
        })?;
        let payment_id = require_id(&request.payment_id)?;
        let status: CallbackStatus = request.status.parse()?;

        let record = self
            .store
            .update(
                payment_id,
                Box::new(move |record: &mut PaymentRecord| {
                    record.apply(Transition::Callback { status })
                }),
            )
            .await?;

        let redirect_url = self.signer.signed_redirect_url(
            record.callback_urls.url_for(status),
            &record.payment_id,
            status.as_str(),
            &[],
        )?;

        info!(
            payment_id = %record.payment_id,
            order_id = %record.order_id,
            status = %status.as_str(),
            "Callback processed"
        );

        self.notifier.notify_status(&record);

        Ok(CallbackResponse {
            redirect_url,
            status: "callback_processed".to_string(),
        })
    }

    pub async fn get_payment(&self, payment_id: &str) -> AppResult<PaymentRecord> {
        let payment_id = require_id(payment_id)?;
        self.store
            .get(payment_id)
            .await?
            .ok_or_else(|| AppError::not_found(payment_id))
    }
}
