//! Router assembly and shared application state

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};
use tracing::info;

use crate::api;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_api_key, require_merchant_auth, AuthConfig};
use crate::middleware::error::{handle_panic, route_not_found};
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::payments::{InMemoryPaymentStore, PaymentStore, SignatureService};
use crate::services::{CheckoutSettings, NotificationService, PaymentService};

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(payments: PaymentService, auth: AuthConfig) -> Self {
        Self {
            payments: Arc::new(payments),
            auth: Arc::new(auth),
        }
    }

    /// Wire the in-memory store, signers and notifier from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let payments_config = &config.payments;

        let signer = SignatureService::new(&payments_config.secret_key)?;
        let platform_signer = SignatureService::new(&payments_config.platform_secret_key)?;

        let notifier = match &payments_config.notify_url {
            Some(url) => NotificationService::new(
                Some(url.clone()),
                payments_config.notify_timeout,
                platform_signer.clone(),
            )
            .map_err(|e| AppError::internal(format!("failed to build HTTP client: {}", e)))?,
            None => NotificationService::disabled(platform_signer.clone()),
        };
        info!(
            enabled = notifier.is_enabled(),
            target = ?payments_config.notify_url,
            "Platform notifier configured"
        );

        let settings = CheckoutSettings {
            checkout_url: format!(
                "{}{}",
                config.server.public_base_url, payments_config.checkout_path
            ),
            default_currency: payments_config.default_currency.clone(),
        };

        let store: Arc<dyn PaymentStore> = Arc::new(InMemoryPaymentStore::new());
        let service = PaymentService::new(store, signer, notifier, settings);
        let auth = AuthConfig {
            api_key: payments_config.api_key.clone(),
            platform_signer,
        };

        Ok(Self::new(service, auth))
    }
}

pub fn build_router(state: AppState) -> Router {
    let payment_routes = Router::new()
        .route("/api/payments/create", post(api::payments::create_payment))
        .route("/api/payments/capture", post(api::payments::capture_payment))
        .route("/api/payments/refund", post(api::payments::refund_payment))
        .route("/api/payments/cancel", post(api::payments::cancel_payment))
        .route("/api/payments/{payment_id}", get(api::payments::get_payment))
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    let redirect_routes = Router::new()
        .route("/api/redirect", post(api::redirect::create_redirect))
        .route_layer(from_fn_with_state(state.clone(), require_merchant_auth));

    Router::new()
        .route("/", get(api::health::root))
        .route("/health", get(api::health::health))
        .route("/api/callback", post(api::callback::handle_callback))
        .merge(payment_routes)
        .merge(redirect_routes)
        .fallback(route_not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}
