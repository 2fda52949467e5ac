//! Payment status state machine
//!
//! ```text
//! pending ──create──▶ created ──capture──▶ captured ──refund──▶ refunded
//!    │                  │
//!    └──────cancel──────┴──▶ canceled
//!
//! any ──callback──▶ success | failed | canceled
//! ```
//!
//! Every mutation of a [`PaymentRecord`] goes through [`PaymentRecord::apply`].
//! A rejected transition leaves the record untouched.

use bigdecimal::BigDecimal;

use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::payments::types::{
    validate_positive, CallbackStatus, MaskedCard, PaymentRecord, PaymentStatus,
};

/// A guarded mutation of a payment record.
#[derive(Debug, Clone)]
pub enum Transition {
    Create {
        card: MaskedCard,
    },
    /// `None` captures the full payment amount.
    Capture {
        amount: Option<BigDecimal>,
    },
    /// `None` refunds the full captured amount.
    Refund {
        amount: Option<BigDecimal>,
        reason: Option<String>,
    },
    Cancel {
        reason: Option<String>,
    },
    Callback {
        status: CallbackStatus,
    },
}

impl Transition {
    pub fn operation(&self) -> &'static str {
        match self {
            Transition::Create { .. } => "create",
            Transition::Capture { .. } => "capture",
            Transition::Refund { .. } => "refund",
            Transition::Cancel { .. } => "cancel",
            Transition::Callback { .. } => "callback",
        }
    }

    /// Whether the transition may start from `from`.
    pub fn allowed_from(&self, from: PaymentStatus) -> bool {
        match self {
            Transition::Create { .. } => from == PaymentStatus::Pending,
            Transition::Capture { .. } => from == PaymentStatus::Created,
            Transition::Refund { .. } => from == PaymentStatus::Captured,
            Transition::Cancel { .. } => {
                matches!(from, PaymentStatus::Pending | PaymentStatus::Created)
            }
            // Trusted on signature alone.
            Transition::Callback { .. } => true,
        }
    }

    pub fn target(&self) -> PaymentStatus {
        match self {
            Transition::Create { .. } => PaymentStatus::Created,
            Transition::Capture { .. } => PaymentStatus::Captured,
            Transition::Refund { .. } => PaymentStatus::Refunded,
            Transition::Cancel { .. } => PaymentStatus::Canceled,
            Transition::Callback { status } => status.payment_status(),
        }
    }
}

fn amount_exceeded(field: &'static str, requested: &BigDecimal, limit: &BigDecimal) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::AmountExceeded {
        field,
        requested: requested.to_string(),
        limit: limit.to_string(),
    }))
}

impl PaymentRecord {
    /// Check the guard for `transition` and, if it holds, mutate the record.
    pub fn apply(&mut self, transition: Transition) -> AppResult<()> {
        if !transition.allowed_from(self.status) {
            return Err(AppError::invalid_transition(
                self.payment_id.clone(),
                self.status,
                transition.operation(),
            ));
        }

        let target = transition.target();
        match transition {
            Transition::Create { card } => {
                self.card = Some(card);
            }
            Transition::Capture { amount } => {
                let amount = amount.unwrap_or_else(|| self.amount.clone());
                validate_positive(&amount, "capture amount")?;
                if amount > self.amount {
                    return Err(amount_exceeded("capture", &amount, &self.amount));
                }
                self.captured_amount = Some(amount);
            }
            Transition::Refund { amount, reason } => {
                let captured = self
                    .captured_amount
                    .clone()
                    .unwrap_or_else(|| self.amount.clone());
                let amount = amount.unwrap_or_else(|| captured.clone());
                validate_positive(&amount, "refund amount")?;
                if amount > captured {
                    return Err(amount_exceeded("refund", &amount, &captured));
                }
                self.refunded_amount = Some(amount);
                self.refund_reason = reason;
            }
            Transition::Cancel { reason } => {
                self.cancel_reason = reason;
            }
            Transition::Callback { .. } => {}
        }

        self.status = target;
        self.touch();
        Ok(())
    }
}
