use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::payments::types::PaymentRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mutation applied to a stored record by [`PaymentStore::update`].
pub type Mutator = Box<dyn FnOnce(&mut PaymentRecord) -> AppResult<()> + Send>;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Store a new record. Fails if the identifier is already taken.
    async fn put(&self, record: PaymentRecord) -> AppResult<()>;

    async fn get(&self, payment_id: &str) -> AppResult<Option<PaymentRecord>>;

    /// Apply `mutator` to the record and return the updated copy.
    ///
    /// The change is committed only if the mutator returns `Ok`; an unknown
    /// identifier yields a not-found error.
    async fn update(&self, payment_id: &str, mutator: Mutator) -> AppResult<PaymentRecord>;

    async fn len(&self) -> AppResult<usize>;
}

/// Process-local store. Everything is lost on restart.
///
/// Updates run under the write lock, so mutations of the same record are
/// serialised.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn put(&self, record: PaymentRecord) -> AppResult<()> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&record.payment_id) {
            return Err(AppError::new(AppErrorKind::Domain(
                DomainError::DuplicatePayment {
                    payment_id: record.payment_id,
                },
            )));
        }
        payments.insert(record.payment_id.clone(), record);
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> AppResult<Option<PaymentRecord>> {
        let payments = self.payments.read().await;
        Ok(payments.get(payment_id).cloned())
    }

    async fn update(&self, payment_id: &str, mutator: Mutator) -> AppResult<PaymentRecord> {
        let mut payments = self.payments.write().await;
        let current = payments
            .get(payment_id)
            .ok_or_else(|| AppError::not_found(payment_id))?;

        let mut next = current.clone();
        mutator(&mut next)?;

        if next.payment_id != payment_id {
            return Err(AppError::internal("mutator attempted to change paymentId"));
        }

        payments.insert(payment_id.to_string(), next.clone());
        Ok(next)
    }

    async fn len(&self) -> AppResult<usize> {
        Ok(self.payments.read().await.len())
    }
}
