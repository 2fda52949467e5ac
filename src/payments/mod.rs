pub mod signature;
pub mod state;
pub mod store;
pub mod types;

pub use signature::SignatureService;
pub use state::Transition;
pub use store::{InMemoryPaymentStore, PaymentStore};
pub use types::{PaymentRecord, PaymentStatus};
