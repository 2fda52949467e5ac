pub mod notification;
pub mod payment_service;

pub use notification::NotificationService;
pub use payment_service::{CheckoutSettings, PaymentService};
