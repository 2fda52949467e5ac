pub mod callback;
pub mod health;
pub mod payments;
pub mod redirect;
