//! Payment gateway contract used by the wallet ledger for deposits.

mod payments_model;
mod payments_traits;

pub use payments_model::{CheckoutRequest, CheckoutSession, GatewayStatus, PaymentVerification};
pub use payments_traits::PaymentGatewayTrait;
