use async_trait::async_trait;

use super::payments_model::{CheckoutRequest, CheckoutSession, PaymentVerification};
use crate::errors::Result;

/// Hosted-checkout payment gateway.
///
/// The callback webhook is unauthenticated, so it only tells the wallet
/// service which `tx_ref` to look at. The outcome it settles with always
/// comes from [`PaymentGatewayTrait::verify_payment`].
#[async_trait]
pub trait PaymentGatewayTrait: Send + Sync {
    /// Opens a checkout session correlated by `request.tx_ref`.
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Asks the gateway for the current state of the charge with `tx_ref`.
    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification>;
}
