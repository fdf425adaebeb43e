use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, ValidationError};
use crate::wallets::{Transaction, TransactionStatus};

/// Parameters for opening a hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutRequest {
    pub tx_ref: String,
    pub amount: Decimal,
    pub currency: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

/// A checkout session opened by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub tx_ref: String,
}

/// The gateway's own record of a charge, fetched by `tx_ref`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub tx_ref: String,
    pub status: GatewayStatus,
    pub amount: Decimal,
    pub currency: Option<String>,
}

impl PaymentVerification {
    /// Whether this charge is the one recorded by `transaction`: same
    /// reference, same amount and, when the gateway reports one, same currency.
    pub fn covers(&self, transaction: &Transaction) -> bool {
        transaction.tx_ref.as_deref() == Some(self.tx_ref.as_str())
            && self.amount == transaction.amount
            && self
                .currency
                .as_deref()
                .map_or(true, |c| c.eq_ignore_ascii_case(&transaction.currency))
    }
}

/// Outcome of a charge as named by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Failed,
    Cancelled,
    Pending,
}

impl GatewayStatus {
    /// The transaction status this gateway outcome settles into.
    pub fn settles_to(self) -> TransactionStatus {
        match self {
            GatewayStatus::Success => TransactionStatus::Completed,
            GatewayStatus::Failed => TransactionStatus::Failed,
            GatewayStatus::Cancelled => TransactionStatus::Cancelled,
            GatewayStatus::Pending => TransactionStatus::Processing,
        }
    }
}

impl FromStr for GatewayStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "successful" | "completed" => Ok(GatewayStatus::Success),
            "failed" | "failure" => Ok(GatewayStatus::Failed),
            "cancelled" | "canceled" => Ok(GatewayStatus::Cancelled),
            "pending" | "processing" => Ok(GatewayStatus::Pending),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown payment status '{}'",
                other
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_parsing() {
        assert_eq!("successful".parse::<GatewayStatus>().unwrap(), GatewayStatus::Success);
        assert_eq!("SUCCESS".parse::<GatewayStatus>().unwrap(), GatewayStatus::Success);
        assert_eq!("canceled".parse::<GatewayStatus>().unwrap(), GatewayStatus::Cancelled);
        assert!("refunded".parse::<GatewayStatus>().is_err());
    }

    #[test]
    fn test_gateway_status_settlement() {
        assert_eq!(GatewayStatus::Success.settles_to(), TransactionStatus::Completed);
        assert_eq!(GatewayStatus::Pending.settles_to(), TransactionStatus::Processing);
    }
}
