//! Ticket domain models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{ExternalTicket, SyncFailure};
use crate::constants::DEFAULT_CURRENCY;
use crate::errors::{Error, ValidationError};
use crate::utils::time_utils::parse_flexible_datetime;
use crate::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Maps the catalog's free-form payment status. Unknown values stay pending.
    pub fn from_upstream(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "paid" | "success" | "successful" | "completed" => PaymentStatus::Paid,
            "failed" | "cancelled" | "canceled" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown payment status '{}'",
                other
            ))
            .into()),
        }
    }
}

/// Local mirror of a catalog ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub paychangu_ticket_id: String,
    pub event_id: String,
    pub qr_code_uuid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<NaiveDateTime>,
    pub raw_paychangu_data: Value,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Normalized catalog ticket, upserted by `paychangu_ticket_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketUpsert {
    pub paychangu_ticket_id: String,
    pub event_id: String,
    pub qr_code_uuid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<NaiveDateTime>,
    pub raw_paychangu_data: Value,
    pub synced_at: NaiveDateTime,
}

impl TicketUpsert {
    /// `fallback_event_id` is used when the record does not name its event.
    pub fn from_external(
        external: &ExternalTicket,
        fallback_event_id: Option<&str>,
        synced_at: NaiveDateTime,
    ) -> Result<Self> {
        let paychangu_ticket_id = external
            .external_id()
            .ok_or_else(|| Error::Validation(ValidationError::MissingField("id".to_string())))?
            .to_string();
        let event_id = external
            .event_id
            .as_deref()
            .or(fallback_event_id)
            .ok_or_else(|| {
                Error::Validation(ValidationError::MissingField("event_id".to_string()))
            })?
            .to_string();
        let raw_paychangu_data = if external.raw.is_null() {
            serde_json::to_value(external)?
        } else {
            external.raw.clone()
        };

        Ok(Self {
            paychangu_ticket_id,
            event_id,
            qr_code_uuid: external
                .qr_code_uuid
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            name: external.name.clone(),
            email: external.email.clone(),
            phone: external.phone.clone(),
            quantity: external.quantity.unwrap_or(1),
            price: external.price.unwrap_or(Decimal::ZERO),
            currency: external
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            payment_status: external
                .payment_status
                .as_deref()
                .map(PaymentStatus::from_upstream)
                .unwrap_or_default(),
            is_redeemed: external.is_redeemed.unwrap_or(false),
            redeemed_by: external.redeemed_by.clone(),
            redeemed_at: external
                .redeemed_at
                .as_deref()
                .and_then(parse_flexible_datetime),
            raw_paychangu_data,
            synced_at,
        })
    }
}

/// Local redemption state to write after the catalog accepted the change.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionUpdate {
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketSyncSummary {
    pub event_id: String,
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
    pub synced_at: NaiveDateTime,
}

/// Local tickets for one event together with the sync that refreshed them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventTickets {
    pub tickets: Vec<Ticket>,
    pub sync: TicketSyncSummary,
}
