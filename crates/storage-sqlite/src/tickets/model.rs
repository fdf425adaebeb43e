//! Database models for tickets.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use eventhub_core::tickets::{PaymentStatus, Ticket, TicketUpsert};

use crate::utils::{decimal_to_db, parse_decimal_tolerant};

/// Database model for tickets. `price` is decimal text and
/// `raw_paychangu_data` the JSON payload as received.
#[derive(
    Queryable,
    Insertable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::tickets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct TicketDB {
    pub id: String,
    pub paychangu_ticket_id: String,
    pub event_id: String,
    pub qr_code_uuid: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub quantity: i32,
    pub price: String,
    pub currency: String,
    pub payment_status: String,
    pub is_redeemed: bool,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<NaiveDateTime>,
    pub raw_paychangu_data: String,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TicketDB {
    pub fn new(id: String, upsert: TicketUpsert) -> Self {
        let mut row = Self {
            id,
            paychangu_ticket_id: String::new(),
            event_id: String::new(),
            qr_code_uuid: None,
            name: None,
            email: None,
            phone: None,
            quantity: 1,
            price: "0".to_string(),
            currency: String::new(),
            payment_status: PaymentStatus::default().as_str().to_string(),
            is_redeemed: false,
            redeemed_by: None,
            redeemed_at: None,
            raw_paychangu_data: "null".to_string(),
            last_synced_at: None,
            created_at: upsert.synced_at,
            updated_at: upsert.synced_at,
        };
        row.apply_upsert(upsert);
        row
    }

    pub fn apply_upsert(&mut self, upsert: TicketUpsert) {
        self.paychangu_ticket_id = upsert.paychangu_ticket_id;
        self.event_id = upsert.event_id;
        self.qr_code_uuid = upsert.qr_code_uuid;
        self.name = upsert.name;
        self.email = upsert.email;
        self.phone = upsert.phone;
        self.quantity = upsert.quantity;
        self.price = decimal_to_db(upsert.price);
        self.currency = upsert.currency;
        self.payment_status = upsert.payment_status.as_str().to_string();
        self.is_redeemed = upsert.is_redeemed;
        self.redeemed_by = upsert.redeemed_by;
        self.redeemed_at = upsert.redeemed_at;
        self.raw_paychangu_data = upsert.raw_paychangu_data.to_string();
        self.last_synced_at = Some(upsert.synced_at);
        self.updated_at = upsert.synced_at;
    }
}

impl From<TicketDB> for Ticket {
    fn from(db: TicketDB) -> Self {
        let payment_status = db.payment_status.parse().unwrap_or_else(|e| {
            log::warn!("Ticket {}: {}", db.id, e);
            PaymentStatus::Pending
        });
        let raw_paychangu_data = serde_json::from_str(&db.raw_paychangu_data).unwrap_or_else(|e| {
            log::warn!("Ticket {}: unreadable raw payload: {}", db.id, e);
            Value::Null
        });

        Self {
            price: parse_decimal_tolerant(&db.price, "price"),
            payment_status,
            raw_paychangu_data,
            id: db.id,
            paychangu_ticket_id: db.paychangu_ticket_id,
            event_id: db.event_id,
            qr_code_uuid: db.qr_code_uuid,
            name: db.name,
            email: db.email,
            phone: db.phone,
            quantity: db.quantity,
            currency: db.currency,
            is_redeemed: db.is_redeemed,
            redeemed_by: db.redeemed_by,
            redeemed_at: db.redeemed_at,
            last_synced_at: db.last_synced_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
