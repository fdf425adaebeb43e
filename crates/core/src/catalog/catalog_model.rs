//! External catalog records.
//!
//! The upstream API is loosely typed: ids arrive as numbers or strings, flags
//! as booleans or 0/1, and the end of an event under several field names.
//! These types accept all of those shapes and expose resolved accessors.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::time_utils::parse_flexible_datetime;

/// An event as published by the external catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalEvent {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date_camel: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date_camel: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub ends_at: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub visible: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub is_past: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub category_id: Option<String>,
}

impl ExternalEvent {
    /// Non-empty external id, if any.
    pub fn external_id(&self) -> Option<&str> {
        non_empty(self.id.as_deref())
    }

    /// Non-empty slug, if any.
    pub fn slug(&self) -> Option<&str> {
        non_empty(self.slug.as_deref())
    }

    pub fn display_title(&self) -> Option<String> {
        non_empty(self.title.as_deref())
            .or_else(|| non_empty(self.name.as_deref()))
            .map(str::to_string)
    }

    pub fn venue_name(&self) -> Option<String> {
        non_empty(self.venue.as_deref())
            .or_else(|| non_empty(self.location.as_deref()))
            .map(str::to_string)
    }

    pub fn banner_image(&self) -> Option<String> {
        non_empty(self.banner_url.as_deref())
            .or_else(|| non_empty(self.banner.as_deref()))
            .map(str::to_string)
    }

    pub fn resolved_start_date(&self) -> Option<NaiveDateTime> {
        [&self.start_date, &self.start_date_camel]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_flexible_datetime(raw))
    }

    /// The first parseable end date among the field names the catalog uses.
    pub fn resolved_end_date(&self) -> Option<NaiveDateTime> {
        [
            &self.end_date,
            &self.end_date_camel,
            &self.end_datetime,
            &self.ends_at,
            &self.end_time,
        ]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_flexible_datetime(raw))
    }

    /// `end < now` when an end date parses, otherwise the upstream flag.
    pub fn derive_is_past(&self, now: NaiveDateTime) -> bool {
        match self.resolved_end_date() {
            Some(end) => end < now,
            None => self.is_past.unwrap_or(false),
        }
    }
}

/// An event category as published by the external catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalCategory {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub is_active: Option<bool>,
}

/// A ticket as published by the external catalog.
///
/// `raw` keeps the complete upstream payload; it is filled by the client
/// rather than by deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalTicket {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub qr_code_uuid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "de_opt_i32")]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_bool")]
    pub is_redeemed: Option<bool>,
    #[serde(default)]
    pub redeemed_at: Option<String>,
    #[serde(default)]
    pub redeemed_by: Option<String>,
    #[serde(skip)]
    pub raw: Value,
}

impl ExternalTicket {
    pub fn external_id(&self) -> Option<&str> {
        non_empty(self.id.as_deref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

/// Result of an upsert keyed on an external id.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome<T> {
    pub record: T,
    pub created: bool,
}

/// One record that could not be synced, kept in the batch summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub external_id: Option<String>,
    pub slug: Option<String>,
    pub error: String,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient field decoders
// ─────────────────────────────────────────────────────────────────────────────

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn de_opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn de_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    })
}
