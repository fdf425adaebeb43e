//! Database models for events.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use eventhub_core::events::{Event, EventUpsert};

/// Database model for events. `category_ids` holds a JSON array of local
/// category ids.
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
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct EventDB {
    pub id: String,
    pub event_id: Option<String>,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub venue: Option<String>,
    pub banner_url: Option<String>,
    pub visible: bool,
    pub is_active: bool,
    pub is_past: bool,
    pub category_ids: String,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub(crate) fn encode_category_ids(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn decode_category_ids(raw: &str, event_id: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!(
            "Ignoring malformed category_ids '{}' on event {}: {}",
            raw,
            event_id,
            e
        );
        Vec::new()
    })
}

impl EventDB {
    /// Overwrites the catalog-owned columns from a sync record.
    pub fn apply_upsert(&mut self, upsert: EventUpsert) {
        self.event_id = Some(upsert.event_id);
        self.slug = upsert.slug;
        self.title = upsert.title;
        self.description = upsert.description;
        self.start_date = upsert.start_date;
        self.end_date = upsert.end_date;
        self.venue = upsert.venue;
        self.banner_url = upsert.banner_url;
        self.visible = upsert.visible;
        self.is_active = upsert.is_active;
        self.is_past = upsert.is_past;
        self.category_ids = encode_category_ids(&upsert.category_ids);
        self.last_synced_at = Some(upsert.synced_at);
        self.updated_at = upsert.synced_at;
    }

    pub fn from_upsert(id: String, upsert: EventUpsert) -> Self {
        let synced_at = upsert.synced_at;
        let mut row = Self {
            id,
            event_id: None,
            slug: String::new(),
            title: String::new(),
            description: None,
            start_date: None,
            end_date: None,
            venue: None,
            banner_url: None,
            visible: true,
            is_active: true,
            is_past: false,
            category_ids: "[]".to_string(),
            last_synced_at: None,
            created_at: synced_at,
            updated_at: synced_at,
        };
        row.apply_upsert(upsert);
        row
    }
}

impl From<EventDB> for Event {
    fn from(db: EventDB) -> Self {
        let category_ids = decode_category_ids(&db.category_ids, &db.id);
        Self {
            id: db.id,
            event_id: db.event_id,
            slug: db.slug,
            title: db.title,
            description: db.description,
            start_date: db.start_date,
            end_date: db.end_date,
            venue: db.venue,
            banner_url: db.banner_url,
            visible: db.visible,
            is_active: db.is_active,
            is_past: db.is_past,
            category_ids,
            last_synced_at: db.last_synced_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
