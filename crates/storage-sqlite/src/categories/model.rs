//! Database models for event categories.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use eventhub_core::categories::EventCategory;

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
#[diesel(table_name = crate::schema::event_categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct EventCategoryDB {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub color: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<EventCategoryDB> for EventCategory {
    fn from(db: EventCategoryDB) -> Self {
        Self {
            id: db.id,
            category_id: db.category_id,
            name: db.name,
            color: db.color,
            is_active: db.is_active,
            last_synced_at: db.last_synced_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
