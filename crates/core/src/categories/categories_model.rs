//! Event category domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{ExternalCategory, SyncFailure};
use crate::errors::{Error, ValidationError};
use crate::Result;

/// Local mirror of an externally owned category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventCategory {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub color: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields written when upserting a category keyed on `category_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpsert {
    pub category_id: String,
    pub name: String,
    pub color: Option<String>,
    pub is_active: bool,
    pub synced_at: NaiveDateTime,
}

impl CategoryUpsert {
    /// Normalizes an external category. Records without an id are rejected.
    pub fn from_external(external: &ExternalCategory, synced_at: NaiveDateTime) -> Result<Self> {
        let category_id = external
            .id
            .clone()
            .ok_or_else(|| Error::Validation(ValidationError::MissingField("id".to_string())))?;
        let name = external
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(category_id.as_str())
            .to_string();

        Ok(Self {
            category_id,
            name,
            color: external.color.clone(),
            is_active: external.is_active.unwrap_or(true),
            synced_at,
        })
    }
}

/// Outcome of a category sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySyncSummary {
    pub total_external: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
    pub synced_at: NaiveDateTime,
}
