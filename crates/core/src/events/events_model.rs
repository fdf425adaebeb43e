//! Event domain models.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{ExternalEvent, SyncFailure};
use crate::constants::{DEFAULT_EVENTS_LIMIT, DEFAULT_EVENTS_MAX_LIMIT, DEFAULT_EVENTS_MIN_LIMIT};
use crate::errors::{Error, ValidationError};
use crate::utils::html::strip_html;
use crate::Result;

/// Locally stored event.
///
/// `event_id` is the catalog id. It is `None` for events created locally,
/// which are never touched by the orphan sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
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
    pub category_ids: Vec<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Normalized catalog record, upserted by `event_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventUpsert {
    pub event_id: String,
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
    pub category_ids: Vec<String>,
    pub synced_at: NaiveDateTime,
}

impl EventUpsert {
    /// Builds the upsert for one catalog record.
    ///
    /// `local_category_id` is the local id of the record's category when that
    /// category has already been synced.
    pub fn from_external(
        external: &ExternalEvent,
        local_category_id: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let event_id = external
            .external_id()
            .ok_or_else(|| Error::Validation(ValidationError::MissingField("id".to_string())))?
            .to_string();
        let slug = external
            .slug()
            .ok_or_else(|| Error::Validation(ValidationError::MissingField("slug".to_string())))?
            .to_string();

        Ok(Self {
            title: external.display_title().unwrap_or_else(|| slug.clone()),
            event_id,
            slug,
            description: external.description.clone(),
            start_date: external.resolved_start_date(),
            end_date: external.resolved_end_date(),
            venue: external.venue_name(),
            banner_url: external.banner_image(),
            visible: external.visible.unwrap_or(true),
            is_active: external.is_active.unwrap_or(true),
            is_past: external.derive_is_past(now),
            category_ids: local_category_id.into_iter().collect(),
            synced_at: now,
        })
    }
}

/// Admin-created event that does not exist in the catalog yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewLocalEvent {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub category_ids: Vec<String>,
}

impl NewLocalEvent {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()).into());
        }
        if self.slug.trim().is_empty() {
            return Err(ValidationError::MissingField("slug".to_string()).into());
        }
        if self.slug.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidInput(
                "Slug must not contain whitespace".to_string(),
            )
            .into());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::InvalidInput(
                    "End date must not be before start date".to_string(),
                )
                .into());
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Querying
// ─────────────────────────────────────────────────────────────────────────────

/// Columns the event listing may be sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSortField {
    #[default]
    StartDate,
    EndDate,
    Title,
    CreatedAt,
    LastSyncedAt,
}

impl EventSortField {
    /// Parses a sort parameter. Anything outside the allow-list sorts by start date.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("end_date") | Some("endDate") => EventSortField::EndDate,
            Some("title") => EventSortField::Title,
            Some("created_at") | Some("createdAt") => EventSortField::CreatedAt,
            Some("last_synced_at") | Some("lastSyncedAt") => EventSortField::LastSyncedAt,
            _ => EventSortField::StartDate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventSortField::StartDate => "start_date",
            EventSortField::EndDate => "end_date",
            EventSortField::Title => "title",
            EventSortField::CreatedAt => "created_at",
            EventSortField::LastSyncedAt => "last_synced_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "desc" || v == "-1" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Raw listing parameters as received from the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(alias = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub visible: Option<bool>,
    #[serde(alias = "is_active")]
    pub is_active: Option<bool>,
    #[serde(alias = "is_past")]
    pub is_past: Option<bool>,
    #[serde(alias = "category_id")]
    pub category_id: Option<String>,
    pub search: Option<String>,
    #[serde(alias = "cleanup_orphaned")]
    pub cleanup_orphaned: Option<bool>,
}

/// Paging bounds applied to listing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQueryLimits {
    pub min_limit: i64,
    pub max_limit: i64,
    pub default_limit: i64,
}

impl Default for EventQueryLimits {
    fn default() -> Self {
        Self {
            min_limit: DEFAULT_EVENTS_MIN_LIMIT,
            max_limit: DEFAULT_EVENTS_MAX_LIMIT,
            default_limit: DEFAULT_EVENTS_LIMIT,
        }
    }
}

impl EventQueryLimits {
    /// Clamps paging and resolves sort parameters into a query.
    pub fn normalize(&self, params: &EventListParams) -> EventQuery {
        let max_limit = self.max_limit.max(self.min_limit);
        let limit = params
            .limit
            .unwrap_or(self.default_limit)
            .clamp(self.min_limit, max_limit);

        EventQuery {
            page: params.page.unwrap_or(1).max(1),
            limit,
            sort_by: EventSortField::from_param(params.sort_by.as_deref()),
            order: SortOrder::from_param(params.order.as_deref()),
            visible: params.visible,
            is_active: params.is_active,
            is_past: params.is_past,
            category_id: params
                .category_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            search: params
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Validated listing query handed to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub page: i64,
    pub limit: i64,
    pub sort_by: EventSortField,
    pub order: SortOrder,
    pub visible: Option<bool>,
    pub is_active: Option<bool>,
    pub is_past: Option<bool>,
    pub category_id: Option<String>,
    pub search: Option<String>,
}

impl EventQuery {
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Read view
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExternalApiStatus {
    Ok,
    NotFound,
}

/// An event as served to clients: local record enriched with live catalog data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
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
    pub category_ids: Vec<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub external_api_status: ExternalApiStatus,
}

impl EventView {
    /// Merges the live catalog record over the local one. Catalog fields win.
    pub fn merge(local: Event, external: &ExternalEvent, now: NaiveDateTime) -> Self {
        let end_date = external.resolved_end_date().or(local.end_date);
        let is_past = match external.resolved_end_date() {
            Some(end) => end < now,
            None => external.is_past.unwrap_or(local.is_past),
        };
        let description = external
            .description
            .as_deref()
            .or(local.description.as_deref())
            .map(strip_html);

        Self {
            title: external.display_title().unwrap_or(local.title),
            description,
            start_date: external.resolved_start_date().or(local.start_date),
            end_date,
            venue: external.venue_name().or(local.venue),
            banner_url: external.banner_image().or(local.banner_url),
            visible: external.visible.unwrap_or(local.visible),
            is_active: external.is_active.unwrap_or(local.is_active),
            is_past,
            id: local.id,
            event_id: local.event_id,
            slug: local.slug,
            category_ids: local.category_ids,
            last_synced_at: local.last_synced_at,
            created_at: local.created_at,
            updated_at: local.updated_at,
            external_api_status: ExternalApiStatus::Ok,
        }
    }

    /// Local-only view used when the catalog lookup fails.
    pub fn degraded(local: Event) -> Self {
        Self {
            start_date: local.start_date.or(Some(local.created_at)),
            description: local.description.as_deref().map(strip_html),
            id: local.id,
            event_id: local.event_id,
            slug: local.slug,
            title: local.title,
            end_date: local.end_date,
            venue: local.venue,
            banner_url: local.banner_url,
            visible: local.visible,
            is_active: local.is_active,
            is_past: local.is_past,
            category_ids: local.category_ids,
            last_synced_at: local.last_synced_at,
            created_at: local.created_at,
            updated_at: local.updated_at,
            external_api_status: ExternalApiStatus::NotFound,
        }
    }
}

/// Stable sort of a merged page. Missing dates sort last in either order.
pub fn sort_views(views: &mut [EventView], field: EventSortField, order: SortOrder) {
    fn by_date(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>, order: SortOrder) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => match order {
                SortOrder::Asc => a.cmp(&b),
                SortOrder::Desc => b.cmp(&a),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    views.sort_by(|a, b| match field {
        EventSortField::StartDate => by_date(a.start_date, b.start_date, order),
        EventSortField::EndDate => by_date(a.end_date, b.end_date, order),
        EventSortField::CreatedAt => by_date(Some(a.created_at), Some(b.created_at), order),
        EventSortField::LastSyncedAt => by_date(a.last_synced_at, b.last_synced_at, order),
        EventSortField::Title => {
            let cmp = a.title.to_ascii_lowercase().cmp(&b.title.to_ascii_lowercase());
            match order {
                SortOrder::Asc => cmp,
                SortOrder::Desc => cmp.reverse(),
            }
        }
    });
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<EventView>,
    pub pagination: Pagination,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

/// External ids and slugs seen in one catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalKeySet {
    pub ids: HashSet<String>,
    pub slugs: HashSet<String>,
}

impl ExternalKeySet {
    pub fn from_listing(listing: &[ExternalEvent]) -> Self {
        let mut keys = Self::default();
        for event in listing {
            if let Some(id) = event.external_id() {
                keys.ids.insert(id.to_string());
            }
            if let Some(slug) = event.slug() {
                keys.slugs.insert(slug.to_string());
            }
        }
        keys
    }
}

/// A tracked event is an orphan when neither its catalog id nor its slug
/// appears in the listing. Locally created events are never orphans.
pub fn is_orphan(event: &Event, keys: &ExternalKeySet) -> bool {
    match event.event_id.as_deref() {
        None => false,
        Some(event_id) => !keys.ids.contains(event_id) && !keys.slugs.contains(&event.slug),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSyncSummary {
    pub total_external: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
    pub orphans_deleted: usize,
    pub local_count_before: i64,
    pub local_count_after: i64,
    pub synced_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrphanSweepSummary {
    pub external_count: usize,
    pub deleted: usize,
    pub deleted_event_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn local_event(event_id: Option<&str>, slug: &str) -> Event {
        Event {
            id: format!("local-{}", slug),
            event_id: event_id.map(str::to_string),
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            description: Some("<p>Local</p>".to_string()),
            start_date: None,
            end_date: None,
            venue: Some("Lilongwe".to_string()),
            banner_url: None,
            visible: true,
            is_active: true,
            is_past: false,
            category_ids: vec![],
            last_synced_at: None,
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    #[test]
    fn test_limits_clamp_and_default() {
        let limits = EventQueryLimits::default();
        let q = limits.normalize(&EventListParams {
            limit: Some(5000),
            page: Some(0),
            ..Default::default()
        });
        assert_eq!(q.limit, 100);
        assert_eq!(q.page, 1);

        let q = limits.normalize(&EventListParams {
            limit: Some(-3),
            ..Default::default()
        });
        assert_eq!(q.limit, 1);

        let q = limits.normalize(&EventListParams::default());
        assert_eq!(q.limit, 20);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        let q = EventQueryLimits::default().normalize(&EventListParams {
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        });
        assert_eq!(q.page, i64::MAX);
        assert_eq!(q.offset(), i64::MAX);
    }

    #[test]
    fn test_title_sort_ignores_ascii_case() {
        let mut views: Vec<EventView> = [
            ("zumba", "zumba Party"),
            ("apple", "Apple Market"),
            ("banda", "banda Night"),
        ]
        .into_iter()
        .map(|(slug, title)| {
            let mut event = local_event(None, slug);
            event.title = title.to_string();
            EventView::degraded(event)
        })
        .collect();

        sort_views(&mut views, EventSortField::Title, SortOrder::Asc);
        let slugs: Vec<&str> = views.iter().map(|v| v.slug.as_str()).collect();
        assert_eq!(slugs, vec!["apple", "banda", "zumba"]);

        sort_views(&mut views, EventSortField::Title, SortOrder::Desc);
        assert_eq!(views[0].slug, "zumba");
    }

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(
            EventSortField::from_param(Some("title")),
            EventSortField::Title
        );
        assert_eq!(
            EventSortField::from_param(Some("password; DROP TABLE events")),
            EventSortField::StartDate
        );
        assert_eq!(EventSortField::from_param(None), EventSortField::StartDate);
        assert_eq!(SortOrder::from_param(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::from_param(Some("sideways")), SortOrder::Asc);
    }

    #[test]
    fn test_pagination_flags() {
        let p = Pagination::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_orphan_rules() {
        let keys = ExternalKeySet {
            ids: ["1".to_string()].into_iter().collect(),
            slugs: ["b".to_string()].into_iter().collect(),
        };

        assert!(!is_orphan(&local_event(None, "draft"), &keys));
        assert!(!is_orphan(&local_event(Some("1"), "renamed"), &keys));
        assert!(!is_orphan(&local_event(Some("99"), "b"), &keys));
        assert!(is_orphan(&local_event(Some("2"), "gone"), &keys));
    }

    #[test]
    fn test_upsert_requires_id_and_slug() {
        let no_slug: ExternalEvent = serde_json::from_value(json!({"id": 3})).unwrap();
        assert!(EventUpsert::from_external(&no_slug, None, at(2024, 1, 1)).is_err());

        let no_id: ExternalEvent = serde_json::from_value(json!({"slug": "x"})).unwrap();
        assert!(EventUpsert::from_external(&no_id, None, at(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_merge_prefers_external_and_strips_html() {
        let external: ExternalEvent = serde_json::from_value(json!({
            "id": 1,
            "slug": "a",
            "title": "Live Title",
            "description": "<p>Doors&nbsp;open</p>",
            "end_date": "2023-12-31"
        }))
        .unwrap();

        let view = EventView::merge(local_event(Some("1"), "a"), &external, at(2024, 6, 1));
        assert_eq!(view.title, "Live Title");
        assert_eq!(view.description.as_deref(), Some("Doors open"));
        assert_eq!(view.venue.as_deref(), Some("Lilongwe"));
        assert!(view.is_past);
        assert_eq!(view.external_api_status, ExternalApiStatus::Ok);
    }

    #[test]
    fn test_degraded_view_substitutes_created_at() {
        let view = EventView::degraded(local_event(Some("1"), "a"));
        assert_eq!(view.start_date, Some(at(2024, 1, 1)));
        assert_eq!(view.external_api_status, ExternalApiStatus::NotFound);
        let encoded = serde_json::to_value(&view).unwrap();
        assert_eq!(encoded["externalApiStatus"], "not_found");
    }

    #[test]
    fn test_new_local_event_validation() {
        let mut event = NewLocalEvent {
            slug: "launch".to_string(),
            title: "Launch".to_string(),
            ..Default::default()
        };
        assert!(event.validate().is_ok());

        event.title = "  ".to_string();
        assert!(event.validate().is_err());

        event.title = "Launch".to_string();
        event.slug = "two words".to_string();
        assert!(event.validate().is_err());
    }
}
