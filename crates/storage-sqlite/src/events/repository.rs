use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use eventhub_core::catalog::UpsertOutcome;
use eventhub_core::events::{
    is_orphan, Event, EventQuery, EventRepositoryTrait, EventSortField, EventUpsert,
    ExternalKeySet, NewLocalEvent, SortOrder,
};
use eventhub_core::utils::time_utils::now_naive;
use eventhub_core::Result;

use super::model::{encode_category_ids, EventDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::events;
use crate::utils::chunk_for_sqlite;

pub struct EventRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Applies the listing filters. Built twice per search, once for the page and
/// once for the total, since boxed queries cannot be cloned.
/// Titles order case-insensitively (ASCII folding, as SQLite's NOCASE does).
fn title_nocase() -> diesel::expression::SqlLiteral<diesel::sql_types::Text> {
    diesel::dsl::sql::<diesel::sql_types::Text>("title COLLATE NOCASE")
}

fn filtered(query: &EventQuery) -> events::BoxedQuery<'_, Sqlite> {
    let mut statement = events::table.into_boxed();
    if let Some(visible) = query.visible {
        statement = statement.filter(events::visible.eq(visible));
    }
    if let Some(is_active) = query.is_active {
        statement = statement.filter(events::is_active.eq(is_active));
    }
    if let Some(is_past) = query.is_past {
        statement = statement.filter(events::is_past.eq(is_past));
    }
    if let Some(category_id) = query.category_id.as_deref() {
        // category_ids is a JSON array of strings, so match the quoted element.
        let quoted = serde_json::to_string(category_id).unwrap_or_default();
        statement = statement.filter(
            events::category_ids
                .like(like_pattern(&quoted))
                .escape('\\'),
        );
    }
    if let Some(search) = query.search.as_deref() {
        statement = statement.filter(events::title.like(like_pattern(search)).escape('\\'));
    }
    statement
}

impl EventRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        EventRepository { pool, writer }
    }

    fn find_one(&self, lookup: events::BoxedQuery<'static, Sqlite>) -> Result<Option<Event>> {
        let mut conn = get_connection(&self.pool)?;
        let row = lookup
            .select(EventDB::as_select())
            .first::<EventDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Event::from))
    }
}

#[async_trait]
impl EventRepositoryTrait for EventRepository {
    fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(events::table
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?)
    }

    async fn upsert_by_event_id(&self, upsert: EventUpsert) -> Result<UpsertOutcome<Event>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UpsertOutcome<Event>> {
                let existing = events::table
                    .filter(events::event_id.eq(&upsert.event_id))
                    .select(EventDB::as_select())
                    .first::<EventDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let created = existing.is_none();
                let record = match existing {
                    Some(mut row) => {
                        row.apply_upsert(upsert);
                        diesel::update(events::table.find(row.id.clone()))
                            .set(&row)
                            .returning(EventDB::as_returning())
                            .get_result(conn)
                            .map_err(StorageError::from)?
                    }
                    None => {
                        let row = EventDB::from_upsert(Uuid::new_v4().to_string(), upsert);
                        diesel::insert_into(events::table)
                            .values(&row)
                            .returning(EventDB::as_returning())
                            .get_result(conn)
                            .map_err(StorageError::from)?
                    }
                };

                Ok(UpsertOutcome {
                    record: record.into(),
                    created,
                })
            })
            .await
    }

    async fn insert_local(&self, new_event: NewLocalEvent) -> Result<Event> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Event> {
                let now = now_naive();
                let row = EventDB {
                    id: Uuid::new_v4().to_string(),
                    event_id: None,
                    is_past: new_event.end_date.is_some_and(|end| end < now),
                    slug: new_event.slug,
                    title: new_event.title,
                    description: new_event.description,
                    start_date: new_event.start_date,
                    end_date: new_event.end_date,
                    venue: new_event.venue,
                    banner_url: new_event.banner_url,
                    visible: new_event.visible.unwrap_or(true),
                    is_active: true,
                    category_ids: encode_category_ids(&new_event.category_ids),
                    last_synced_at: None,
                    created_at: now,
                    updated_at: now,
                };
                let inserted = diesel::insert_into(events::table)
                    .values(&row)
                    .returning(EventDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted.into())
            })
            .await
    }

    fn search(&self, query: &EventQuery) -> Result<(Vec<Event>, i64)> {
        let mut conn = get_connection(&self.pool)?;

        let total = filtered(query)
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;

        let desc = query.order == SortOrder::Desc;
        // Rows with no date sort last in either direction.
        let statement = match (query.sort_by, desc) {
            (EventSortField::StartDate, false) => filtered(query)
                .order((events::start_date.is_null(), events::start_date.asc())),
            (EventSortField::StartDate, true) => filtered(query)
                .order((events::start_date.is_null(), events::start_date.desc())),
            (EventSortField::EndDate, false) => {
                filtered(query).order((events::end_date.is_null(), events::end_date.asc()))
            }
            (EventSortField::EndDate, true) => {
                filtered(query).order((events::end_date.is_null(), events::end_date.desc()))
            }
            (EventSortField::Title, false) => filtered(query).order(title_nocase().asc()),
            (EventSortField::Title, true) => filtered(query).order(title_nocase().desc()),
            (EventSortField::CreatedAt, false) => filtered(query).order(events::created_at.asc()),
            (EventSortField::CreatedAt, true) => filtered(query).order(events::created_at.desc()),
            (EventSortField::LastSyncedAt, false) => filtered(query).order((
                events::last_synced_at.is_null(),
                events::last_synced_at.asc(),
            )),
            (EventSortField::LastSyncedAt, true) => filtered(query).order((
                events::last_synced_at.is_null(),
                events::last_synced_at.desc(),
            )),
        };

        let rows = statement
            .then_order_by(events::id.asc())
            .limit(query.limit)
            .offset(query.offset())
            .select(EventDB::as_select())
            .load::<EventDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok((rows.into_iter().map(Event::from).collect(), total))
    }

    fn get_by_id(&self, id: &str) -> Result<Option<Event>> {
        self.find_one(
            events::table
                .filter(events::id.eq(id.to_string()))
                .into_boxed(),
        )
    }

    fn get_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        self.find_one(
            events::table
                .filter(events::slug.eq(slug.to_string()))
                .into_boxed(),
        )
    }

    fn get_by_event_id(&self, event_id: &str) -> Result<Option<Event>> {
        self.find_one(
            events::table
                .filter(events::event_id.eq(event_id.to_string()))
                .into_boxed(),
        )
    }

    async fn delete_orphans(&self, keys: ExternalKeySet) -> Result<Vec<String>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<String>> {
                let tracked = events::table
                    .filter(events::event_id.is_not_null())
                    .select(EventDB::as_select())
                    .load::<EventDB>(conn)
                    .map_err(StorageError::from)?;

                let orphans: Vec<Event> = tracked
                    .into_iter()
                    .map(Event::from)
                    .filter(|event| is_orphan(event, &keys))
                    .collect();
                if orphans.is_empty() {
                    return Ok(Vec::new());
                }

                let ids: Vec<String> = orphans.iter().map(|e| e.id.clone()).collect();
                for chunk in chunk_for_sqlite(&ids) {
                    diesel::delete(events::table.filter(events::id.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                Ok(orphans.into_iter().filter_map(|e| e.event_id).collect())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use eventhub_core::events::{EventListParams, EventQueryLimits};
    use tempfile::tempdir;

    async fn create_test_repository() -> (EventRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (EventRepository::new(pool, writer), temp_dir)
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn upsert(event_id: &str, slug: &str, title: &str, start: Option<u32>) -> EventUpsert {
        EventUpsert {
            event_id: event_id.to_string(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: None,
            start_date: start.map(at),
            end_date: None,
            venue: Some("Lilongwe".to_string()),
            banner_url: None,
            visible: true,
            is_active: true,
            is_past: false,
            category_ids: Vec::new(),
            synced_at: at(1),
        }
    }

    fn query(params: EventListParams) -> EventQuery {
        EventQueryLimits::default().normalize(&params)
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let (repo, _temp_dir) = create_test_repository().await;

        let first = repo
            .upsert_by_event_id(upsert("1", "jazz-night", "Jazz Night", Some(10)))
            .await
            .unwrap();
        assert!(first.created);

        let mut changed = upsert("1", "jazz-night", "Jazz Night Live", Some(11));
        changed.category_ids = vec!["cat-1".to_string()];
        changed.synced_at = at(1) + Duration::hours(2);
        let second = repo.upsert_by_event_id(changed).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.title, "Jazz Night Live");
        assert_eq!(second.record.category_ids, vec!["cat-1".to_string()]);
        assert_eq!(second.record.created_at, first.record.created_at);
        assert_eq!(repo.count().unwrap(), 1);
        assert!(repo.get_by_slug("jazz-night").unwrap().is_some());
        assert!(repo.get_by_event_id("1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_orphans_spares_local_and_slug_matches() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.upsert_by_event_id(upsert("1", "kept", "Kept", None))
            .await
            .unwrap();
        repo.upsert_by_event_id(upsert("2", "renumbered", "Renumbered", None))
            .await
            .unwrap();
        repo.upsert_by_event_id(upsert("3", "gone", "Gone", None))
            .await
            .unwrap();
        let local = repo
            .insert_local(NewLocalEvent {
                slug: "draft".to_string(),
                title: "Draft".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(local.event_id.is_none());

        let keys = ExternalKeySet {
            ids: ["1".to_string(), "20".to_string()].into_iter().collect(),
            slugs: ["kept".to_string(), "renumbered".to_string()]
                .into_iter()
                .collect(),
        };
        let deleted = repo.delete_orphans(keys.clone()).await.unwrap();
        assert_eq!(deleted, vec!["3".to_string()]);
        assert_eq!(repo.count().unwrap(), 3);
        assert!(repo.get_by_id(&local.id).unwrap().is_some());

        // A second sweep against the same listing deletes nothing.
        assert!(repo.delete_orphans(keys).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_filters_sorts_and_pages() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.upsert_by_event_id(upsert("1", "b-fest", "Beach Fest", Some(20)))
            .await
            .unwrap();
        repo.upsert_by_event_id(upsert("2", "a-gala", "Awards Gala", Some(5)))
            .await
            .unwrap();
        repo.upsert_by_event_id(upsert("3", "tba", "Mystery Show", None))
            .await
            .unwrap();
        let mut hidden = upsert("4", "hidden", "Hidden Fest", Some(1));
        hidden.visible = false;
        hidden.category_ids = vec!["music".to_string()];
        repo.upsert_by_event_id(hidden).await.unwrap();

        let (page, total) = repo.search(&query(EventListParams::default())).unwrap();
        assert_eq!(total, 4);
        let slugs: Vec<&str> = page.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["hidden", "a-gala", "b-fest", "tba"]);

        let (page, _) = repo
            .search(&query(EventListParams {
                order: Some("desc".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(page.last().unwrap().slug, "tba");
        assert_eq!(page.first().unwrap().slug, "b-fest");

        let (page, total) = repo
            .search(&query(EventListParams {
                search: Some("fest".to_string()),
                visible: Some(true),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].slug, "b-fest");

        let (page, total) = repo
            .search(&query(EventListParams {
                category_id: Some("music".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].slug, "hidden");

        let (page, total) = repo
            .search(&query(EventListParams {
                page: Some(2),
                limit: Some(1),
                sort_by: Some("title".to_string()),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].slug, "b-fest");
    }

    #[tokio::test]
    async fn test_title_order_ignores_case_across_pages() {
        let (repo, _temp_dir) = create_test_repository().await;
        for (id, slug, title) in [
            ("1", "zumba", "zumba Party"),
            ("2", "apple", "Apple Market"),
            ("3", "banda", "banda Night"),
            ("4", "comedy", "Comedy Hour"),
        ] {
            repo.upsert_by_event_id(upsert(id, slug, title, Some(10)))
                .await
                .unwrap();
        }

        let page = |page: i64, order: &str| {
            repo.search(&query(EventListParams {
                sort_by: Some("title".to_string()),
                order: Some(order.to_string()),
                page: Some(page),
                limit: Some(2),
                ..Default::default()
            }))
            .unwrap()
            .0
            .into_iter()
            .map(|e| e.slug)
            .collect::<Vec<_>>()
        };
        assert_eq!(page(1, "asc"), vec!["apple", "banda"]);
        assert_eq!(page(2, "asc"), vec!["comedy", "zumba"]);
        assert_eq!(page(1, "desc"), vec!["zumba", "comedy"]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected_by_storage() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.upsert_by_event_id(upsert("1", "same", "One", None))
            .await
            .unwrap();
        let err = repo
            .insert_local(NewLocalEvent {
                slug: "same".to_string(),
                title: "Two".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unique"));
    }
}
