use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use eventhub_core::catalog::UpsertOutcome;
use eventhub_core::categories::{CategoryRepositoryTrait, CategoryUpsert, EventCategory};
use eventhub_core::Result;

use super::model::EventCategoryDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::event_categories;

pub struct CategoryRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl CategoryRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        CategoryRepository { pool, writer }
    }
}

#[async_trait]
impl CategoryRepositoryTrait for CategoryRepository {
    async fn upsert_by_category_id(
        &self,
        upsert: CategoryUpsert,
    ) -> Result<UpsertOutcome<EventCategory>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UpsertOutcome<EventCategory>> {
                let existing = event_categories::table
                    .filter(event_categories::category_id.eq(&upsert.category_id))
                    .select(EventCategoryDB::as_select())
                    .first::<EventCategoryDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let created = existing.is_none();
                let record = match existing {
                    Some(mut row) => {
                        row.name = upsert.name;
                        row.color = upsert.color;
                        row.is_active = upsert.is_active;
                        row.last_synced_at = Some(upsert.synced_at);
                        row.updated_at = upsert.synced_at;
                        diesel::update(event_categories::table.find(row.id.clone()))
                            .set(&row)
                            .returning(EventCategoryDB::as_returning())
                            .get_result(conn)
                            .map_err(StorageError::from)?
                    }
                    None => {
                        let row = EventCategoryDB {
                            id: Uuid::new_v4().to_string(),
                            category_id: upsert.category_id,
                            name: upsert.name,
                            color: upsert.color,
                            is_active: upsert.is_active,
                            last_synced_at: Some(upsert.synced_at),
                            created_at: upsert.synced_at,
                            updated_at: upsert.synced_at,
                        };
                        diesel::insert_into(event_categories::table)
                            .values(&row)
                            .returning(EventCategoryDB::as_returning())
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

    fn get_by_category_id(&self, category_id: &str) -> Result<Option<EventCategory>> {
        let mut conn = get_connection(&self.pool)?;
        let row = event_categories::table
            .filter(event_categories::category_id.eq(category_id))
            .select(EventCategoryDB::as_select())
            .first::<EventCategoryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(EventCategory::from))
    }

    fn list(&self, is_active: Option<bool>) -> Result<Vec<EventCategory>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = event_categories::table
            .select(EventCategoryDB::as_select())
            .into_boxed();
        if let Some(active) = is_active {
            query = query.filter(event_categories::is_active.eq(active));
        }
        let rows = query
            .order(event_categories::name.asc())
            .load::<EventCategoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(EventCategory::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    async fn create_test_repository() -> (CategoryRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (CategoryRepository::new(pool, writer), temp_dir)
    }

    fn upsert(category_id: &str, name: &str, is_active: bool) -> CategoryUpsert {
        CategoryUpsert {
            category_id: category_id.to_string(),
            name: name.to_string(),
            color: Some("#ff0000".to_string()),
            is_active,
            synced_at: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_on_category_id() {
        let (repo, _temp_dir) = create_test_repository().await;

        let first = repo
            .upsert_by_category_id(upsert("7", "Music", true))
            .await
            .unwrap();
        assert!(first.created);

        let mut second_upsert = upsert("7", "Live Music", false);
        second_upsert.synced_at += Duration::hours(1);
        let second = repo.upsert_by_category_id(second_upsert).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.record.name, "Live Music");
        assert_eq!(second.record.created_at, first.record.created_at);
        assert!(second.record.updated_at > first.record.updated_at);

        assert_eq!(repo.list(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_on_active_flag() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.upsert_by_category_id(upsert("1", "Sports", true))
            .await
            .unwrap();
        repo.upsert_by_category_id(upsert("2", "Comedy", false))
            .await
            .unwrap();

        let all = repo.list(None).unwrap();
        assert_eq!(
            all.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Comedy", "Sports"]
        );
        assert_eq!(repo.list(Some(true)).unwrap().len(), 1);
        assert!(repo.get_by_category_id("2").unwrap().is_some());
        assert!(repo.get_by_category_id("3").unwrap().is_none());
    }
}
