#[cfg(test)]
mod tests {
    use crate::catalog::{
        CatalogProviderTrait, ExternalCategory, ExternalEvent, ExternalTicket, UpsertOutcome,
    };
    use crate::categories::*;
    use crate::errors::{Error, Result, UpstreamError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockCategoryRepository {
        categories: Mutex<HashMap<String, EventCategory>>,
    }

    #[async_trait]
    impl CategoryRepositoryTrait for MockCategoryRepository {
        async fn upsert_by_category_id(
            &self,
            upsert: CategoryUpsert,
        ) -> Result<UpsertOutcome<EventCategory>> {
            let mut categories = self.categories.lock().unwrap();
            let created = !categories.contains_key(&upsert.category_id);
            let category = EventCategory {
                id: format!("local-{}", upsert.category_id),
                category_id: upsert.category_id.clone(),
                name: upsert.name,
                color: upsert.color,
                is_active: upsert.is_active,
                last_synced_at: Some(upsert.synced_at),
                created_at: upsert.synced_at,
                updated_at: upsert.synced_at,
            };
            categories.insert(upsert.category_id, category.clone());
            Ok(UpsertOutcome {
                record: category,
                created,
            })
        }

        fn get_by_category_id(&self, category_id: &str) -> Result<Option<EventCategory>> {
            Ok(self.categories.lock().unwrap().get(category_id).cloned())
        }

        fn list(&self, is_active_filter: Option<bool>) -> Result<Vec<EventCategory>> {
            let mut list: Vec<EventCategory> = self
                .categories
                .lock()
                .unwrap()
                .values()
                .filter(|c| is_active_filter.map_or(true, |active| c.is_active == active))
                .cloned()
                .collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(list)
        }
    }

    struct MockCatalog {
        categories: Option<Vec<ExternalCategory>>,
    }

    #[async_trait]
    impl CatalogProviderTrait for MockCatalog {
        async fn list_events(&self, _page_size: u32) -> Result<Vec<ExternalEvent>> {
            unimplemented!()
        }

        async fn get_event(&self, _slug: &str) -> Result<ExternalEvent> {
            unimplemented!()
        }

        async fn list_categories(&self) -> Result<Vec<ExternalCategory>> {
            self.categories
                .clone()
                .ok_or_else(|| UpstreamError::Transport("connection refused".to_string()).into())
        }

        async fn list_event_tickets(&self, _event_id: &str) -> Result<Vec<ExternalTicket>> {
            unimplemented!()
        }

        async fn get_ticket(&self, _ticket_id: &str) -> Result<ExternalTicket> {
            unimplemented!()
        }

        async fn redeem_ticket(&self, _ticket_id: &str) -> Result<ExternalTicket> {
            unimplemented!()
        }

        async fn unredeem_ticket(&self, _ticket_id: &str) -> Result<ExternalTicket> {
            unimplemented!()
        }
    }

    fn category(id: Option<&str>, name: &str, active: Option<bool>) -> ExternalCategory {
        ExternalCategory {
            id: id.map(str::to_string),
            name: Some(name.to_string()),
            color: None,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_sync_counts_created_updated_and_failed() {
        let repo = Arc::new(MockCategoryRepository::default());
        let catalog = Arc::new(MockCatalog {
            categories: Some(vec![
                category(Some("1"), "Music", None),
                category(Some("2"), "Sports", Some(false)),
                category(None, "Orphan", None),
            ]),
        });
        let service = CategoryService::new(repo.clone(), catalog);

        let first = service.sync_categories().await.unwrap();
        assert_eq!(first.total_external, 3);
        assert_eq!(first.created, 2);
        assert_eq!(first.failed, 1);
        assert_eq!(first.failures[0].external_id, None);

        let second = service.sync_categories().await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);

        let active = service.list_categories(Some(true)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Music");

        let resolved = service.resolve_local_category("2").unwrap().unwrap();
        assert_eq!(resolved.id, "local-2");
        assert!(service.resolve_local_category("99").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_fails_when_catalog_unreachable() {
        let service = CategoryService::new(
            Arc::new(MockCategoryRepository::default()),
            Arc::new(MockCatalog { categories: None }),
        );
        let err = service.sync_categories().await.unwrap_err();
        assert!(matches!(err, Error::Upstream(UpstreamError::Transport(_))));
    }
}
