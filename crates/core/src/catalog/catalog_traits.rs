//! Trait for the external system of record for events, categories and tickets.

use async_trait::async_trait;

use super::catalog_model::{ExternalCategory, ExternalEvent, ExternalTicket};
use crate::errors::Result;

/// Read/write access to the external catalog.
///
/// Implementations report failures as [`crate::errors::UpstreamError`] wrapped
/// in [`crate::Error::Upstream`].
#[async_trait]
pub trait CatalogProviderTrait: Send + Sync {
    /// Fetches one listing page of events (up to `page_size` records).
    async fn list_events(&self, page_size: u32) -> Result<Vec<ExternalEvent>>;

    /// Fetches a single event by its public slug.
    async fn get_event(&self, slug: &str) -> Result<ExternalEvent>;

    /// Fetches all event categories.
    async fn list_categories(&self) -> Result<Vec<ExternalCategory>>;

    /// Fetches every ticket sold for an external event id.
    async fn list_event_tickets(&self, event_id: &str) -> Result<Vec<ExternalTicket>>;

    /// Fetches a single ticket by its external id.
    async fn get_ticket(&self, ticket_id: &str) -> Result<ExternalTicket>;

    /// Marks a ticket as redeemed upstream.
    async fn redeem_ticket(&self, ticket_id: &str) -> Result<ExternalTicket>;

    /// Reverts a ticket redemption upstream.
    async fn unredeem_ticket(&self, ticket_id: &str) -> Result<ExternalTicket>;
}
