use async_trait::async_trait;

use super::tickets_model::{
    EventTickets, PaymentStatus, RedemptionUpdate, Ticket, TicketSyncSummary, TicketUpsert,
};
use crate::catalog::{ExternalTicket, UpsertOutcome};
use crate::errors::Result;

/// Persistence contract for mirrored tickets.
#[async_trait]
pub trait TicketRepositoryTrait: Send + Sync {
    /// Inserts or updates the ticket with the same `paychangu_ticket_id`.
    async fn upsert_by_ticket_id(&self, upsert: TicketUpsert) -> Result<UpsertOutcome<Ticket>>;

    fn get_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>>;

    fn list_for_event(
        &self,
        event_id: &str,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Ticket>>;

    /// Writes the redemption state. Returns `None` when no local row exists.
    async fn set_redemption(
        &self,
        ticket_id: &str,
        update: RedemptionUpdate,
    ) -> Result<Option<Ticket>>;
}

/// Ticket operations used by organizers and vendors.
#[async_trait]
pub trait TicketServiceTrait: Send + Sync {
    /// Pulls the event's tickets from the catalog, syncs them and returns the local set.
    async fn list_tickets_for_event(&self, event_id: &str) -> Result<EventTickets>;

    async fn sync_tickets_to_database(
        &self,
        event_id: &str,
        tickets: Vec<ExternalTicket>,
    ) -> Result<TicketSyncSummary>;

    async fn sync_single_ticket(&self, ticket_id: &str) -> Result<Ticket>;

    async fn redeem_ticket(&self, ticket_id: &str, redeemed_by: &str) -> Result<Ticket>;

    async fn unredeem_ticket(&self, ticket_id: &str) -> Result<Ticket>;

    fn list_local_tickets(
        &self,
        event_id: &str,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Ticket>>;

    /// Local lookup, syncing the ticket from the catalog when it is missing.
    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket>;
}
