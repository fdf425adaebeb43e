use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::tickets_errors::TicketError;
use super::tickets_model::{
    EventTickets, PaymentStatus, RedemptionUpdate, Ticket, TicketSyncSummary, TicketUpsert,
};
use super::tickets_traits::{TicketRepositoryTrait, TicketServiceTrait};
use crate::catalog::{CatalogProviderTrait, ExternalTicket, SyncFailure};
use crate::errors::{Error, Result, UpstreamError};
use crate::utils::time_utils::{now_naive, parse_flexible_datetime};

pub struct TicketService {
    repository: Arc<dyn TicketRepositoryTrait>,
    provider: Arc<dyn CatalogProviderTrait>,
}

impl TicketService {
    pub fn new(
        repository: Arc<dyn TicketRepositoryTrait>,
        provider: Arc<dyn CatalogProviderTrait>,
    ) -> Self {
        Self {
            repository,
            provider,
        }
    }

    /// Writes the redemption state locally, syncing the ticket once if the
    /// local row is missing.
    async fn mirror_redemption(&self, ticket_id: &str, update: RedemptionUpdate) -> Result<Ticket> {
        if let Some(ticket) = self
            .repository
            .set_redemption(ticket_id, update.clone())
            .await?
        {
            return Ok(ticket);
        }

        debug!("Ticket {} not stored locally, syncing before retry", ticket_id);
        self.sync_single_ticket(ticket_id).await?;
        self.repository
            .set_redemption(ticket_id, update)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Ticket '{}'", ticket_id)))
    }
}

fn redemption_conflict(ticket_id: &str, err: Error) -> Error {
    match err {
        Error::Upstream(UpstreamError::AlreadyRedeemed) => {
            TicketError::AlreadyRedeemed(ticket_id.to_string()).into()
        }
        Error::Upstream(UpstreamError::NotRedeemed) => {
            TicketError::NotRedeemed(ticket_id.to_string()).into()
        }
        other => other,
    }
}

#[async_trait]
impl TicketServiceTrait for TicketService {
    async fn list_tickets_for_event(&self, event_id: &str) -> Result<EventTickets> {
        let external = self.provider.list_event_tickets(event_id).await?;
        let sync = self.sync_tickets_to_database(event_id, external).await?;
        let tickets = self.repository.list_for_event(event_id, None)?;
        Ok(EventTickets { tickets, sync })
    }

    async fn sync_tickets_to_database(
        &self,
        event_id: &str,
        tickets: Vec<ExternalTicket>,
    ) -> Result<TicketSyncSummary> {
        let synced_at = now_naive();
        let mut created = 0;
        let mut updated = 0;
        let mut failures = Vec::new();

        for external in &tickets {
            let result = match TicketUpsert::from_external(external, Some(event_id), synced_at) {
                Ok(upsert) => self.repository.upsert_by_ticket_id(upsert).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) if outcome.created => created += 1,
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!("Failed to sync ticket {:?}: {}", external.id, e);
                    failures.push(SyncFailure {
                        external_id: external.external_id().map(str::to_string),
                        slug: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Synced tickets for event {}: {} created, {} updated, {} failed",
            event_id,
            created,
            updated,
            failures.len()
        );

        Ok(TicketSyncSummary {
            event_id: event_id.to_string(),
            total: tickets.len(),
            created,
            updated,
            failed: failures.len(),
            failures,
            synced_at,
        })
    }

    async fn sync_single_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        let external = self.provider.get_ticket(ticket_id).await?;
        let upsert = TicketUpsert::from_external(&external, None, now_naive())?;
        Ok(self.repository.upsert_by_ticket_id(upsert).await?.record)
    }

    async fn redeem_ticket(&self, ticket_id: &str, redeemed_by: &str) -> Result<Ticket> {
        let external = self
            .provider
            .redeem_ticket(ticket_id)
            .await
            .map_err(|e| redemption_conflict(ticket_id, e))?;

        let redeemed_at = external
            .redeemed_at
            .as_deref()
            .and_then(parse_flexible_datetime)
            .unwrap_or_else(now_naive);
        info!("Ticket {} redeemed by {}", ticket_id, redeemed_by);

        self.mirror_redemption(
            ticket_id,
            RedemptionUpdate {
                is_redeemed: true,
                redeemed_by: Some(redeemed_by.to_string()),
                redeemed_at: Some(redeemed_at),
            },
        )
        .await
    }

    async fn unredeem_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        self.provider
            .unredeem_ticket(ticket_id)
            .await
            .map_err(|e| redemption_conflict(ticket_id, e))?;
        info!("Ticket {} redemption reversed", ticket_id);

        self.mirror_redemption(
            ticket_id,
            RedemptionUpdate {
                is_redeemed: false,
                redeemed_by: None,
                redeemed_at: None,
            },
        )
        .await
    }

    fn list_local_tickets(
        &self,
        event_id: &str,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Ticket>> {
        self.repository.list_for_event(event_id, payment_status)
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket> {
        match self.repository.get_by_ticket_id(ticket_id)? {
            Some(ticket) => Ok(ticket),
            None => self.sync_single_ticket(ticket_id).await,
        }
    }
}
