use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use eventhub_core::catalog::UpsertOutcome;
use eventhub_core::tickets::{
    PaymentStatus, RedemptionUpdate, Ticket, TicketRepositoryTrait, TicketUpsert,
};
use eventhub_core::utils::time_utils::now_naive;
use eventhub_core::Result;

use super::model::TicketDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::tickets;

pub struct TicketRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TicketRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        TicketRepository { pool, writer }
    }
}

fn find_by_ticket_id(conn: &mut SqliteConnection, ticket_id: &str) -> Result<Option<TicketDB>> {
    Ok(tickets::table
        .filter(tickets::paychangu_ticket_id.eq(ticket_id))
        .select(TicketDB::as_select())
        .first::<TicketDB>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

#[async_trait]
impl TicketRepositoryTrait for TicketRepository {
    async fn upsert_by_ticket_id(&self, upsert: TicketUpsert) -> Result<UpsertOutcome<Ticket>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<UpsertOutcome<Ticket>> {
                let existing = find_by_ticket_id(conn, &upsert.paychangu_ticket_id)?;
                let created = existing.is_none();
                let record = match existing {
                    Some(mut row) => {
                        row.apply_upsert(upsert);
                        diesel::update(tickets::table.find(row.id.clone()))
                            .set(&row)
                            .returning(TicketDB::as_returning())
                            .get_result(conn)
                            .map_err(StorageError::from)?
                    }
                    None => diesel::insert_into(tickets::table)
                        .values(&TicketDB::new(Uuid::new_v4().to_string(), upsert))
                        .returning(TicketDB::as_returning())
                        .get_result(conn)
                        .map_err(StorageError::from)?,
                };
                Ok(UpsertOutcome {
                    record: record.into(),
                    created,
                })
            })
            .await
    }

    fn get_by_ticket_id(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(find_by_ticket_id(&mut conn, ticket_id)?.map(Ticket::from))
    }

    fn list_for_event(
        &self,
        event_id: &str,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<Ticket>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = tickets::table
            .filter(tickets::event_id.eq(event_id))
            .select(TicketDB::as_select())
            .into_boxed();
        if let Some(status) = payment_status {
            query = query.filter(tickets::payment_status.eq(status.as_str()));
        }
        let rows = query
            .order((tickets::created_at.asc(), tickets::paychangu_ticket_id.asc()))
            .load::<TicketDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn set_redemption(
        &self,
        ticket_id: &str,
        update: RedemptionUpdate,
    ) -> Result<Option<Ticket>> {
        let ticket_id = ticket_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Ticket>> {
                let row = diesel::update(
                    tickets::table.filter(tickets::paychangu_ticket_id.eq(&ticket_id)),
                )
                .set((
                    tickets::is_redeemed.eq(update.is_redeemed),
                    tickets::redeemed_by.eq(update.redeemed_by),
                    tickets::redeemed_at.eq(update.redeemed_at),
                    tickets::updated_at.eq(now_naive()),
                ))
                .returning(TicketDB::as_returning())
                .get_result(conn)
                .optional()
                .map_err(StorageError::from)?;
                Ok(row.map(Ticket::from))
            })
            .await
    }
}
