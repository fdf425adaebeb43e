//! Tickets module - catalog ticket mirror, redemption, and traits.

mod tickets_errors;
mod tickets_model;
mod tickets_service;
mod tickets_traits;


pub use tickets_errors::TicketError;
pub use tickets_model::{
    EventTickets, PaymentStatus, RedemptionUpdate, Ticket, TicketSyncSummary, TicketUpsert,
};
pub use tickets_service::TicketService;
pub use tickets_traits::{TicketRepositoryTrait, TicketServiceTrait};
