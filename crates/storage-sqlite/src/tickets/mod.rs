//! SQLite storage implementation for mirrored tickets.

mod model;
mod repository;

pub use model::TicketDB;
pub use repository::TicketRepository;
