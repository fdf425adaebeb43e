use thiserror::Error;

/// Ticket redemption conflicts reported by the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("Ticket {0} has already been redeemed")]
    AlreadyRedeemed(String),

    #[error("Ticket {0} has not been redeemed")]
    NotRedeemed(String),
}
