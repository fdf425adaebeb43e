//! Catalog provider contract - records as published by the external catalog
//! (PayChangu events API) and the trait used to fetch them.

mod catalog_model;
mod catalog_traits;

pub use catalog_model::{
    ExternalCategory, ExternalEvent, ExternalTicket, SyncFailure, UpsertOutcome,
};
pub use catalog_traits::CatalogProviderTrait;
