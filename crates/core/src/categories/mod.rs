//! Event categories module - domain models, services, and traits.

mod categories_model;
mod categories_service;
mod categories_traits;

#[cfg(test)]
mod categories_service_tests;

pub use categories_model::{CategorySyncSummary, CategoryUpsert, EventCategory};
pub use categories_service::CategoryService;
pub use categories_traits::{CategoryRepositoryTrait, CategoryServiceTrait};
