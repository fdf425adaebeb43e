//! SQLite storage implementation for event categories.

mod model;
mod repository;

pub use model::EventCategoryDB;
pub use repository::CategoryRepository;
