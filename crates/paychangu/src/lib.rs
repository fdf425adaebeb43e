//! PayChangu integration for EventHub.
//!
//! This crate implements the catalog provider and payment gateway traits
//! defined in `eventhub-core` on top of the PayChangu HTTP API.

mod client;
mod model;

pub use client::{PayChanguClient, PayChanguConfig, DEFAULT_PAYCHANGU_API_URL};
