//! Core types and service wiring for the parkfeed parking availability ingester.

/// HTTP retrieval of provider payloads.
pub mod fetch;
/// Domain models and identifiers shared by all providers.
pub mod model;
/// Coercion helpers for loosely typed provider fields.
pub mod normalize;
/// Registry and helpers for plugging city-specific providers into the service.
pub mod plugin;
/// Traits describing the provider and storage interfaces.
pub mod ports;
/// Ingestion pipeline run once per registered source.
pub mod service;
/// Durable storage of datasets with a last-known-good fallback copy.
pub mod store;

pub use fetch::*;
pub use model::*;
pub use normalize::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
pub use store::*;
