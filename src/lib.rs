//! `TrafficLens` - traffic summaries from Azure Maps
//!
//! This library resolves place names, fetches traffic flow, incidents and a
//! driving route from Azure Maps, and merges them into one JSON document
//! served over HTTP.

pub mod api;
pub mod composer;
pub mod config;
pub mod error;
pub mod location_resolver;
pub mod maps;
pub mod models;
pub mod routing;
pub mod telemetry;
pub mod traffic;
pub mod traffic_summary;
pub mod web;

// Re-export core types for public API
pub use config::TrafficLensConfig;
pub use error::TrafficLensError;
pub use location_resolver::LocationResolver;
pub use maps::{AzureMapsClient, Endpoint, MapsTransport, SubscriptionKey};
pub use models::{CombinedResponse, Coordinate, SummaryOutcome, SummaryRequest};
pub use traffic_summary::TrafficSummaryService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TrafficLensError>;
