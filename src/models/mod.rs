//! Data models for the TrafficLens service
//!
//! - Coordinate: resolved points and bounding boxes
//! - Request: the inbound request and its tagged parsed form
//! - Summary: the combined document and run outcome

pub mod coordinate;
pub mod request;
pub mod summary;

pub use coordinate::{BoundingBox, Coordinate};
pub use request::{RawSummaryRequest, SummaryRequest};
pub use summary::{CombinedResponse, SummaryOutcome};
