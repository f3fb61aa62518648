//! Combined response returned to the caller

use serde::Serialize;
use serde_json::Value;

/// Merged upstream documents, geometry already stripped
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CombinedResponse {
    pub traffic_flow: Value,
    pub traffic_incidents: Value,
    pub route_details: Value,
}

/// Result of a summary run. `NotFound` is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Found(CombinedResponse),
    NotFound { location: String },
}
