//! Inbound summary request and its parsed form

use serde::Deserialize;

use crate::TrafficLensError;

/// Request fields exactly as they arrive, from the JSON body or the query string
#[derive(Debug, Default, Deserialize, Clone)]
pub struct RawSummaryRequest {
    pub location: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// What the caller asked for, decided once at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRequest {
    /// A single place; the route and incident box end at a synthetic nearby point
    ByLocation(String),
    /// Origin and destination place names
    ByRoute { from: String, to: String },
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<RawSummaryRequest> for SummaryRequest {
    type Error = TrafficLensError;

    fn try_from(raw: RawSummaryRequest) -> Result<Self, Self::Error> {
        let location = non_blank(raw.location);
        let from = non_blank(raw.from);
        let to = non_blank(raw.to);

        match (location, from, to) {
            (Some(location), None, None) => Ok(SummaryRequest::ByLocation(location)),
            (None, Some(from), Some(to)) => Ok(SummaryRequest::ByRoute { from, to }),
            (Some(_), _, _) => Err(TrafficLensError::invalid_request(
                "'location' cannot be combined with 'from'/'to'",
            )),
            (None, Some(_), None) => Err(TrafficLensError::invalid_request(
                "'from' was given without 'to'",
            )),
            (None, None, Some(_)) => Err(TrafficLensError::invalid_request(
                "'to' was given without 'from'",
            )),
            (None, None, None) => Err(TrafficLensError::invalid_request(
                "expected either 'location' or both 'from' and 'to'",
            )),
        }
    }
}
