//! Traffic Summary Module
//!
//! Runs one summary request end to end: geocode the place names, fetch
//! flow, incidents and route strictly one after another, then compose.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::Result;
use crate::composer::compose;
use crate::config::DefaultsConfig;
use crate::location_resolver::LocationResolver;
use crate::maps::{MapsTransport, SubscriptionKey};
use crate::models::{Coordinate, SummaryOutcome, SummaryRequest};
use crate::routing::get_route_details;
use crate::traffic::{FlowOptions, IncidentOptions, fetch_flow, fetch_incidents};

/// Service combining flow, incidents and route for a request
#[derive(Clone)]
pub struct TrafficSummaryService {
    transport: Arc<dyn MapsTransport>,
    flow_options: FlowOptions,
    incident_options: IncidentOptions,
    synthetic_offset_degrees: f64,
}

impl TrafficSummaryService {
    pub fn new(transport: Arc<dyn MapsTransport>, defaults: &DefaultsConfig) -> Self {
        Self {
            transport,
            flow_options: FlowOptions::from(defaults),
            incident_options: IncidentOptions::from(defaults),
            synthetic_offset_degrees: defaults.synthetic_offset_degrees,
        }
    }

    /// Resolve a single place name
    pub async fn geocode(
        &self,
        key: &SubscriptionKey,
        location: &str,
    ) -> Result<Option<Coordinate>> {
        LocationResolver::resolve(self.transport.as_ref(), key, location).await
    }

    /// Produce the combined summary, or `NotFound` when a place does not geocode.
    ///
    /// No flow, incident or route call is made unless every place resolved.
    #[instrument(skip(self, key))]
    pub async fn summarize(
        &self,
        key: &SubscriptionKey,
        request: &SummaryRequest,
    ) -> Result<SummaryOutcome> {
        let (start, end) = match request {
            SummaryRequest::ByLocation(location) => {
                let Some(start) = self.geocode(key, location).await? else {
                    return Ok(SummaryOutcome::NotFound {
                        location: location.clone(),
                    });
                };
                (start, start.offset(self.synthetic_offset_degrees))
            }
            SummaryRequest::ByRoute { from, to } => {
                let origin = self.geocode(key, from).await?;
                let destination = self.geocode(key, to).await?;
                match (origin, destination) {
                    (Some(origin), Some(destination)) => (origin, destination),
                    (None, _) => {
                        return Ok(SummaryOutcome::NotFound {
                            location: from.clone(),
                        });
                    }
                    (_, None) => {
                        return Ok(SummaryOutcome::NotFound {
                            location: to.clone(),
                        });
                    }
                }
            }
        };

        let transport = self.transport.as_ref();
        let traffic_flow = fetch_flow(transport, key, start, &self.flow_options).await?;
        let traffic_incidents =
            fetch_incidents(transport, key, start, end, &self.incident_options).await?;
        let route_details = get_route_details(transport, key, start, end).await?;

        info!("Traffic summary ready for {} -> {}", start, end);
        Ok(SummaryOutcome::Found(compose(
            traffic_flow,
            traffic_incidents,
            route_details,
        )))
    }
}
