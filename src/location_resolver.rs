//! Location Resolution Module
//!
//! Resolves free-text place names into coordinates through the Azure Maps
//! address search.

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::maps::{Endpoint, MapsTransport, SubscriptionKey};
use crate::models::Coordinate;
use crate::{Result, TrafficLensError};

/// Address search response, reduced to what resolution needs
#[derive(Debug, Deserialize)]
struct SearchAddressResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    position: Position,
}

#[derive(Debug, Deserialize)]
struct Position {
    lat: f64,
    lon: f64,
}

/// Service for resolving place names
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a place name to the position of the first search result.
    ///
    /// `Ok(None)` means the search succeeded but found nothing.
    #[instrument(skip(transport, key))]
    pub async fn resolve(
        transport: &dyn MapsTransport,
        key: &SubscriptionKey,
        location: &str,
    ) -> Result<Option<Coordinate>> {
        debug!("Geocoding location name: {}", location);

        let body = transport
            .get_json(
                Endpoint::SearchAddress,
                vec![
                    ("subscription-key", key.expose().to_string()),
                    ("query", location.to_string()),
                ],
            )
            .await?;

        let response: SearchAddressResponse = serde_json::from_value(body).map_err(|e| {
            TrafficLensError::upstream(
                Endpoint::SearchAddress.name(),
                None,
                format!("Unexpected search response shape: {e}"),
            )
        })?;

        match response.results.into_iter().next() {
            Some(result) => {
                let coordinate = Coordinate::new(result.position.lat, result.position.lon);
                debug!("Found location: {} at {}", location, coordinate);
                Ok(Some(coordinate))
            }
            None => {
                warn!("No results found for location '{}'", location);
                Ok(None)
            }
        }
    }
}
