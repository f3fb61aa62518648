use serde_json::Value;
use tracing::{info, instrument};

use crate::Result;
use crate::maps::{Endpoint, MapsTransport, SubscriptionKey};
use crate::models::Coordinate;

const TRAVEL_MODE: &str = "car";

/// Driving route between two points, returned verbatim
#[instrument(skip(transport, key))]
pub async fn get_route_details(
    transport: &dyn MapsTransport,
    key: &SubscriptionKey,
    source: Coordinate,
    destination: Coordinate,
) -> Result<Value> {
    info!("Fetching route details from {} to {}", source, destination);

    transport
        .get_json(
            Endpoint::RouteDirections,
            vec![
                ("subscription-key", key.expose().to_string()),
                (
                    "query",
                    format!("{}:{}", source.to_query(), destination.to_query()),
                ),
                ("travelMode", TRAVEL_MODE.to_string()),
            ],
        )
        .await
}
