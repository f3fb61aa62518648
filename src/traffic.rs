//! Traffic flow and incident fetchers

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::DefaultsConfig;
use crate::maps::{Endpoint, MapsTransport, SubscriptionKey};
use crate::models::{BoundingBox, Coordinate};
use crate::{Result, TrafficLensError};

/// Flow segment query options
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    pub zoom: u8,
    pub style: String,
    pub unit: String,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            zoom: 5,
            style: "absolute".to_string(),
            unit: "KMPH".to_string(),
        }
    }
}

impl From<&DefaultsConfig> for FlowOptions {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            zoom: defaults.flow_zoom,
            style: defaults.flow_style.clone(),
            unit: defaults.flow_unit.clone(),
        }
    }
}

/// Incident query options
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentOptions {
    pub bounding_zoom: u8,
    pub style: String,
}

impl Default for IncidentOptions {
    fn default() -> Self {
        Self {
            bounding_zoom: 5,
            style: "s1".to_string(),
        }
    }
}

impl From<&DefaultsConfig> for IncidentOptions {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            bounding_zoom: defaults.incident_zoom,
            style: defaults.incident_style.clone(),
        }
    }
}

/// Snapshot of traffic state returned by the viewport call.
/// Valid only for the detail call that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficModelId(String);

impl TrafficModelId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrafficModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct ViewportResponse {
    #[serde(rename = "viewpResp")]
    viewport: ViewportBody,
}

#[derive(Debug, Deserialize)]
struct ViewportBody {
    #[serde(rename = "trafficState")]
    traffic_state: TrafficState,
}

#[derive(Debug, Deserialize)]
struct TrafficState {
    #[serde(rename = "@trafficModelId")]
    traffic_model_id: ModelIdValue,
}

/// Azure has been seen to send the id both as a string and as a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelIdValue {
    Text(String),
    Number(u64),
}

impl ViewportResponse {
    fn into_model_id(self) -> Option<TrafficModelId> {
        let id = match self.viewport.traffic_state.traffic_model_id {
            ModelIdValue::Text(text) => text.trim().to_string(),
            ModelIdValue::Number(number) => number.to_string(),
        };
        (!id.is_empty()).then_some(TrafficModelId(id))
    }
}

/// Current flow for the road segment nearest `point`, returned verbatim
#[instrument(skip(transport, key, options))]
pub async fn fetch_flow(
    transport: &dyn MapsTransport,
    key: &SubscriptionKey,
    point: Coordinate,
    options: &FlowOptions,
) -> Result<Value> {
    info!("Fetching traffic flow data at {}", point);

    transport
        .get_json(
            Endpoint::TrafficFlowSegment,
            vec![
                ("subscription-key", key.expose().to_string()),
                ("query", point.to_query()),
                ("zoom", options.zoom.to_string()),
                ("style", options.style.clone()),
                ("unit", options.unit.clone()),
            ],
        )
        .await
}

/// First incident step: the traffic model id for `bbox`.
///
/// A missing or empty id is an upstream failure, so the detail step can
/// only ever run with a real snapshot.
#[instrument(skip(transport, key, bbox, options), fields(bbox = %bbox))]
pub async fn fetch_traffic_model_id(
    transport: &dyn MapsTransport,
    key: &SubscriptionKey,
    bbox: &BoundingBox,
    options: &IncidentOptions,
) -> Result<TrafficModelId> {
    let bbox_text = bbox.to_string();
    let zoom = options.bounding_zoom.to_string();

    let body = transport
        .get_json(
            Endpoint::TrafficIncidentViewport,
            vec![
                ("boundingbox", bbox_text.clone()),
                ("boundingzoom", zoom.clone()),
                ("overviewbox", bbox_text),
                ("overviewzoom", zoom),
                ("subscription-key", key.expose().to_string()),
            ],
        )
        .await
        .inspect_err(|e| warn!("Viewport call failed, skipping incident detail: {}", e))?;

    let viewport: ViewportResponse = serde_json::from_value(body).map_err(|e| {
        TrafficLensError::upstream(
            Endpoint::TrafficIncidentViewport.name(),
            None,
            format!("Viewport response has no traffic model id: {e}"),
        )
    })?;

    let model_id = viewport.into_model_id().ok_or_else(|| {
        TrafficLensError::upstream(
            Endpoint::TrafficIncidentViewport.name(),
            None,
            "Viewport response has an empty traffic model id",
        )
    })?;

    debug!("Traffic Model ID: {}", model_id);
    Ok(model_id)
}

/// Second incident step: details for `bbox` in the given snapshot
#[instrument(
    skip(transport, key, bbox, model_id, options),
    fields(bbox = %bbox, model_id = %model_id)
)]
pub async fn fetch_incident_detail(
    transport: &dyn MapsTransport,
    key: &SubscriptionKey,
    bbox: &BoundingBox,
    model_id: &TrafficModelId,
    options: &IncidentOptions,
) -> Result<Value> {
    transport
        .get_json(
            Endpoint::TrafficIncidentDetail,
            vec![
                ("style", options.style.clone()),
                ("subscription-key", key.expose().to_string()),
                ("boundingbox", bbox.to_string()),
                ("boundingZoom", options.bounding_zoom.to_string()),
                ("trafficmodelid", model_id.as_str().to_string()),
            ],
        )
        .await
}

/// Incidents inside the box spanned by `start` and `end`
pub async fn fetch_incidents(
    transport: &dyn MapsTransport,
    key: &SubscriptionKey,
    start: Coordinate,
    end: Coordinate,
    options: &IncidentOptions,
) -> Result<Value> {
    info!("Fetching traffic incident details between {} and {}", start, end);

    let bbox = BoundingBox::from_corners(start, end);
    let model_id = fetch_traffic_model_id(transport, key, &bbox, options).await?;
    fetch_incident_detail(transport, key, &bbox, &model_id, options).await
}
