use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{info, instrument};

use crate::config::TrafficLensConfig;
use crate::error::ErrorBody;
use crate::maps::{MapsTransport, SubscriptionKey};
use crate::models::{RawSummaryRequest, SummaryOutcome, SummaryRequest};
use crate::traffic_summary::TrafficSummaryService;
use crate::{Result, TrafficLensError};

/// Header carrying the caller's Azure Maps credential
pub const SUBSCRIPTION_KEY_HEADER: &str = "subscription_key";

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    service: TrafficSummaryService,
    fallback_key: Option<SubscriptionKey>,
}

impl AppState {
    pub fn new(transport: Arc<dyn MapsTransport>, config: &TrafficLensConfig) -> Self {
        Self {
            service: TrafficSummaryService::new(transport, &config.defaults),
            fallback_key: config
                .maps
                .subscription_key
                .as_deref()
                .map(SubscriptionKey::new),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    location: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/azureMapApi", get(summarize).post(summarize))
        .route("/geocode", get(geocode))
        .with_state(state)
}

#[instrument(skip_all)]
async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<RawSummaryRequest>, QueryRejection>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    info!("Traffic summary request received");

    let body = body.map_err(body_rejection)?;
    let raw = raw_request(query, &body)?;
    let request = SummaryRequest::try_from(raw)?;
    let key = subscription_key(&headers, state.fallback_key.as_ref())?;

    match state.service.summarize(&key, &request).await? {
        SummaryOutcome::Found(combined) => pretty_json(StatusCode::OK, &combined),
        SummaryOutcome::NotFound { location } => Ok(not_found(&location)),
    }
}

#[instrument(skip_all)]
async fn geocode(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|e| TrafficLensError::invalid_request(e.body_text()))?;
    let location = query
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            TrafficLensError::invalid_request("expected a 'location' query parameter")
        })?;
    let key = subscription_key(&headers, state.fallback_key.as_ref())?;

    match state.service.geocode(&key, &location).await? {
        Some(coordinate) => Ok(Json(coordinate).into_response()),
        None => Ok(not_found(&location)),
    }
}

/// Oversized bodies keep their 413; any other unreadable body is a bad request
fn body_rejection(rejection: BytesRejection) -> TrafficLensError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TrafficLensError::PayloadTooLarge {
            message: rejection.body_text(),
        }
    } else {
        TrafficLensError::invalid_request(rejection.body_text())
    }
}

/// The JSON body wins; an empty body falls back to the query string
fn raw_request(
    query: std::result::Result<Query<RawSummaryRequest>, QueryRejection>,
    body: &[u8],
) -> Result<RawSummaryRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return query
            .map(|Query(raw)| raw)
            .map_err(|e| TrafficLensError::invalid_request(e.body_text()));
    }

    serde_json::from_slice(body)
        .map_err(|e| TrafficLensError::invalid_request(format!("Body is not valid JSON: {e}")))
}

fn subscription_key(
    headers: &HeaderMap,
    fallback: Option<&SubscriptionKey>,
) -> Result<SubscriptionKey> {
    match headers.get(SUBSCRIPTION_KEY_HEADER).map(|value| value.to_str()) {
        Some(Ok(value)) if !value.trim().is_empty() => Ok(SubscriptionKey::new(value.trim())),
        Some(Err(_)) => Err(TrafficLensError::invalid_request(
            "subscription_key header is not valid text",
        )),
        _ => fallback
            .cloned()
            .ok_or_else(|| TrafficLensError::invalid_request("missing subscription_key header")),
    }
}

fn not_found(location: &str) -> Response {
    info!("Location not found: {}", location);
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(
            "not_found",
            format!("Location '{location}' not found. Please try a different location."),
        )),
    )
        .into_response()
}

/// Serialize with four-space indentation
fn pretty_json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(std::io::Error::from)?;

    Ok((
        status,
        [(header::CONTENT_TYPE, "application/json")],
        buffer,
    )
        .into_response())
}
