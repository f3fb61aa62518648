//! Azure Maps REST client
//!
//! Thin HTTP layer: builds the URL, sends the GET through a retrying
//! middleware stack, and turns anything but a 2xx JSON body into an
//! upstream error. The subscription key travels in the query string, so
//! URLs are never logged and reqwest errors are stripped of theirs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryError, RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{Endpoint, MapsTransport, QueryParams};
use crate::config::MapsConfig;
use crate::{Result, TrafficLensError};

const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// Production [`MapsTransport`] backed by reqwest
pub struct AzureMapsClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_version: String,
}

impl AzureMapsClient {
    /// Create a new Azure Maps client
    pub fn new(config: &MapsConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("TrafficLens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrafficLensError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Url> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        query.push(("api-version", self.api_version.as_str()));
        query.extend(params.iter().map(|(name, value)| (*name, value.as_str())));

        Url::parse_with_params(&format!("{}{}", self.base_url, endpoint.path()), &query)
            .map_err(|e| TrafficLensError::config(format!("Invalid Azure Maps URL: {e}")))
    }
}

#[async_trait]
impl MapsTransport for AzureMapsClient {
    #[instrument(name = "azure_maps", skip(self, endpoint, params), fields(endpoint = %endpoint))]
    async fn get_json(&self, endpoint: Endpoint, params: QueryParams) -> Result<Value> {
        let url = self.url(endpoint, &params)?;
        let start_time = Instant::now();

        debug!("GET {}", endpoint.path());

        let response = self.client.get(url).send().await.map_err(|e| {
            let message = redact_middleware_error(e);
            warn!("Network error calling {}: {}", endpoint, message);
            TrafficLensError::upstream(endpoint.name(), None, message)
        })?;

        let status = response.status();
        debug!(
            "HTTP response received: {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            warn!("{} returned {}: {}", endpoint, status, message);
            return Err(TrafficLensError::upstream(
                endpoint.name(),
                Some(status.as_u16()),
                message,
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!("Unreadable {} response: {}", endpoint, e);
            TrafficLensError::upstream(
                endpoint.name(),
                Some(status.as_u16()),
                format!("Invalid JSON in response: {e}"),
            )
        })?;

        let total_duration = start_time.elapsed();
        info!(
            "{} answered in {:.3}s",
            endpoint,
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!(
                "Slow Azure Maps response from {}: {:.3}s",
                endpoint,
                total_duration.as_secs_f64()
            );
        }

        Ok(body)
    }
}

/// Describe a failed send without the request URL, which carries the key.
///
/// The retry middleware wraps every transport failure in a `RetryError`, so
/// the reqwest error has to be dug out before its URL can be dropped.
fn redact_middleware_error(err: reqwest_middleware::Error) -> String {
    match err {
        reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
        reqwest_middleware::Error::Middleware(e) => match e.downcast::<RetryError>() {
            Ok(RetryError::WithRetries { retries, err }) => {
                format!("{} (after {retries} retries)", redact_middleware_error(err))
            }
            Ok(RetryError::Error(err)) => redact_middleware_error(err),
            Err(other) => redact_chain(&other),
        },
    }
}

/// Fallback for unknown middleware errors: swap any reqwest URL in the
/// message for its bare path.
fn redact_chain(err: &anyhow::Error) -> String {
    let mut message = format!("{err:#}");
    for url in err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .filter_map(reqwest::Error::url)
    {
        message = message.replace(url.as_str(), url.path());
    }
    message
}

/// Pull a readable message out of an Azure Maps error body.
///
/// Azure answers `{"error": {"code": ..., "message": ...}}`; anything else
/// falls back to the (truncated) raw text.
fn upstream_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }

    Some(trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}
