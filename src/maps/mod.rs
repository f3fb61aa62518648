//! Azure Maps access
//!
//! [`MapsTransport`] is the seam between the fetchers, which know which
//! parameters each endpoint needs, and the wire. [`azure::AzureMapsClient`]
//! is the production implementation.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

pub mod azure;

pub use azure::AzureMapsClient;

/// Query parameters of one upstream call, in the order they are sent
pub type QueryParams = Vec<(&'static str, String)>;

/// Azure Maps REST endpoints used by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SearchAddress,
    TrafficFlowSegment,
    TrafficIncidentViewport,
    TrafficIncidentDetail,
    RouteDirections,
}

impl Endpoint {
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::SearchAddress => "/search/address/json",
            Endpoint::TrafficFlowSegment => "/traffic/flow/segment/json",
            Endpoint::TrafficIncidentViewport => "/traffic/incident/viewport/json",
            Endpoint::TrafficIncidentDetail => "/traffic/incident/detail/json",
            Endpoint::RouteDirections => "/route/directions/json",
        }
    }

    /// Human-readable name used in logs and error bodies
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::SearchAddress => "address search",
            Endpoint::TrafficFlowSegment => "traffic flow",
            Endpoint::TrafficIncidentViewport => "incident viewport",
            Endpoint::TrafficIncidentDetail => "incident detail",
            Endpoint::RouteDirections => "route directions",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Azure Maps subscription key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubscriptionKey(***)")
    }
}

/// Issues a GET against an Azure Maps endpoint and returns the parsed JSON body.
///
/// Implementations add `api-version`; callers pass every other parameter,
/// `subscription-key` included. Non-2xx statuses, transport failures and
/// unparseable bodies are all reported as [`crate::TrafficLensError::Upstream`].
#[async_trait]
pub trait MapsTransport: Send + Sync {
    async fn get_json(&self, endpoint: Endpoint, params: QueryParams) -> Result<Value>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::SearchAddress.path(), "/search/address/json");
        assert_eq!(Endpoint::TrafficFlowSegment.path(), "/traffic/flow/segment/json");
        assert_eq!(
            Endpoint::TrafficIncidentViewport.path(),
            "/traffic/incident/viewport/json"
        );
        assert_eq!(
            Endpoint::TrafficIncidentDetail.path(),
            "/traffic/incident/detail/json"
        );
        assert_eq!(Endpoint::RouteDirections.path(), "/route/directions/json");
    }

    #[test]
    fn test_subscription_key_is_redacted() {
        let key = SubscriptionKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "SubscriptionKey(***)");
        assert_eq!(key.expose(), "super-secret");
    }
}
