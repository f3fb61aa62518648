//! Response composition
//!
//! Drops geometry payloads the summary has no use for and merges the three
//! upstream documents. Every step skips silently when the path is absent or
//! has an unexpected type.

use serde_json::Value;
use tracing::debug;

use crate::models::CombinedResponse;

/// Remove `flowSegmentData.coordinates`. Returns whether anything was removed.
pub fn strip_flow_geometry(flow: &mut Value) -> bool {
    flow.get_mut("flowSegmentData")
        .and_then(Value::as_object_mut)
        .and_then(|segment| segment.remove("coordinates"))
        .is_some()
}

/// Remove `points` from every leg of every route. Returns how many were removed.
pub fn strip_route_geometry(route: &mut Value) -> usize {
    let Some(routes) = route.get_mut("routes").and_then(Value::as_array_mut) else {
        return 0;
    };

    routes
        .iter_mut()
        .filter_map(|route| route.get_mut("legs").and_then(Value::as_array_mut))
        .flatten()
        .filter_map(Value::as_object_mut)
        .map(|leg| leg.remove("points").is_some())
        .filter(|removed| *removed)
        .count()
}

/// Strip geometry and merge into the combined document
#[must_use]
pub fn compose(
    mut traffic_flow: Value,
    traffic_incidents: Value,
    mut route_details: Value,
) -> CombinedResponse {
    let flow_stripped = strip_flow_geometry(&mut traffic_flow);
    let legs_stripped = strip_route_geometry(&mut route_details);
    debug!(flow_stripped, legs_stripped, "Composed traffic summary");

    CombinedResponse {
        traffic_flow,
        traffic_incidents,
        route_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow() -> Value {
        json!({
            "flowSegmentData": {
                "frc": "FRC0",
                "currentSpeed": 52,
                "freeFlowSpeed": 80,
                "coordinates": {"coordinate": [{"latitude": 47.6, "longitude": -122.3}]}
            }
        })
    }

    fn route() -> Value {
        json!({
            "routes": [
                {
                    "summary": {"lengthInMeters": 1000},
                    "legs": [
                        {"summary": {}, "points": [{"latitude": 1.0, "longitude": 2.0}]},
                        {"summary": {}}
                    ]
                },
                {"summary": {"lengthInMeters": 2000}, "legs": [{"points": []}]}
            ]
        })
    }

    #[test]
    fn test_strip_flow_geometry() {
        let mut doc = flow();
        assert!(strip_flow_geometry(&mut doc));
        assert!(doc["flowSegmentData"].get("coordinates").is_none());
        assert_eq!(doc["flowSegmentData"]["currentSpeed"], 52);
    }

    #[test]
    fn test_strip_route_geometry_counts_legs() {
        let mut doc = route();
        assert_eq!(strip_route_geometry(&mut doc), 2);
        for route in doc["routes"].as_array().unwrap() {
            for leg in route["legs"].as_array().unwrap() {
                assert!(leg.get("points").is_none());
            }
        }
        assert_eq!(doc["routes"][1]["summary"]["lengthInMeters"], 2000);
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let mut once_flow = flow();
        strip_flow_geometry(&mut once_flow);
        let mut twice_flow = once_flow.clone();
        assert!(!strip_flow_geometry(&mut twice_flow));
        assert_eq!(once_flow, twice_flow);

        let mut once_route = route();
        strip_route_geometry(&mut once_route);
        let mut twice_route = once_route.clone();
        assert_eq!(strip_route_geometry(&mut twice_route), 0);
        assert_eq!(once_route, twice_route);
    }

    #[test]
    fn test_documents_without_geometry_are_unchanged() {
        let original = json!({"flowSegmentData": {"currentSpeed": 10}});
        let mut doc = original.clone();
        strip_flow_geometry(&mut doc);
        assert_eq!(doc, original);

        let original = json!({"routes": [{"legs": [{"summary": {}}]}]});
        let mut doc = original.clone();
        strip_route_geometry(&mut doc);
        assert_eq!(doc, original);
    }

    #[test]
    fn test_unexpected_shapes_are_skipped() {
        let mut doc = json!({"error": {"code": "400"}});
        assert!(!strip_flow_geometry(&mut doc));
        assert_eq!(strip_route_geometry(&mut doc), 0);

        let mut doc = json!({"flowSegmentData": "n/a", "routes": {"legs": []}});
        assert!(!strip_flow_geometry(&mut doc));
        assert_eq!(strip_route_geometry(&mut doc), 0);

        let mut doc = json!({"routes": [{"legs": "none"}, 7, {"legs": [null, {"points": []}]}]});
        assert_eq!(strip_route_geometry(&mut doc), 1);

        let mut doc = Value::Null;
        assert!(!strip_flow_geometry(&mut doc));
    }

    #[test]
    fn test_compose_keeps_incidents_verbatim() {
        let incidents = json!({"tm": {"poi": [{"id": "a", "p": {"x": 1, "y": 2}}]}});
        let combined = compose(flow(), incidents.clone(), route());

        assert_eq!(combined.traffic_incidents, incidents);
        assert!(combined.traffic_flow["flowSegmentData"].get("coordinates").is_none());
        assert!(combined.route_details["routes"][0]["legs"][0].get("points").is_none());

        let serialized = serde_json::to_value(&combined).unwrap();
        assert!(serialized.get("traffic_flow").is_some());
        assert!(serialized.get("traffic_incidents").is_some());
        assert!(serialized.get("route_details").is_some());
    }
}
