//! Geographic coordinate and bounding box models

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved point in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Shift both axes by the same number of degrees
    #[must_use]
    pub fn offset(&self, degrees: f64) -> Self {
        Self::new(self.latitude + degrees, self.longitude + degrees)
    }

    /// `lat,lon` as expected by the flow and route query parameters
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Rectangle spanned by two corners, used to scope incident queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl BoundingBox {
    #[must_use]
    pub fn from_corners(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }
}

/// Renders as `lon1,lat1,lon2,lat2`
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.start.longitude, self.start.latitude, self.end.longitude, self.end.latitude
        )
    }
}
