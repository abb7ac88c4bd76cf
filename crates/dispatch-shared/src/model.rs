//! Dispatch data model.
//!
//! All records are normalized at the wire boundary; nothing in here knows
//! about the historical positional shapes the service used to return.

use crate::error::DispatchError;
use crate::geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extra record fields we carry but never interpret.
pub type Attributes = Map<String, Value>;

/// A reported emergency event. Immutable once selected for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub position: Coord,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Incident {
    pub fn new(position: Coord) -> Self {
        Self {
            position,
            attributes: Attributes::new(),
        }
    }
}

/// Label used when zone classification could not be obtained.
pub const UNCLASSIFIED_ZONE: &str = "unclassified";

/// Categorical context label for an incident's surroundings.
///
/// Presentation only; no dispatch decision reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub label: String,
}

impl Zone {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn unclassified() -> Self {
        Self::new(UNCLASSIFIED_ZONE)
    }

    pub fn is_classified(&self) -> bool {
        self.label != UNCLASSIFIED_ZONE
    }

    /// Circle colour for this zone.
    ///
    /// Risk tiers map to fixed colours. A label that already names a colour
    /// is used as-is, since older services returned colours directly.
    pub fn color<'a>(&'a self, default_color: &'a str) -> &'a str {
        match self.label.to_lowercase().as_str() {
            "high" | "critical" | "severe" => "red",
            "moderate" | "medium" => "orange",
            "low" | "safe" => "green",
            "red" | "orange" | "yellow" | "green" | "blue" | "purple" => &self.label,
            _ => default_color,
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// The dispatchable unit (an ambulance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responder {
    pub id: String,
    pub position: Coord,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Destination for the post-pickup leg (a hospital).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub position: Coord,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Result of a nearest-responder search.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponderLookup {
    /// `radius_km` is absent when the service answered with the bare
    /// record and no search radius.
    Found {
        responder: Responder,
        radius_km: Option<f64>,
    },
    /// No responder in range. The radius is still reported when the
    /// service sent one.
    NotFound { radius_km: Option<f64> },
}

impl ResponderLookup {
    pub fn radius_km(&self) -> Option<f64> {
        match self {
            Self::Found { radius_km, .. } | Self::NotFound { radius_km } => *radius_km,
        }
    }
}

/// Result of a nearest-facility search.
#[derive(Debug, Clone, PartialEq)]
pub enum FacilityLookup {
    Found(Facility),
    NotFound,
}

/// Ordered waypoint sequence plus total distance between two points.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePath {
    waypoints: Vec<Coord>,
    distance_m: f64,
}

impl RoutePath {
    pub fn new(waypoints: Vec<Coord>, distance_m: f64) -> Result<Self, DispatchError> {
        if waypoints.is_empty() {
            return Err(DispatchError::RoutingUnavailable(
                "route has no waypoints".to_string(),
            ));
        }
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(DispatchError::ParseFailure(format!(
                "route distance is not a non-negative number: {}",
                distance_m
            )));
        }
        Ok(Self {
            waypoints,
            distance_m,
        })
    }

    pub fn waypoints(&self) -> &[Coord] {
        &self.waypoints
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn start(&self) -> Coord {
        self.waypoints[0]
    }

    pub fn end(&self) -> Coord {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Check both ends against the requested endpoints.
    pub fn matches_endpoints(&self, start: Coord, end: Coord, tolerance_m: f64) -> bool {
        self.start().distance_m(start) <= tolerance_m && self.end().distance_m(end) <= tolerance_m
    }

    /// Distance rounded to two decimals for display.
    pub fn display_distance(&self) -> f64 {
        (self.distance_m * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(points: &[[f64; 2]], distance: f64) -> RoutePath {
        RoutePath::new(points.iter().copied().map(Coord::from).collect(), distance).unwrap()
    }

    #[test]
    fn test_empty_route_is_routing_unavailable() {
        let err = RoutePath::new(Vec::new(), 10.0).unwrap_err();
        assert!(matches!(err, DispatchError::RoutingUnavailable(_)));
    }

    #[test]
    fn test_negative_distance_is_parse_failure() {
        let err = RoutePath::new(vec![Coord::new(0.0, 0.0)], -1.0).unwrap_err();
        assert!(matches!(err, DispatchError::ParseFailure(_)));
    }

    #[test]
    fn test_single_waypoint_route() {
        let p = path(&[[27.70, 85.30]], 0.0);
        assert_eq!(p.len(), 1);
        assert_eq!(p.start(), p.end());
    }

    #[test]
    fn test_endpoint_tolerance() {
        let p = path(&[[27.71, 85.31], [27.705, 85.305], [27.70, 85.30]], 1500.0);
        assert!(p.matches_endpoints(Coord::new(27.71, 85.31), Coord::new(27.70, 85.30), 50.0));
        assert!(!p.matches_endpoints(Coord::new(27.80, 85.31), Coord::new(27.70, 85.30), 50.0));
    }

    #[test]
    fn test_display_distance_rounding() {
        assert_eq!(path(&[[0.0, 0.0]], 1500.0).display_distance().to_string(), "1500");
        assert_eq!(path(&[[0.0, 0.0]], 1234.5678).display_distance(), 1234.57);
    }

    #[test]
    fn test_zone_colors() {
        assert_eq!(Zone::new("moderate").color("red"), "orange");
        assert_eq!(Zone::new("HIGH").color("red"), "red");
        assert_eq!(Zone::new("blue").color("red"), "blue");
        assert_eq!(Zone::unclassified().color("grey"), "grey");
        assert!(!Zone::unclassified().is_classified());
    }

    #[test]
    fn test_responder_lookup_radius() {
        assert_eq!(ResponderLookup::NotFound { radius_km: None }.radius_km(), None);
        assert_eq!(
            ResponderLookup::NotFound {
                radius_km: Some(3.0)
            }
            .radius_km(),
            Some(3.0)
        );
    }
}
