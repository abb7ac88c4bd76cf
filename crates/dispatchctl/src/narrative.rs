//! User-facing narrative text for each dispatch stage.

use dispatch_shared::{DispatchError, Facility, Leg, RoutePath, Zone};

pub const INCIDENT_POPUP: &str = "Hey! Need help over here";

pub fn ambulance_label(id: &str) -> String {
    format!("Ambulance ID: {}", id)
}

pub fn selecting_incident() -> String {
    "Looking for an emergency to respond to...".to_string()
}

pub fn zone_unclassified() -> String {
    "Could not classify the surrounding zone. Continuing without it.".to_string()
}

pub fn responder_found(zone: &Zone, radius_km: Option<f64>) -> String {
    match radius_km {
        Some(r) => format!(
            "Zone type: {}. Found an ambulance within {} km radius. Calculating the shortest distance...",
            zone, r
        ),
        None => format!(
            "Zone type: {}. Found an available ambulance. Calculating the shortest distance...",
            zone
        ),
    }
}

pub fn responder_unavailable() -> String {
    "We're sorry, every ambulance nearby is currently unavailable. Help is on the way!".to_string()
}

pub fn en_route(leg: Leg, route: &RoutePath, facility: Option<&Facility>) -> String {
    match (leg, facility) {
        (Leg::Facility, Some(f)) => format!(
            "Great news! An ambulance is on its way towards {}. It is approximately {} meters away.",
            f.name,
            route.display_distance()
        ),
        _ => format!(
            "Great news! An ambulance is on its way to help you. It is approximately {} meters away.",
            route.display_distance()
        ),
    }
}

pub fn arrived_at_incident() -> String {
    "Ambulance has reached the location. Preparing it to move towards the hospital.".to_string()
}

pub fn facility_found(facility: &Facility) -> String {
    format!(
        "Great news! Found the nearest hospital, {}. Let's move there. Calculating the shortest distance...",
        facility.name
    )
}

pub fn no_facility() -> String {
    "Ambulance has reached the location, but no hospital was found nearby.".to_string()
}

pub fn arrived_at_facility(facility: &Facility) -> String {
    format!("Ambulance has reached the hospital, {}.", facility.name)
}

/// Message for a fatal stage error.
pub fn failure(err: &DispatchError) -> String {
    match err {
        DispatchError::Network(_) => {
            "Oops! Something went wrong. Please try again later.".to_string()
        }
        DispatchError::RoutingUnavailable(_) => {
            "Unable to calculate a route right now. Please try again later.".to_string()
        }
        DispatchError::ServiceRejection { .. } | DispatchError::ParseFailure(_) => {
            "The dispatch service gave an unusable answer. Please try again later.".to_string()
        }
        DispatchError::EmptyCandidateSet => "There are no reported emergencies right now.".to_string(),
        DispatchError::Cancelled => "Dispatch cancelled.".to_string(),
        DispatchError::AnimationInProgress | DispatchError::InvalidTransition { .. } => {
            "Oh no! Something went wrong while running the dispatch.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_shared::Coord;

    #[test]
    fn test_responder_radius_is_optional() {
        let zone = Zone::new("moderate");
        assert!(responder_found(&zone, Some(2.0)).contains("within 2 km radius"));
        let msg = responder_found(&zone, None);
        assert!(msg.starts_with("Zone type: moderate."));
        assert!(!msg.contains("radius"));
    }

    #[test]
    fn test_distance_is_rounded_in_message() {
        let route = RoutePath::new(vec![Coord::new(0.0, 0.0)], 1500.0).unwrap();
        let msg = en_route(Leg::Incident, &route, None);
        assert!(msg.contains("1500 meters"), "{}", msg);

        let route = RoutePath::new(vec![Coord::new(0.0, 0.0)], 812.3456).unwrap();
        assert!(en_route(Leg::Incident, &route, None).contains("812.35"));
    }

    #[test]
    fn test_facility_leg_names_the_hospital() {
        let route = RoutePath::new(vec![Coord::new(0.0, 0.0)], 900.0).unwrap();
        let f = Facility {
            name: "CityCare".into(),
            position: Coord::new(0.0, 0.0),
            attributes: Default::default(),
        };
        assert!(en_route(Leg::Facility, &route, Some(&f)).contains("towards CityCare"));
        assert!(arrived_at_facility(&f).contains("reached the hospital, CityCare"));
    }

    #[test]
    fn test_failure_messages_differ_by_kind() {
        let net = failure(&DispatchError::Network("refused".into()));
        let route = failure(&DispatchError::RoutingUnavailable("503".into()));
        assert_ne!(net, route);
        assert!(responder_unavailable().contains("unavailable"));
    }
}
