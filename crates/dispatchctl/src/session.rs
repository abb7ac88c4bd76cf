//! Dispatch session state.
//!
//! One session per workflow run. It owns every overlay it draws; a new
//! marker or route always replaces the previous one instead of sitting
//! next to it.

use crate::animator::MovingMarker;
use crate::render::{MapRenderer, MarkerIcon, OverlayHandle};
use dispatch_shared::{
    Coord, DispatchResult, Facility, Incident, Responder, RoutePath, Stage, StageTracker, Zone,
};
use tracing::info;
use uuid::Uuid;

pub struct DispatchSession {
    id: Uuid,
    stages: StageTracker,
    incident: Option<Incident>,
    zone: Option<Zone>,
    responder: Option<Responder>,
    radius_km: Option<f64>,
    route: Option<RoutePath>,
    facility: Option<Facility>,

    incident_marker: Option<OverlayHandle>,
    responder_marker: Option<MovingMarker>,
    route_overlay: Option<OverlayHandle>,
    facility_marker: Option<OverlayHandle>,
}

impl Default for DispatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stages: StageTracker::new(),
            incident: None,
            zone: None,
            responder: None,
            radius_km: None,
            route: None,
            facility: None,
            incident_marker: None,
            responder_marker: None,
            route_overlay: None,
            facility_marker: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> &Stage {
        self.stages.current()
    }

    pub fn history(&self) -> &[Stage] {
        self.stages.history()
    }

    pub fn advance(&mut self, next: Stage) -> DispatchResult<()> {
        info!("Stage {} -> {}", self.stages.current(), next);
        self.stages.advance(next)
    }

    pub fn incident(&self) -> Option<&Incident> {
        self.incident.as_ref()
    }

    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    pub fn responder(&self) -> Option<&Responder> {
        self.responder.as_ref()
    }

    pub fn radius_km(&self) -> Option<f64> {
        self.radius_km
    }

    /// Route of the leg currently being driven, if any.
    pub fn route(&self) -> Option<&RoutePath> {
        self.route.as_ref()
    }

    pub fn facility(&self) -> Option<&Facility> {
        self.facility.as_ref()
    }

    pub fn set_incident(&mut self, incident: Incident) {
        self.incident = Some(incident);
    }

    pub fn set_zone(&mut self, zone: Zone) {
        self.zone = Some(zone);
    }

    pub fn set_responder(&mut self, responder: Responder, radius_km: Option<f64>) {
        self.responder = Some(responder);
        self.radius_km = radius_km;
    }

    pub fn set_radius(&mut self, radius_km: Option<f64>) {
        self.radius_km = radius_km;
    }

    pub fn set_facility(&mut self, facility: Facility) {
        self.facility = Some(facility);
    }

    // ------------------------------------------------------------------
    // Overlays
    // ------------------------------------------------------------------

    pub fn show_incident_marker(&mut self, renderer: &dyn MapRenderer, at: Coord, label: &str) {
        if let Some(old) = self.incident_marker.take() {
            renderer.remove_overlay(old);
        }
        self.incident_marker = Some(renderer.place_marker(at, MarkerIcon::Incident, label));
    }

    pub fn clear_incident_marker(&mut self, renderer: &dyn MapRenderer) {
        if let Some(old) = self.incident_marker.take() {
            renderer.remove_overlay(old);
        }
    }

    /// Draw the responder at `at`, discarding any previous responder marker.
    pub fn show_responder_marker(&mut self, renderer: &dyn MapRenderer, at: Coord, label: &str) {
        if let Some(old) = self.responder_marker.take() {
            renderer.remove_overlay(old.handle());
        }
        let handle = renderer.place_marker(at, MarkerIcon::Ambulance, label);
        self.responder_marker = Some(MovingMarker::new(handle, at));
    }

    pub fn responder_marker(&self) -> Option<&MovingMarker> {
        self.responder_marker.as_ref()
    }

    pub fn show_facility_marker(&mut self, renderer: &dyn MapRenderer, at: Coord, label: &str) {
        if let Some(old) = self.facility_marker.take() {
            renderer.remove_overlay(old);
        }
        self.facility_marker = Some(renderer.place_marker(at, MarkerIcon::Hospital, label));
    }

    /// Draw `route` as the active route, discarding the previous one.
    pub fn show_route(&mut self, renderer: &dyn MapRenderer, route: RoutePath) {
        if let Some(old) = self.route_overlay.take() {
            renderer.remove_overlay(old);
        }
        self.route_overlay = Some(renderer.place_polyline(route.waypoints()));
        self.route = Some(route);
    }

    /// Hand the route overlay to whoever will discard it.
    pub fn take_route_overlay(&mut self) -> Option<OverlayHandle> {
        self.route_overlay.take()
    }

    pub fn route_overlay(&self) -> Option<OverlayHandle> {
        self.route_overlay
    }

    /// Split borrow for animation: the marker to move and the route to follow.
    pub fn animation_parts(&mut self) -> Option<(&mut MovingMarker, &RoutePath)> {
        match (self.responder_marker.as_mut(), self.route.as_ref()) {
            (Some(marker), Some(route)) => Some((marker, route)),
            _ => None,
        }
    }

    /// Remove the route overlay if one is still drawn.
    pub fn release_transient(&mut self, renderer: &dyn MapRenderer) {
        if let Some(old) = self.route_overlay.take() {
            renderer.remove_overlay(old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, RecordingMap, Timeline};

    #[test]
    fn test_responder_marker_is_replaced_not_duplicated() {
        let timeline = Timeline::new();
        let map = RecordingMap::new(timeline.clone());
        let mut session = DispatchSession::new();

        session.show_responder_marker(&map, Coord::new(1.0, 1.0), "a");
        let first = session.responder_marker().unwrap().handle();
        session.show_responder_marker(&map, Coord::new(2.0, 2.0), "a");
        let second = session.responder_marker().unwrap().handle();

        assert_ne!(first, second);
        assert!(!map.is_live(first));
        assert!(map.is_live(second));
        let removed = timeline.position(|e| *e == Event::RemoveOverlay(first)).unwrap();
        let placed = timeline
            .position(|e| matches!(e, Event::PlaceMarker { handle, .. } if *handle == second))
            .unwrap();
        assert!(removed < placed);
    }

    #[test]
    fn test_route_is_replaced() {
        let map = RecordingMap::new(Timeline::new());
        let mut session = DispatchSession::new();
        let r = RoutePath::new(vec![Coord::new(0.0, 0.0)], 0.0).unwrap();

        session.show_route(&map, r.clone());
        let first = session.route_overlay().unwrap();
        session.show_route(&map, r);
        assert!(!map.is_live(first));
        assert_eq!(map.live_count(), 1);

        session.release_transient(&map);
        assert_eq!(map.live_count(), 0);
        assert!(session.route_overlay().is_none());
    }

    #[test]
    fn test_animation_parts_need_marker_and_route() {
        let map = RecordingMap::new(Timeline::new());
        let mut session = DispatchSession::new();
        assert!(session.animation_parts().is_none());
        session.show_responder_marker(&map, Coord::new(0.0, 0.0), "a");
        assert!(session.animation_parts().is_none());
        session.show_route(&map, RoutePath::new(vec![Coord::new(0.0, 0.0)], 0.0).unwrap());
        assert!(session.animation_parts().is_some());
    }
}
