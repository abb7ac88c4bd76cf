//! Deterministic fakes for the dispatch collaborators.
//!
//! `FakeDispatchApi`, `RecordingMap` and `RecordingReporter` all append to
//! one shared `Timeline`, so tests can assert ordering across components
//! without any network or terminal.

use crate::api::DispatchApi;
use crate::render::{MapRenderer, MarkerIcon, OverlayHandle};
use crate::status::StatusReporter;
use async_trait::async_trait;
use dispatch_shared::{
    Coord, DispatchError, DispatchResult, Facility, FacilityLookup, Incident, Responder,
    ResponderLookup, RoutePath, Zone,
};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

// ============================================================================
// Timeline
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FetchIncidents,
    ClassifyZone(Coord),
    NearestResponder(Coord),
    ShortestPath { start: Coord, end: Coord },
    NearestFacility(Coord),
    SetView { center: Coord, zoom: u8 },
    PlaceMarker {
        handle: OverlayHandle,
        at: Coord,
        icon: MarkerIcon,
        label: String,
    },
    MoveMarker { handle: OverlayHandle, to: Coord },
    RemoveOverlay(OverlayHandle),
    PlaceCircle {
        center: Coord,
        radius_m: f64,
        color: String,
    },
    PlacePolyline { handle: OverlayHandle, points: usize },
    Narrative(String),
    Busy(bool),
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }

    pub fn narratives(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Narrative(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Number of calls to any of the five service endpoints.
    pub fn api_calls(&self) -> usize {
        self.count(|e| {
            matches!(
                e,
                Event::FetchIncidents
                    | Event::ClassifyZone(_)
                    | Event::NearestResponder(_)
                    | Event::ShortestPath { .. }
                    | Event::NearestFacility(_)
            )
        })
    }
}

// ============================================================================
// Fake dispatch service
// ============================================================================

/// Scripted answer for one `shortest_path` call.
#[derive(Debug, Clone)]
pub enum FakeRoute {
    /// Straight line from the requested start to end
    Straight { waypoints: usize, distance_m: f64 },
    /// Fixed `[lat, lon]` points, ignoring the request
    Points(Vec<[f64; 2]>, f64),
    Fail(DispatchError),
}

impl FakeRoute {
    fn resolve(&self, start: Coord, end: Coord) -> DispatchResult<RoutePath> {
        match self {
            FakeRoute::Straight {
                waypoints,
                distance_m,
            } => {
                let n = *waypoints;
                let points = (0..n)
                    .map(|i| {
                        let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 1.0 };
                        Coord::new(
                            start.latitude + (end.latitude - start.latitude) * t,
                            start.longitude + (end.longitude - start.longitude) * t,
                        )
                    })
                    .collect();
                RoutePath::new(points, *distance_m)
            }
            FakeRoute::Points(points, distance_m) => RoutePath::new(
                points.iter().copied().map(Coord::from).collect(),
                *distance_m,
            ),
            FakeRoute::Fail(e) => Err(e.clone()),
        }
    }
}

pub struct FakeDispatchApi {
    incidents: DispatchResult<Vec<Incident>>,
    zone: DispatchResult<Zone>,
    responder: DispatchResult<ResponderLookup>,
    routes: Mutex<VecDeque<FakeRoute>>,
    facility: DispatchResult<FacilityLookup>,
    timeline: Timeline,
}

impl FakeDispatchApi {
    pub fn builder() -> FakeDispatchApiBuilder {
        FakeDispatchApiBuilder::default()
    }

    fn next_route(&self) -> FakeRoute {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        // the last scripted route repeats
        if routes.len() > 1 {
            routes.pop_front().unwrap_or(FakeRoute::Straight {
                waypoints: 2,
                distance_m: 0.0,
            })
        } else {
            routes.front().cloned().unwrap_or(FakeRoute::Straight {
                waypoints: 2,
                distance_m: 0.0,
            })
        }
    }
}

pub fn sample_incident() -> Incident {
    Incident::new(Coord::new(27.70, 85.30))
}

pub fn sample_responder() -> Responder {
    Responder {
        id: "5".to_string(),
        position: Coord::new(27.71, 85.31),
        attributes: Default::default(),
    }
}

pub fn sample_facility() -> Facility {
    Facility {
        name: "CityCare".to_string(),
        position: Coord::new(27.69, 85.29),
        attributes: Default::default(),
    }
}

pub struct FakeDispatchApiBuilder {
    incidents: DispatchResult<Vec<Incident>>,
    zone: DispatchResult<Zone>,
    responder: DispatchResult<ResponderLookup>,
    routes: VecDeque<FakeRoute>,
    facility: DispatchResult<FacilityLookup>,
    timeline: Timeline,
}

impl Default for FakeDispatchApiBuilder {
    fn default() -> Self {
        Self {
            incidents: Ok(vec![sample_incident()]),
            zone: Ok(Zone::new("moderate")),
            responder: Ok(ResponderLookup::Found {
                responder: sample_responder(),
                radius_km: Some(2.0),
            }),
            routes: VecDeque::new(),
            facility: Ok(FacilityLookup::Found(sample_facility())),
            timeline: Timeline::new(),
        }
    }
}

impl FakeDispatchApiBuilder {
    pub fn incidents(mut self, incidents: DispatchResult<Vec<Incident>>) -> Self {
        self.incidents = incidents;
        self
    }

    pub fn zone(mut self, zone: DispatchResult<Zone>) -> Self {
        self.zone = zone;
        self
    }

    pub fn responder(mut self, responder: DispatchResult<ResponderLookup>) -> Self {
        self.responder = responder;
        self
    }

    /// Queue a route answer. Calls consume them in order.
    pub fn route(mut self, route: FakeRoute) -> Self {
        self.routes.push_back(route);
        self
    }

    pub fn facility(mut self, facility: DispatchResult<FacilityLookup>) -> Self {
        self.facility = facility;
        self
    }

    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn build(mut self) -> FakeDispatchApi {
        if self.routes.is_empty() {
            self.routes.push_back(FakeRoute::Straight {
                waypoints: 4,
                distance_m: 1500.0,
            });
        }
        FakeDispatchApi {
            incidents: self.incidents,
            zone: self.zone,
            responder: self.responder,
            routes: Mutex::new(self.routes),
            facility: self.facility,
            timeline: self.timeline,
        }
    }
}

#[async_trait]
impl DispatchApi for FakeDispatchApi {
    async fn fetch_incidents(&self) -> DispatchResult<Vec<Incident>> {
        self.timeline.push(Event::FetchIncidents);
        self.incidents.clone()
    }

    async fn classify_zone(&self, incident: Coord) -> DispatchResult<Zone> {
        self.timeline.push(Event::ClassifyZone(incident));
        self.zone.clone()
    }

    async fn nearest_responder(&self, incident: Coord) -> DispatchResult<ResponderLookup> {
        self.timeline.push(Event::NearestResponder(incident));
        self.responder.clone()
    }

    async fn shortest_path(&self, start: Coord, end: Coord) -> DispatchResult<RoutePath> {
        self.timeline.push(Event::ShortestPath { start, end });
        self.next_route().resolve(start, end)
    }

    async fn nearest_facility(&self, incident: Coord) -> DispatchResult<FacilityLookup> {
        self.timeline.push(Event::NearestFacility(incident));
        self.facility.clone()
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Default)]
struct MapLedger {
    next_id: u64,
    live: HashSet<OverlayHandle>,
}

pub struct RecordingMap {
    ledger: Mutex<MapLedger>,
    timeline: Timeline,
}

impl RecordingMap {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            ledger: Mutex::new(MapLedger::default()),
            timeline,
        }
    }

    fn allocate(&self) -> OverlayHandle {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.next_id += 1;
        let handle = OverlayHandle(ledger.next_id);
        ledger.live.insert(handle);
        handle
    }

    pub fn is_live(&self, handle: OverlayHandle) -> bool {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .contains(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .len()
    }
}

impl MapRenderer for RecordingMap {
    fn set_view(&self, center: Coord, zoom: u8) {
        self.timeline.push(Event::SetView { center, zoom });
    }

    fn place_marker(&self, at: Coord, icon: MarkerIcon, label: &str) -> OverlayHandle {
        let handle = self.allocate();
        self.timeline.push(Event::PlaceMarker {
            handle,
            at,
            icon,
            label: label.to_string(),
        });
        handle
    }

    fn move_marker(&self, handle: OverlayHandle, to: Coord) {
        self.timeline.push(Event::MoveMarker { handle, to });
    }

    fn remove_overlay(&self, handle: OverlayHandle) {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .live
            .remove(&handle);
        self.timeline.push(Event::RemoveOverlay(handle));
    }

    fn place_circle(&self, center: Coord, radius_m: f64, color: &str) {
        self.timeline.push(Event::PlaceCircle {
            center,
            radius_m,
            color: color.to_string(),
        });
    }

    fn place_polyline(&self, points: &[Coord]) -> OverlayHandle {
        let handle = self.allocate();
        self.timeline.push(Event::PlacePolyline {
            handle,
            points: points.len(),
        });
        handle
    }
}

pub struct RecordingReporter {
    timeline: Timeline,
}

impl RecordingReporter {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline }
    }
}

impl StatusReporter for RecordingReporter {
    fn set_narrative(&self, text: &str) {
        self.timeline.push(Event::Narrative(text.to_string()));
    }

    fn set_busy(&self, busy: bool) {
        self.timeline.push(Event::Busy(busy));
    }
}
