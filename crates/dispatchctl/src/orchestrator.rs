//! Dispatch orchestrator.
//!
//! Flow:
//! 1. Fetch incidents and pick one
//! 2. Classify the zone (non-fatal)
//! 3. Find the nearest ambulance (NotFound ends the session)
//! 4. Route + animate ambulance -> incident
//! 5. Find the nearest hospital (NotFound ends the session)
//! 6. Route + animate incident -> hospital
//!
//! Each stage handles its own failure by narrating it and moving the
//! session to Failed. `run` never returns an error.

use crate::animator::MovementAnimator;
use crate::api::DispatchApi;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::lookup;
use crate::narrative;
use crate::planner;
use crate::render::MapRenderer;
use crate::selector;
use crate::session::DispatchSession;
use crate::status::StatusReporter;
use dispatch_shared::{
    Completion, Coord, DispatchError, FacilityLookup, FailurePoint, Leg, ResponderLookup,
    SearchOutcome, Stage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

type StageResult<T> = Result<T, (FailurePoint, DispatchError)>;

trait At<T> {
    fn at(self, point: FailurePoint) -> StageResult<T>;
}

impl<T> At<T> for Result<T, DispatchError> {
    fn at(self, point: FailurePoint) -> StageResult<T> {
        self.map_err(|e| (point, e))
    }
}

/// Presentation and validation knobs the workflow reads.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub zoom: u8,
    pub default_zone_color: String,
    pub endpoint_tolerance_m: f64,
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            zoom: config.map.zoom,
            default_zone_color: config.map.default_zone_color.clone(),
            endpoint_tolerance_m: config.routing.endpoint_tolerance_m,
        }
    }
}

pub struct Dispatcher {
    api: Arc<dyn DispatchApi>,
    renderer: Arc<dyn MapRenderer>,
    reporter: Arc<dyn StatusReporter>,
    animator: MovementAnimator,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn DispatchApi>,
        renderer: Arc<dyn MapRenderer>,
        reporter: Arc<dyn StatusReporter>,
        config: &Config,
    ) -> Self {
        Self {
            api,
            renderer,
            reporter,
            animator: MovementAnimator::new(config.tick_delay()),
            settings: DispatchSettings::from(config),
        }
    }

    /// Run one dispatch session to a terminal stage.
    pub async fn run(&self, cancel: CancelToken) -> DispatchSession {
        let mut rng = StdRng::from_entropy();
        self.run_with_rng(&mut rng, cancel).await
    }

    pub async fn run_with_rng<R: Rng + Send>(
        &self,
        rng: &mut R,
        cancel: CancelToken,
    ) -> DispatchSession {
        let mut session = DispatchSession::new();
        let span = info_span!("dispatch", session = %session.id());

        async {
            let outcome = self.drive(&mut session, rng, &cancel).await;
            let outcome = match outcome {
                Ok(completion) => session
                    .advance(Stage::Done(completion))
                    .map(|_| completion)
                    .at(FailurePoint::Session),
                Err(failure) => Err(failure),
            };

            match outcome {
                Ok(completion) => {
                    self.reporter.set_busy(false);
                    info!("Dispatch finished: {:?}", completion);
                }
                Err((at, cause)) => self.fail(&mut session, at, cause),
            }
        }
        .instrument(span)
        .await;

        session
    }

    fn fail(&self, session: &mut DispatchSession, at: FailurePoint, cause: DispatchError) {
        error!("Dispatch failed at {} ({}): {}", at, cause.kind(), cause);
        session.release_transient(self.renderer.as_ref());
        self.reporter.set_busy(false);
        self.reporter.set_narrative(&narrative::failure(&cause));
        if let Err(e) = session.advance(Stage::Failed { at, cause }) {
            warn!("Session already terminal: {}", e);
        }
    }

    fn narrate(&self, text: &str, busy: bool) {
        self.reporter.set_busy(busy);
        self.reporter.set_narrative(text);
    }

    fn checkpoint(cancel: &CancelToken, point: FailurePoint) -> StageResult<()> {
        if cancel.is_cancelled() {
            return Err((point, DispatchError::Cancelled));
        }
        Ok(())
    }

    async fn drive<R: Rng + Send>(
        &self,
        session: &mut DispatchSession,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> StageResult<Completion> {
        let renderer = self.renderer.as_ref();
        let api = self.api.as_ref();

        // Incident
        self.narrate(&narrative::selecting_incident(), true);
        let candidates = api
            .fetch_incidents()
            .await
            .at(FailurePoint::IncidentSelection)?;
        let incident =
            selector::select_incident(&candidates, rng).at(FailurePoint::IncidentSelection)?;
        let incident_at = incident.position;
        info!("Selected incident at {} of {} candidates", incident_at, candidates.len());
        session.set_incident(incident);
        session
            .advance(Stage::IncidentSelected)
            .at(FailurePoint::Session)?;

        renderer.set_view(incident_at, self.settings.zoom);
        session.show_incident_marker(renderer, incident_at, narrative::INCIDENT_POPUP);

        // Zone
        let (zone, classified) = lookup::classify_zone(api, incident_at).await;
        if !classified {
            self.narrate(&narrative::zone_unclassified(), true);
        }
        session.set_zone(zone.clone());
        session
            .advance(Stage::ZoneClassified)
            .at(FailurePoint::Session)?;

        // Responder
        Self::checkpoint(cancel, FailurePoint::ResponderSearch)?;
        let search = lookup::locate_responder(api, incident_at)
            .await
            .at(FailurePoint::ResponderSearch)?;
        if let Some(radius_km) = search.radius_km() {
            renderer.place_circle(
                incident_at,
                radius_km * 1000.0,
                zone.color(&self.settings.default_zone_color),
            );
        }

        let (responder, radius_km) = match search {
            ResponderLookup::NotFound { radius_km } => {
                session.set_radius(radius_km);
                session
                    .advance(Stage::ResponderSearch(SearchOutcome::NotFound))
                    .at(FailurePoint::Session)?;
                self.narrate(&narrative::responder_unavailable(), false);
                return Ok(Completion::NoResponder);
            }
            ResponderLookup::Found {
                responder,
                radius_km,
            } => (responder, radius_km),
        };

        let responder_at = responder.position;
        let label = narrative::ambulance_label(&responder.id);
        session.set_responder(responder, radius_km);
        session
            .advance(Stage::ResponderSearch(SearchOutcome::Found))
            .at(FailurePoint::Session)?;
        session.show_responder_marker(renderer, responder_at, &label);
        self.narrate(&narrative::responder_found(&zone, radius_km), true);

        // Leg 1: ambulance -> incident
        self.drive_leg(session, Leg::Incident, incident_at, cancel)
            .await?;
        session
            .advance(Stage::ArrivedAtIncident)
            .at(FailurePoint::Session)?;
        self.narrate(&narrative::arrived_at_incident(), false);

        // Picked up: the incident marker goes, the ambulance is redrawn where it stopped.
        let pickup_at = session
            .responder_marker()
            .map(|m| m.position())
            .unwrap_or(incident_at);
        session.clear_incident_marker(renderer);
        session.show_responder_marker(renderer, pickup_at, &label);

        // Facility
        Self::checkpoint(cancel, FailurePoint::FacilitySearch)?;
        let facility = match lookup::find_facility(api, incident_at)
            .await
            .at(FailurePoint::FacilitySearch)?
        {
            FacilityLookup::NotFound => {
                session
                    .advance(Stage::FacilitySearch(SearchOutcome::NotFound))
                    .at(FailurePoint::Session)?;
                self.narrate(&narrative::no_facility(), false);
                return Ok(Completion::NoFacility);
            }
            FacilityLookup::Found(facility) => facility,
        };

        let facility_at = facility.position;
        session.show_facility_marker(renderer, facility_at, &facility.name);
        self.narrate(&narrative::facility_found(&facility), true);
        session.set_facility(facility);
        session
            .advance(Stage::FacilitySearch(SearchOutcome::Found))
            .at(FailurePoint::Session)?;

        // Leg 2: incident -> hospital
        self.drive_leg(session, Leg::Facility, facility_at, cancel)
            .await?;
        session
            .advance(Stage::ArrivedAtFacility)
            .at(FailurePoint::Session)?;
        if let Some(facility) = session.facility() {
            self.narrate(&narrative::arrived_at_facility(facility), false);
        }

        Ok(Completion::ReachedFacility)
    }

    /// Route from the ambulance's current position to `end`, then animate.
    async fn drive_leg(
        &self,
        session: &mut DispatchSession,
        leg: Leg,
        end: Coord,
        cancel: &CancelToken,
    ) -> StageResult<()> {
        let renderer = self.renderer.as_ref();
        Self::checkpoint(cancel, FailurePoint::Routing(leg))?;

        let start = session
            .responder_marker()
            .map(|m| m.position())
            .ok_or_else(|| {
                (
                    FailurePoint::Routing(leg),
                    DispatchError::InvalidTransition {
                        from: session.stage().to_string(),
                        to: Stage::RouteComputed(leg).to_string(),
                    },
                )
            })?;

        let route = planner::plan_route(
            self.api.as_ref(),
            start,
            end,
            self.settings.endpoint_tolerance_m,
        )
        .await
        .at(FailurePoint::Routing(leg))?;

        session
            .advance(Stage::RouteComputed(leg))
            .at(FailurePoint::Session)?;
        let message = narrative::en_route(leg, &route, session.facility());
        session.show_route(renderer, route);
        self.narrate(&message, false);

        session
            .advance(Stage::Animating(leg))
            .at(FailurePoint::Session)?;
        let overlay = session.take_route_overlay();
        let Some((marker, route)) = session.animation_parts() else {
            if let Some(overlay) = overlay {
                renderer.remove_overlay(overlay);
            }
            return Err((
                FailurePoint::Animation(leg),
                DispatchError::InvalidTransition {
                    from: Stage::Animating(leg).to_string(),
                    to: "animation without marker or route".to_string(),
                },
            ));
        };

        let report = self
            .animator
            .animate(renderer, marker, route, overlay, cancel)
            .await
            .at(FailurePoint::Animation(leg))?;
        info!(
            "Leg {} done: {} updates, {:?} suspended",
            leg, report.steps, report.suspended
        );
        Ok(())
    }
}
