//! Dispatch session stages.
//!
//! Idle -> IncidentSelected -> ZoneClassified -> ResponderSearch
//!   -> RouteComputed(incident) -> Animating(incident) -> ArrivedAtIncident
//!   -> FacilitySearch -> RouteComputed(facility) -> Animating(facility)
//!   -> ArrivedAtFacility -> Done
//!
//! Each step moves to the next stage only. A NotFound search moves
//! straight to Done. Any non-terminal stage may move to Failed. Done and
//! Failed are terminal.

use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};

/// Which leg of the trip a route/animation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Responder position -> incident
    Incident,
    /// Incident -> facility
    Facility,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incident => write!(f, "incident"),
            Self::Facility => write!(f, "facility"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Found,
    NotFound,
}

/// Where a failed session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePoint {
    IncidentSelection,
    ResponderSearch,
    Routing(Leg),
    Animation(Leg),
    FacilitySearch,
    /// Caught by the orchestrator's top-level handler.
    Session,
}

impl std::fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncidentSelection => write!(f, "incident-selection"),
            Self::ResponderSearch => write!(f, "responder-search"),
            Self::Routing(leg) => write!(f, "routing({})", leg),
            Self::Animation(leg) => write!(f, "animation({})", leg),
            Self::FacilitySearch => write!(f, "facility-search"),
            Self::Session => write!(f, "session"),
        }
    }
}

/// How a successful session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    NoResponder,
    NoFacility,
    ReachedFacility,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Idle,
    IncidentSelected,
    ZoneClassified,
    ResponderSearch(SearchOutcome),
    RouteComputed(Leg),
    Animating(Leg),
    ArrivedAtIncident,
    FacilitySearch(SearchOutcome),
    ArrivedAtFacility,
    Done(Completion),
    Failed {
        at: FailurePoint,
        cause: DispatchError,
    },
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done(_) | Stage::Failed { .. })
    }

    /// Position along the happy path. Terminal stages have none.
    fn ordinal(&self) -> Option<u8> {
        let n = match self {
            Stage::Idle => 0,
            Stage::IncidentSelected => 1,
            Stage::ZoneClassified => 2,
            Stage::ResponderSearch(_) => 3,
            Stage::RouteComputed(Leg::Incident) => 4,
            Stage::Animating(Leg::Incident) => 5,
            Stage::ArrivedAtIncident => 6,
            Stage::FacilitySearch(_) => 7,
            Stage::RouteComputed(Leg::Facility) => 8,
            Stage::Animating(Leg::Facility) => 9,
            Stage::ArrivedAtFacility => 10,
            Stage::Done(_) | Stage::Failed { .. } => return None,
        };
        Some(n)
    }

    fn is_not_found(&self) -> bool {
        matches!(
            self,
            Stage::ResponderSearch(SearchOutcome::NotFound)
                | Stage::FacilitySearch(SearchOutcome::NotFound)
        )
    }

    pub fn can_advance_to(&self, next: &Stage) -> bool {
        let Some(from) = self.ordinal() else {
            return false;
        };
        match (next, next.ordinal()) {
            (Stage::Failed { .. }, _) => true,
            (Stage::Done(completion), _) => match completion {
                Completion::NoResponder => {
                    *self == Stage::ResponderSearch(SearchOutcome::NotFound)
                }
                Completion::NoFacility => *self == Stage::FacilitySearch(SearchOutcome::NotFound),
                Completion::ReachedFacility => *self == Stage::ArrivedAtFacility,
            },
            (_, Some(to)) => !self.is_not_found() && to == from + 1,
            (_, None) => false,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::IncidentSelected => write!(f, "incident-selected"),
            Stage::ZoneClassified => write!(f, "zone-classified"),
            Stage::ResponderSearch(SearchOutcome::Found) => write!(f, "responder-search(found)"),
            Stage::ResponderSearch(SearchOutcome::NotFound) => {
                write!(f, "responder-search(not-found)")
            }
            Stage::RouteComputed(leg) => write!(f, "route-computed({})", leg),
            Stage::Animating(leg) => write!(f, "animating({})", leg),
            Stage::ArrivedAtIncident => write!(f, "arrived-at-incident"),
            Stage::FacilitySearch(SearchOutcome::Found) => write!(f, "facility-search(found)"),
            Stage::FacilitySearch(SearchOutcome::NotFound) => {
                write!(f, "facility-search(not-found)")
            }
            Stage::ArrivedAtFacility => write!(f, "arrived-at-facility"),
            Stage::Done(c) => write!(f, "done({:?})", c),
            Stage::Failed { at, cause } => write!(f, "failed({}, {})", at, cause.kind()),
        }
    }
}

/// Current stage plus every stage visited so far.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    pub fn current(&self) -> &Stage {
        &self.current
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, next: Stage) -> DispatchResult<()> {
        if !self.current.can_advance_to(&next) {
            return Err(DispatchError::InvalidTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        self.history.push(next.clone());
        self.current = next;
        Ok(())
    }

    /// Index of the first visit to `stage`, if any.
    pub fn position_of(&self, stage: &Stage) -> Option<usize> {
        self.history.iter().position(|s| s == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_accepted() {
        let mut t = StageTracker::new();
        for s in [
            Stage::IncidentSelected,
            Stage::ZoneClassified,
            Stage::ResponderSearch(SearchOutcome::Found),
            Stage::RouteComputed(Leg::Incident),
            Stage::Animating(Leg::Incident),
            Stage::ArrivedAtIncident,
            Stage::FacilitySearch(SearchOutcome::Found),
            Stage::RouteComputed(Leg::Facility),
            Stage::Animating(Leg::Facility),
            Stage::ArrivedAtFacility,
            Stage::Done(Completion::ReachedFacility),
        ] {
            t.advance(s).unwrap();
        }
        assert!(t.current().is_terminal());
        assert_eq!(t.history().len(), 12);
    }

    #[test]
    fn test_stage_cannot_rerun() {
        let mut t = StageTracker::new();
        t.advance(Stage::IncidentSelected).unwrap();
        t.advance(Stage::ZoneClassified).unwrap();
        let err = t.advance(Stage::IncidentSelected).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition { .. }));
        let err = t.advance(Stage::ZoneClassified).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut t = StageTracker::new();
        t.advance(Stage::Failed {
            at: FailurePoint::IncidentSelection,
            cause: DispatchError::EmptyCandidateSet,
        })
        .unwrap();
        assert!(t.advance(Stage::IncidentSelected).is_err());
        assert!(t
            .advance(Stage::Failed {
                at: FailurePoint::Session,
                cause: DispatchError::Cancelled,
            })
            .is_err());
    }

    #[test]
    fn test_not_found_goes_straight_to_done() {
        let mut t = StageTracker::new();
        t.advance(Stage::IncidentSelected).unwrap();
        t.advance(Stage::ZoneClassified).unwrap();
        t.advance(Stage::ResponderSearch(SearchOutcome::NotFound)).unwrap();
        t.advance(Stage::Done(Completion::NoResponder)).unwrap();
    }

    #[test]
    fn test_done_requires_matching_predecessor() {
        let mut t = StageTracker::new();
        t.advance(Stage::IncidentSelected).unwrap();
        assert!(t.advance(Stage::Done(Completion::ReachedFacility)).is_err());
        assert!(t.advance(Stage::Done(Completion::NoResponder)).is_err());
    }

    #[test]
    fn test_not_found_cannot_route() {
        let mut t = StageTracker::new();
        t.advance(Stage::IncidentSelected).unwrap();
        t.advance(Stage::ZoneClassified).unwrap();
        t.advance(Stage::ResponderSearch(SearchOutcome::NotFound)).unwrap();
        let err = t.advance(Stage::RouteComputed(Leg::Incident)).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidTransition { .. }));
        assert_eq!(
            t.current(),
            &Stage::ResponderSearch(SearchOutcome::NotFound)
        );
    }

    #[test]
    fn test_missing_facility_cannot_route() {
        let mut t = StageTracker::new();
        for s in [
            Stage::IncidentSelected,
            Stage::ZoneClassified,
            Stage::ResponderSearch(SearchOutcome::Found),
            Stage::RouteComputed(Leg::Incident),
            Stage::Animating(Leg::Incident),
            Stage::ArrivedAtIncident,
            Stage::FacilitySearch(SearchOutcome::NotFound),
        ] {
            t.advance(s).unwrap();
        }
        assert!(t.advance(Stage::RouteComputed(Leg::Facility)).is_err());
        t.advance(Stage::Done(Completion::NoFacility)).unwrap();
    }

    #[test]
    fn test_stages_cannot_be_skipped() {
        let mut t = StageTracker::new();
        assert!(t.advance(Stage::ArrivedAtFacility).is_err());
        assert!(t.advance(Stage::ZoneClassified).is_err());
        t.advance(Stage::IncidentSelected).unwrap();
        t.advance(Stage::ZoneClassified).unwrap();
        t.advance(Stage::ResponderSearch(SearchOutcome::Found)).unwrap();
        assert!(t.advance(Stage::Animating(Leg::Incident)).is_err());
        assert!(t.advance(Stage::FacilitySearch(SearchOutcome::Found)).is_err());
        assert_eq!(t.history().len(), 4);
    }

    #[test]
    fn test_failed_from_any_open_stage() {
        let mut t = StageTracker::new();
        t.advance(Stage::IncidentSelected).unwrap();
        t.advance(Stage::ZoneClassified).unwrap();
        t.advance(Stage::ResponderSearch(SearchOutcome::NotFound)).unwrap();
        t.advance(Stage::Failed {
            at: FailurePoint::Session,
            cause: DispatchError::Cancelled,
        })
        .unwrap();
        assert_eq!(t.position_of(&Stage::ZoneClassified), Some(2));
        assert_eq!(t.position_of(&Stage::ArrivedAtIncident), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Stage::Animating(Leg::Facility).to_string(), "animating(facility)");
        let failed = Stage::Failed {
            at: FailurePoint::Routing(Leg::Incident),
            cause: DispatchError::RoutingUnavailable("503".into()),
        };
        assert_eq!(failed.to_string(), "failed(routing(incident), routing_unavailable)");
    }
}
