//! Shared types for the ambulance dispatch simulator.
//!
//! Data model, stage machine tags and the error taxonomy. No I/O lives here.

pub mod error;
pub mod geo;
pub mod model;
pub mod stage;

pub use error::{DispatchError, DispatchResult};
pub use geo::Coord;
pub use model::{
    Attributes, Facility, FacilityLookup, Incident, Responder, ResponderLookup, RoutePath, Zone,
    UNCLASSIFIED_ZONE,
};
pub use stage::{Completion, FailurePoint, Leg, SearchOutcome, Stage, StageTracker};

/// Crate version, shared by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
