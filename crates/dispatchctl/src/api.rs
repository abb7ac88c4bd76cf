//! Dispatch service trait abstraction.
//!
//! Production code uses `HttpDispatchClient`. Tests use
//! `testing::FakeDispatchApi` with pre-configured responses, so the whole
//! workflow runs without any network.

use async_trait::async_trait;
use dispatch_shared::{
    Coord, DispatchResult, FacilityLookup, Incident, ResponderLookup, RoutePath, Zone,
};

/// The five remote lookups a dispatch session depends on.
///
/// Implementations return already-normalized records. A NotFound lookup is
/// an `Ok` value, never an error.
#[async_trait]
pub trait DispatchApi: Send + Sync {
    /// `GET /get_event_data`
    async fn fetch_incidents(&self) -> DispatchResult<Vec<Incident>>;

    /// `GET /classify_zone`
    async fn classify_zone(&self, incident: Coord) -> DispatchResult<Zone>;

    /// `GET /get_ambulance_data`
    async fn nearest_responder(&self, incident: Coord) -> DispatchResult<ResponderLookup>;

    /// `GET /get_shortest_path`
    async fn shortest_path(&self, start: Coord, end: Coord) -> DispatchResult<RoutePath>;

    /// `GET /get_hospital_data`
    async fn nearest_facility(&self, incident: Coord) -> DispatchResult<FacilityLookup>;
}
