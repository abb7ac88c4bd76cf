//! Zone, responder and facility lookups around an incident.

use crate::api::DispatchApi;
use dispatch_shared::{Coord, DispatchResult, FacilityLookup, ResponderLookup, Zone};
use tracing::{info, warn};

/// Classify the incident's zone. Never fails: any error is logged and the
/// zone is reported as unclassified. The bool is false in that case.
pub async fn classify_zone(api: &dyn DispatchApi, incident: Coord) -> (Zone, bool) {
    match api.classify_zone(incident).await {
        Ok(zone) => {
            info!("Zone around {} classified as {}", incident, zone);
            (zone, true)
        }
        Err(e) => {
            warn!("Zone classification failed ({}): {}", e.kind(), e);
            (Zone::unclassified(), false)
        }
    }
}

pub async fn locate_responder(
    api: &dyn DispatchApi,
    incident: Coord,
) -> DispatchResult<ResponderLookup> {
    let lookup = api.nearest_responder(incident).await?;
    match &lookup {
        ResponderLookup::Found {
            responder,
            radius_km,
        } => info!(
            "Ambulance {} at {} (radius {:?} km)",
            responder.id, responder.position, radius_km
        ),
        ResponderLookup::NotFound { radius_km } => {
            info!("No ambulance available (radius {:?} km)", radius_km)
        }
    }
    Ok(lookup)
}

pub async fn find_facility(api: &dyn DispatchApi, incident: Coord) -> DispatchResult<FacilityLookup> {
    let lookup = api.nearest_facility(incident).await?;
    match &lookup {
        FacilityLookup::Found(f) => info!("Nearest hospital {} at {}", f.name, f.position),
        FacilityLookup::NotFound => info!("No hospital found near {}", incident),
    }
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDispatchApi;
    use dispatch_shared::{DispatchError, UNCLASSIFIED_ZONE};

    #[tokio::test]
    async fn test_zone_failure_is_unclassified() {
        let api = FakeDispatchApi::builder()
            .zone(Err(DispatchError::ServiceRejection {
                status: 500,
                detail: String::new(),
            }))
            .build();
        let (zone, ok) = classify_zone(&api, Coord::new(27.7, 85.3)).await;
        assert!(!ok);
        assert_eq!(zone.label, UNCLASSIFIED_ZONE);
    }

    #[tokio::test]
    async fn test_responder_not_found_is_ok() {
        let api = FakeDispatchApi::builder()
            .responder(Ok(ResponderLookup::NotFound { radius_km: None }))
            .build();
        let lookup = locate_responder(&api, Coord::new(27.7, 85.3)).await.unwrap();
        assert_eq!(lookup, ResponderLookup::NotFound { radius_km: None });
    }

    #[tokio::test]
    async fn test_facility_error_propagates() {
        let api = FakeDispatchApi::builder()
            .facility(Err(DispatchError::Network("timeout".into())))
            .build();
        assert!(find_facility(&api, Coord::new(27.7, 85.3)).await.is_err());
    }
}
