//! Route planner.

use crate::api::DispatchApi;
use dispatch_shared::{Coord, DispatchError, DispatchResult, RoutePath};
use tracing::{info, warn};

/// Request a route from `start` to `end` and check it actually connects them.
///
/// A service that answers with a non-success status has declined to route,
/// so `ServiceRejection` is reported as `RoutingUnavailable`. Network
/// failures pass through unchanged.
pub async fn plan_route(
    api: &dyn DispatchApi,
    start: Coord,
    end: Coord,
    tolerance_m: f64,
) -> DispatchResult<RoutePath> {
    let route = api.shortest_path(start, end).await.map_err(|e| match e {
        DispatchError::ServiceRejection { status, detail } => {
            DispatchError::RoutingUnavailable(format!("HTTP {}: {}", status, detail))
        }
        other => other,
    })?;

    if !route.matches_endpoints(start, end, tolerance_m) {
        warn!(
            "Route {} -> {} does not connect {} -> {} within {} m",
            route.start(),
            route.end(),
            start,
            end,
            tolerance_m
        );
        return Err(DispatchError::RoutingUnavailable(
            "route does not connect the requested points".to_string(),
        ));
    }

    info!(
        "Route {} -> {}: {} waypoints, {} m",
        start,
        end,
        route.len(),
        route.distance_m()
    );
    Ok(route)
}
