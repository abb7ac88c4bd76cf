//! Movement animator.
//!
//! Walks a marker through every waypoint of a route, one waypoint per tick,
//! on the caller's task. One animation per animator at a time.

use crate::cancel::CancelToken;
use crate::render::{MapRenderer, OverlayHandle};
use dispatch_shared::{Coord, DispatchError, DispatchResult, RoutePath};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// A drawn marker plus the position it currently shows.
///
/// Only the animator moves it once it has been placed.
#[derive(Debug)]
pub struct MovingMarker {
    handle: OverlayHandle,
    position: Coord,
}

impl MovingMarker {
    pub fn new(handle: OverlayHandle, position: Coord) -> Self {
        Self { handle, position }
    }

    pub fn handle(&self) -> OverlayHandle {
        self.handle
    }

    pub fn position(&self) -> Coord {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationReport {
    /// Position updates performed
    pub steps: usize,
    /// Total time spent waiting between updates
    pub suspended: Duration,
}

pub struct MovementAnimator {
    tick_delay: Duration,
    active: AtomicBool,
}

/// Clears the busy flag even if the animation future is dropped.
struct ActiveGuard<'a>(&'a AtomicBool);

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> DispatchResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DispatchError::AnimationInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MovementAnimator {
    pub fn new(tick_delay: Duration) -> Self {
        Self {
            tick_delay,
            active: AtomicBool::new(false),
        }
    }

    pub fn tick_delay(&self) -> Duration {
        self.tick_delay
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Move `marker` through `path`, waiting one tick between waypoints.
    ///
    /// `route_overlay` is removed when the walk ends, whether it finished
    /// or was cancelled.
    pub async fn animate(
        &self,
        renderer: &dyn MapRenderer,
        marker: &mut MovingMarker,
        path: &RoutePath,
        route_overlay: Option<OverlayHandle>,
        cancel: &CancelToken,
    ) -> DispatchResult<AnimationReport> {
        let _active = ActiveGuard::acquire(&self.active)?;
        info!(
            "Animating marker {} over {} waypoints ({:?} per tick)",
            marker.handle,
            path.len(),
            self.tick_delay
        );

        let result = self.walk(renderer, marker, path, cancel).await;

        if let Some(overlay) = route_overlay {
            renderer.remove_overlay(overlay);
        }
        result
    }

    async fn walk(
        &self,
        renderer: &dyn MapRenderer,
        marker: &mut MovingMarker,
        path: &RoutePath,
        cancel: &CancelToken,
    ) -> DispatchResult<AnimationReport> {
        let last = path.len() - 1;
        let mut report = AnimationReport {
            steps: 0,
            suspended: Duration::ZERO,
        };

        for (i, waypoint) in path.waypoints().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            renderer.move_marker(marker.handle, *waypoint);
            marker.position = *waypoint;
            report.steps += 1;

            if i < last {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Animation cancelled at waypoint {}/{}", i + 1, path.len());
                        return Err(DispatchError::Cancelled);
                    }
                    _ = tokio::time::sleep(self.tick_delay) => {
                        report.suspended += self.tick_delay;
                    }
                }
            }
        }

        Ok(report)
    }
}
