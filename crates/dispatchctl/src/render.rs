//! Rendering collaborator.
//!
//! The dispatch core only ever talks to `MapRenderer`. How a marker or a
//! polyline is actually drawn is the implementation's business.

use dispatch_shared::Coord;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Opaque id for something drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(pub u64);

impl std::fmt::Display for OverlayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Incident,
    Ambulance,
    Hospital,
}

impl MarkerIcon {
    pub fn asset(self) -> &'static str {
        match self {
            Self::Incident => "images/eventPersonemoji.png",
            Self::Ambulance => "images/ambulance.png",
            Self::Hospital => "images/hospital.png",
        }
    }
}

/// Map drawing operations used by a dispatch session.
///
/// Rendering never fails from the caller's point of view.
pub trait MapRenderer: Send + Sync {
    /// Centre the view. Called once per session.
    fn set_view(&self, _center: Coord, _zoom: u8) {}

    fn place_marker(&self, at: Coord, icon: MarkerIcon, label: &str) -> OverlayHandle;

    fn move_marker(&self, handle: OverlayHandle, to: Coord);

    fn remove_overlay(&self, handle: OverlayHandle);

    fn place_circle(&self, center: Coord, radius_m: f64, color: &str);

    fn place_polyline(&self, points: &[Coord]) -> OverlayHandle;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Marker {
        at: Coord,
        icon: MarkerIcon,
        label: String,
    },
    Circle {
        center: Coord,
        radius_m: f64,
        color: String,
    },
    Polyline {
        points: usize,
    },
}

#[derive(Default)]
struct MapState {
    next_id: u64,
    overlays: HashMap<OverlayHandle, Overlay>,
}

impl MapState {
    fn insert(&mut self, overlay: Overlay) -> OverlayHandle {
        self.next_id += 1;
        let handle = OverlayHandle(self.next_id);
        self.overlays.insert(handle, overlay);
        handle
    }
}

/// Headless map that keeps a registry of live overlays and logs every
/// operation. Used by the CLI.
pub struct TerminalMap {
    icon_size: u32,
    state: Mutex<MapState>,
}

impl TerminalMap {
    pub fn new(icon_size: u32) -> Self {
        Self {
            icon_size,
            state: Mutex::new(MapState::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MapState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Overlays still drawn, sorted by handle.
    pub fn live_overlays(&self) -> Vec<(OverlayHandle, Overlay)> {
        self.with_state(|s| {
            let mut v: Vec<_> = s.overlays.iter().map(|(h, o)| (*h, o.clone())).collect();
            v.sort_by_key(|(h, _)| h.0);
            v
        })
    }

    pub fn live_count(&self) -> usize {
        self.with_state(|s| s.overlays.len())
    }
}

impl MapRenderer for TerminalMap {
    fn set_view(&self, center: Coord, zoom: u8) {
        info!("Map centred on {} at zoom {}", center, zoom);
    }

    fn place_marker(&self, at: Coord, icon: MarkerIcon, label: &str) -> OverlayHandle {
        let handle = self.with_state(|s| {
            s.insert(Overlay::Marker {
                at,
                icon,
                label: label.to_string(),
            })
        });
        info!(
            "Marker {} {} ({}px) at {}: {}",
            handle,
            icon.asset(),
            self.icon_size,
            at,
            label
        );
        handle
    }

    fn move_marker(&self, handle: OverlayHandle, to: Coord) {
        let moved = self.with_state(|s| match s.overlays.get_mut(&handle) {
            Some(Overlay::Marker { at, .. }) => {
                *at = to;
                true
            }
            _ => false,
        });
        if moved {
            debug!("Marker {} -> {}", handle, to);
        } else {
            warn!("Ignoring move of unknown marker {}", handle);
        }
    }

    fn remove_overlay(&self, handle: OverlayHandle) {
        match self.with_state(|s| s.overlays.remove(&handle)) {
            Some(_) => debug!("Removed overlay {}", handle),
            None => warn!("Ignoring removal of unknown overlay {}", handle),
        }
    }

    fn place_circle(&self, center: Coord, radius_m: f64, color: &str) {
        let handle = self.with_state(|s| {
            s.insert(Overlay::Circle {
                center,
                radius_m,
                color: color.to_string(),
            })
        });
        info!("Circle {} at {} radius {} m ({})", handle, center, radius_m, color);
    }

    fn place_polyline(&self, points: &[Coord]) -> OverlayHandle {
        let handle = self.with_state(|s| {
            s.insert(Overlay::Polyline {
                points: points.len(),
            })
        });
        info!("Route {} drawn with {} waypoints", handle, points.len());
        handle
    }
}
