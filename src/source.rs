//! Marker source seam.
//!
//! Where markers come from (backend query, realtime push, fixtures) is up to
//! the caller. The engine only needs a snapshot on demand.

use std::sync::Mutex;

use crate::{ActivityFilter, ActivityMarker, MapError, Result};

/// Something that can deliver the current list of activity markers.
pub trait MarkerSource {
    /// Fetch a fresh snapshot, narrowed by `filter` when given.
    fn fetch_markers(&self, filter: Option<&ActivityFilter>) -> Result<Vec<ActivityMarker>>;
}

/// In-memory source, mainly for tests and demos.
///
/// Can be switched offline to exercise error paths.
#[derive(Debug, Default)]
pub struct StaticMarkerSource {
    markers: Mutex<Vec<ActivityMarker>>,
    offline: Mutex<bool>,
}

impl StaticMarkerSource {
    pub fn new(markers: Vec<ActivityMarker>) -> Self {
        Self {
            markers: Mutex::new(markers),
            offline: Mutex::new(false),
        }
    }

    /// Load markers from a JSON array of activity rows.
    pub fn from_json(json: &str) -> Result<Self> {
        let markers: Vec<ActivityMarker> = serde_json::from_str(json)?;
        Ok(Self::new(markers))
    }

    /// Replace the served markers (simulates a backend change).
    pub fn set_markers(&self, markers: Vec<ActivityMarker>) {
        if let Ok(mut guard) = self.markers.lock() {
            *guard = markers;
        }
    }

    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut guard) = self.offline.lock() {
            *guard = offline;
        }
    }
}

impl MarkerSource for StaticMarkerSource {
    fn fetch_markers(&self, filter: Option<&ActivityFilter>) -> Result<Vec<ActivityMarker>> {
        let offline = *self.offline.lock().map_err(|_| MapError::Internal {
            message: "marker source lock poisoned".to_string(),
        })?;
        if offline {
            return Err(MapError::SourceUnavailable {
                message: "source is offline".to_string(),
            });
        }

        let markers = self.markers.lock().map_err(|_| MapError::Internal {
            message: "marker source lock poisoned".to_string(),
        })?;

        Ok(match filter {
            Some(filter) => filter.apply(&markers),
            None => markers.clone(),
        })
    }
}
