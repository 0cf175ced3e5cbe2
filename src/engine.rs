//! # Map Engine
//!
//! Stateful holder for everything the map screen needs to draw pins.
//! Keeps the marker snapshot, viewport and filter on the Rust side so the
//! mobile layer only pushes changes and pulls draw items.
//!
//! ## Architecture
//!
//! The engine is a singleton that manages:
//! - The latest marker snapshot (source order, one entry per id)
//! - The current viewport, guarded by the change filter
//! - The active time window / sport filter
//! - Which markers' icons have finished loading (render hint)
//! - Draw items, recomputed lazily when markers, filter or viewport change

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use log::{debug, info, warn};
use once_cell::sync::Lazy;

use crate::clustering::compute_draw_items_with_config;
use crate::navigation::compute_zoom_region_with_config;
use crate::viewport::is_material_change_with_epsilon;
use crate::{
    ActivityFilter, ActivityMarker, ClusterConfig, DrawItem, MarkerCluster, MarkerSource, Result,
    Viewport,
};

/// Initial viewport before the user's location is known.
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    center_lat: -22.9,
    center_lng: -43.2,
    lat_span: 0.08,
    lng_span: 0.08,
};

// ============================================================================
// Map Engine
// ============================================================================

/// The main stateful map engine.
pub struct MapEngine {
    // Core state
    markers: Vec<ActivityMarker>,
    marker_index: HashMap<String, usize>,
    viewport: Viewport,
    filter: Option<ActivityFilter>,

    // Render hints
    loaded_icons: HashSet<String>,

    // Cached output
    draw_items: Vec<DrawItem>,
    draw_items_dirty: bool,

    // Configuration
    config: ClusterConfig,
}

impl MapEngine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            marker_index: HashMap::new(),
            viewport: DEFAULT_VIEWPORT,
            filter: None,
            loaded_icons: HashSet::new(),
            draw_items: Vec::new(),
            draw_items_dirty: false,
            config: ClusterConfig::default(),
        }
    }

    /// Create a new engine with a custom configuration.
    pub fn with_config(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    // ========================================================================
    // Marker Management
    // ========================================================================

    /// Replace the whole snapshot (e.g. after a fetch).
    ///
    /// Markers with invalid coordinates are dropped. If an id repeats, the
    /// later record wins and keeps the earlier position.
    /// Returns the number of markers held afterwards.
    pub fn replace_markers(&mut self, markers: Vec<ActivityMarker>) -> usize {
        self.markers.clear();
        self.marker_index.clear();
        let accepted = self.insert_markers(markers);
        self.markers_changed();

        info!(
            "[MapEngine] Replaced snapshot: {} markers ({} accepted)",
            self.markers.len(),
            accepted
        );
        self.markers.len()
    }

    /// Apply a realtime update: known ids are replaced in place, new ids
    /// are appended. Returns how many records were accepted.
    pub fn upsert_markers(&mut self, markers: Vec<ActivityMarker>) -> usize {
        let accepted = self.insert_markers(markers);
        if accepted > 0 {
            self.markers_changed();
        }
        debug!("[MapEngine] Upserted {} markers", accepted);
        accepted
    }

    /// Remove markers by id. Unknown ids are ignored.
    pub fn remove_markers(&mut self, ids: &[String]) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.markers.len();
        self.markers.retain(|m| !doomed.contains(m.id.as_str()));
        let removed = before - self.markers.len();

        if removed > 0 {
            self.rebuild_index();
            self.markers_changed();
        }
        info!("[MapEngine] Removed {} markers", removed);
        removed
    }

    /// Clear all markers and reset state (viewport and config are kept).
    pub fn clear(&mut self) {
        self.markers.clear();
        self.marker_index.clear();
        self.loaded_icons.clear();
        self.draw_items.clear();
        self.draw_items_dirty = false;
    }

    /// Fetch a fresh snapshot from `source` and replace the current one.
    ///
    /// On error the current snapshot is left untouched.
    pub fn refresh_from(&mut self, source: &dyn MarkerSource) -> Result<usize> {
        let markers = source.fetch_markers(self.filter.as_ref()).map_err(|e| {
            warn!("[MapEngine] Refresh failed: {}", e);
            e
        })?;
        Ok(self.replace_markers(markers))
    }

    /// Markers in snapshot order (before filtering).
    pub fn markers(&self) -> &[ActivityMarker] {
        &self.markers
    }

    pub fn marker(&self, id: &str) -> Option<&ActivityMarker> {
        self.marker_index.get(id).map(|&i| &self.markers[i])
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_marker(&self, id: &str) -> bool {
        self.marker_index.contains_key(id)
    }

    fn insert_markers(&mut self, markers: Vec<ActivityMarker>) -> usize {
        let mut accepted = 0;
        for marker in markers {
            if let Err(err) = marker.validate() {
                warn!(
                    "[MapEngine] Dropping marker at ({}, {}): {}",
                    marker.latitude, marker.longitude, err
                );
                continue;
            }
            let existing = self.marker_index.get(&marker.id).copied();
            match existing {
                Some(i) => self.markers[i] = marker,
                None => {
                    self.marker_index
                        .insert(marker.id.clone(), self.markers.len());
                    self.markers.push(marker);
                }
            }
            accepted += 1;
        }
        accepted
    }

    fn rebuild_index(&mut self) {
        self.marker_index = self
            .markers
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
    }

    fn markers_changed(&mut self) {
        let index = &self.marker_index;
        self.loaded_icons.retain(|id| index.contains_key(id));
        self.draw_items_dirty = true;
    }

    // ========================================================================
    // Filter
    // ========================================================================

    /// Set or clear the activity filter applied before clustering.
    pub fn set_filter(&mut self, filter: Option<ActivityFilter>) {
        self.filter = filter;
        self.draw_items_dirty = true;
    }

    pub fn filter(&self) -> Option<&ActivityFilter> {
        self.filter.as_ref()
    }

    /// Markers that pass the current filter, in clustering order.
    pub fn visible_markers(&self) -> Vec<ActivityMarker> {
        match &self.filter {
            Some(filter) => filter.apply(&self.markers),
            None => self.markers.clone(),
        }
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Adopt `proposed` if it differs materially from the current viewport.
    ///
    /// Spans are raised to `min_span` first, so zero or negative spans from
    /// the map widget are never stored. Returns true if the viewport changed.
    pub fn set_viewport(&mut self, proposed: Viewport) -> bool {
        let values = [
            proposed.center_lat,
            proposed.center_lng,
            proposed.lat_span,
            proposed.lng_span,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            warn!("[MapEngine] Ignoring non-finite viewport {:?}", proposed);
            return false;
        }
        let proposed = proposed.normalized(self.config.min_span);
        if !is_material_change_with_epsilon(&self.viewport, &proposed, self.config.change_epsilon)
        {
            return false;
        }
        self.viewport = proposed;
        self.draw_items_dirty = true;
        true
    }

    // ========================================================================
    // Draw Items
    // ========================================================================

    fn ensure_draw_items(&mut self) {
        if !self.draw_items_dirty {
            return;
        }

        let visible = self.visible_markers();
        self.draw_items = compute_draw_items_with_config(&visible, &self.viewport, &self.config);
        self.draw_items_dirty = false;
    }

    /// Current draw items for the rendering sink.
    pub fn draw_items(&mut self) -> &[DrawItem] {
        self.ensure_draw_items();
        &self.draw_items
    }

    /// Draw items as JSON string (for efficient FFI).
    pub fn draw_items_json(&mut self) -> String {
        self.ensure_draw_items();
        serde_json::to_string(&self.draw_items).unwrap_or_else(|_| "[]".to_string())
    }

    /// Look up a cluster from the current draw items.
    pub fn find_cluster(&mut self, cluster_id: &str) -> Option<&MarkerCluster> {
        self.ensure_draw_items();
        self.draw_items.iter().find_map(|item| match item {
            DrawItem::Cluster { cluster } if cluster.id == cluster_id => Some(cluster),
            _ => None,
        })
    }

    /// Zoom toward a tapped cluster.
    ///
    /// Returns the viewport in effect afterwards, or `None` if no cluster
    /// with that id is currently drawn.
    pub fn zoom_to_cluster(&mut self, cluster_id: &str) -> Option<Viewport> {
        let current = self.viewport;
        let config = self.config.clone();
        let next = compute_zoom_region_with_config(self.find_cluster(cluster_id)?, &current, &config);

        if self.set_viewport(next) {
            debug!("[MapEngine] Zoomed to {}", cluster_id);
        }
        Some(self.viewport)
    }

    // ========================================================================
    // Icon Load Tracking
    // ========================================================================

    /// Record that a marker's icon finished loading.
    ///
    /// Returns true if this is new information for a known marker.
    pub fn mark_icon_loaded(&mut self, marker_id: &str) -> bool {
        if !self.has_marker(marker_id) {
            return false;
        }
        self.loaded_icons.insert(marker_id.to_string())
    }

    pub fn is_icon_loaded(&self, marker_id: &str) -> bool {
        self.loaded_icons.contains(marker_id)
    }

    /// Loaded icon ids, sorted.
    pub fn loaded_icon_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loaded_icons.iter().cloned().collect();
        ids.sort();
        ids
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Update configuration. Invalidates draw items.
    pub fn set_config(&mut self, config: ClusterConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.draw_items_dirty = true;
        Ok(())
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Get engine statistics.
    pub fn stats(&mut self) -> EngineStats {
        self.ensure_draw_items();

        let cluster_count = self.draw_items.iter().filter(|i| i.is_cluster()).count();
        let visible_marker_count = self
            .draw_items
            .iter()
            .map(|i| i.marker_ids().len())
            .sum::<usize>();

        EngineStats {
            marker_count: self.markers.len() as u32,
            visible_marker_count: visible_marker_count as u32,
            draw_item_count: self.draw_items.len() as u32,
            cluster_count: cluster_count as u32,
            loaded_icon_count: self.loaded_icons.len() as u32,
        }
    }
}

impl Default for MapEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineStats {
    pub marker_count: u32,
    pub visible_marker_count: u32,
    pub draw_item_count: u32,
    pub cluster_count: u32,
    pub loaded_icon_count: u32,
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global engine instance shared by the FFI calls.
pub static ENGINE: Lazy<Mutex<MapEngine>> = Lazy::new(|| Mutex::new(MapEngine::new()));

/// Run `f` with exclusive access to the global engine.
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut MapEngine) -> R,
{
    let mut engine = ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut engine)
}

// ============================================================================
// Tests
// ============================================================================
