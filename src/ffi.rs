//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose Rust functionality
//! to Kotlin and Swift. Pure algorithm calls are prefixed with `ffi_`,
//! calls on the global engine with `map_engine_`.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, info, warn};
use once_cell::sync::Lazy;

use crate::engine::with_engine;
use crate::{
    compute_draw_items_with_config, compute_zoom_region_with_config, init_logging,
    is_material_change_with_epsilon, ActivityFilter, ActivityMarker, ChannelGuard, ChannelHooks,
    ClusterConfig, DrawItem, EngineStats, MarkerCluster, SharedChannel, TimeWindow, Viewport,
};

// ============================================================================
// Pure Algorithm Functions
// ============================================================================

/// Default clustering configuration.
#[uniffi::export]
pub fn ffi_default_cluster_config() -> ClusterConfig {
    ClusterConfig::default()
}

/// Partition markers into single and cluster draw items.
#[uniffi::export]
pub fn ffi_compute_draw_items(
    markers: Vec<ActivityMarker>,
    viewport: Viewport,
    config: ClusterConfig,
) -> Vec<DrawItem> {
    init_logging();
    let start = std::time::Instant::now();
    let items = compute_draw_items_with_config(&markers, &viewport, &config);
    debug!(
        "[ActivityMapRust] {} markers -> {} draw items in {:?}",
        markers.len(),
        items.len(),
        start.elapsed()
    );
    items
}

/// Viewport to animate to after tapping a cluster.
#[uniffi::export]
pub fn ffi_compute_zoom_region(
    cluster: MarkerCluster,
    viewport: Viewport,
    config: ClusterConfig,
) -> Viewport {
    compute_zoom_region_with_config(&cluster, &viewport, &config)
}

/// Whether `proposed` differs materially from `current`.
#[uniffi::export]
pub fn ffi_is_material_change(current: Viewport, proposed: Viewport, epsilon: f64) -> bool {
    is_material_change_with_epsilon(&current, &proposed, epsilon)
}

// ============================================================================
// Engine Functions
// ============================================================================

/// Initialize the engine (call once at app startup).
#[uniffi::export]
pub fn map_engine_init() {
    init_logging();
    info!("[MapEngine] Initialized");
}

/// Clear all engine state.
#[uniffi::export]
pub fn map_engine_clear() {
    with_engine(|e| e.clear());
    info!("[MapEngine] Cleared");
}

/// Replace the marker snapshot from a JSON array of activity rows.
/// Returns the number of markers held, or 0 if the JSON is malformed.
#[uniffi::export]
pub fn map_engine_set_markers_json(json: String) -> u32 {
    match serde_json::from_str::<Vec<ActivityMarker>>(&json) {
        Ok(markers) => with_engine(|e| e.replace_markers(markers)) as u32,
        Err(err) => {
            warn!("[MapEngine] Rejected marker snapshot: {}", err);
            0
        }
    }
}

/// Replace the marker snapshot.
#[uniffi::export]
pub fn map_engine_set_markers(markers: Vec<ActivityMarker>) -> u32 {
    with_engine(|e| e.replace_markers(markers)) as u32
}

/// Apply a realtime update from a JSON array of activity rows.
/// Returns the number of accepted records.
#[uniffi::export]
pub fn map_engine_upsert_markers_json(json: String) -> u32 {
    match serde_json::from_str::<Vec<ActivityMarker>>(&json) {
        Ok(markers) => with_engine(|e| e.upsert_markers(markers)) as u32,
        Err(err) => {
            warn!("[MapEngine] Rejected marker update: {}", err);
            0
        }
    }
}

/// Remove markers by id.
#[uniffi::export]
pub fn map_engine_remove_markers(marker_ids: Vec<String>) -> u32 {
    with_engine(|e| e.remove_markers(&marker_ids)) as u32
}

/// Propose a new viewport (e.g. on region change complete).
/// Returns true if the engine adopted it.
#[uniffi::export]
pub fn map_engine_set_viewport(viewport: Viewport) -> bool {
    with_engine(|e| e.set_viewport(viewport))
}

#[uniffi::export]
pub fn map_engine_get_viewport() -> Viewport {
    with_engine(|e| e.viewport())
}

/// Filter to activities starting within `days` (1, 7 or 30) from now.
/// An empty sport means all sports. Returns false for an unsupported window.
#[uniffi::export]
pub fn map_engine_set_filter(days: u32, sport: String) -> bool {
    let Some(window) = TimeWindow::from_days(days) else {
        warn!("[MapEngine] Unsupported time window: {} days", days);
        return false;
    };
    let filter = ActivityFilter::upcoming(window, Some(sport), Utc::now());
    with_engine(|e| e.set_filter(Some(filter)));
    true
}

#[uniffi::export]
pub fn map_engine_clear_filter() {
    with_engine(|e| e.set_filter(None));
}

#[uniffi::export]
pub fn map_engine_get_draw_items() -> Vec<DrawItem> {
    with_engine(|e| e.draw_items().to_vec())
}

/// Draw items as JSON: [{"type": "single", "marker": {...}}, {"type": "cluster", "cluster": {...}}]
#[uniffi::export]
pub fn map_engine_get_draw_items_json() -> String {
    with_engine(|e| e.draw_items_json())
}

/// Zoom toward a tapped cluster. Returns the viewport to animate to,
/// or None if the cluster is no longer drawn.
#[uniffi::export]
pub fn map_engine_zoom_to_cluster(cluster_id: String) -> Option<Viewport> {
    with_engine(|e| e.zoom_to_cluster(&cluster_id))
}

/// Record that a marker's icon finished loading.
#[uniffi::export]
pub fn map_engine_mark_icon_loaded(marker_id: String) -> bool {
    with_engine(|e| e.mark_icon_loaded(&marker_id))
}

#[uniffi::export]
pub fn map_engine_is_icon_loaded(marker_id: String) -> bool {
    with_engine(|e| e.is_icon_loaded(&marker_id))
}

/// Set clustering configuration. Returns false if the values are rejected.
#[uniffi::export]
pub fn map_engine_set_config(config: ClusterConfig) -> bool {
    with_engine(|e| match e.set_config(config) {
        Ok(()) => true,
        Err(err) => {
            warn!("[MapEngine] {}", err);
            false
        }
    })
}

/// Get engine statistics.
#[uniffi::export]
pub fn map_engine_get_stats() -> EngineStats {
    with_engine(|e| e.stats())
}

// ============================================================================
// Realtime Channel
// ============================================================================

/// Callback interface for the platform's realtime channel.
/// Implement this in Kotlin/Swift to open/close the backend subscription.
#[uniffi::export(callback_interface)]
pub trait RealtimeChannelCallback: Send + Sync {
    /// Called when the first consumer subscribes.
    fn attach(&self);
    /// Called when the last consumer unsubscribes.
    fn detach(&self);
}

struct ForeignHooks(Box<dyn RealtimeChannelCallback>);

impl ChannelHooks for ForeignHooks {
    fn attach(&self) {
        self.0.attach();
    }

    fn detach(&self) {
        self.0.detach();
    }
}

static REALTIME: Lazy<Mutex<Option<SharedChannel<ForeignHooks>>>> = Lazy::new(|| Mutex::new(None));

/// A consumer's hold on the realtime channel.
#[derive(uniffi::Object)]
pub struct RealtimeSubscription {
    guard: Mutex<Option<ChannelGuard>>,
}

#[uniffi::export]
impl RealtimeSubscription {
    /// Release this consumer. Safe to call more than once.
    pub fn unsubscribe(&self) {
        let guard = match self.guard.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(guard) = guard {
            guard.release();
        }
    }
}

/// Register the platform channel shared by all realtime consumers.
#[uniffi::export]
pub fn map_engine_register_realtime_channel(name: String, callback: Box<dyn RealtimeChannelCallback>) {
    let channel = SharedChannel::new(name, ForeignHooks(callback));
    let mut slot = REALTIME.lock().unwrap_or_else(|p| p.into_inner());
    if slot.as_ref().is_some_and(|c| c.is_attached()) {
        warn!("[MapEngine] Replacing realtime channel that still has consumers");
    }
    *slot = Some(channel);
}

/// Subscribe to realtime updates. The channel attaches on the first
/// subscription and detaches when the last one is released.
#[uniffi::export]
pub fn map_engine_subscribe_realtime() -> Arc<RealtimeSubscription> {
    let slot = REALTIME.lock().unwrap_or_else(|p| p.into_inner());
    let guard = match slot.as_ref() {
        Some(channel) => Some(channel.acquire()),
        None => {
            warn!("[MapEngine] Realtime subscription requested before a channel was registered");
            None
        }
    };
    Arc::new(RealtimeSubscription {
        guard: Mutex::new(guard),
    })
}
