//! # Activity Map
//!
//! Marker clustering and viewport navigation for a sports meet-up map.
//!
//! This library provides:
//! - Viewport-dependent clustering of activity markers into draw items
//! - Zoom-to-cluster navigation when a cluster pin is tapped
//! - A viewport change filter that suppresses floating-point jitter
//! - A stateful map engine that feeds the above from marker snapshots
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use activity_map::{compute_draw_items, compute_zoom_region, ActivityMarker, DrawItem, Viewport};
//!
//! let markers = vec![
//!     ActivityMarker::new("a", -22.90, -43.20),
//!     ActivityMarker::new("b", -22.90, -43.2001),
//! ];
//! let viewport = Viewport::new(-22.9, -43.2, 0.08, 0.08);
//!
//! let items = compute_draw_items(&markers, &viewport);
//! assert_eq!(items.len(), 1);
//!
//! if let DrawItem::Cluster { cluster } = &items[0] {
//!     let next = compute_zoom_region(cluster, &viewport);
//!     assert!(next.lat_span < viewport.lat_span);
//! }
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MapError, OptionExt, Result};

// Viewport type and change filter
pub mod viewport;
pub use viewport::{is_material_change, is_material_change_with_epsilon, Viewport};

// Union-Find used by linked clustering
pub mod union_find;
pub use union_find::UnionFind;

// Viewport clustering (markers -> draw items)
pub mod clustering;
pub use clustering::{
    cluster_id_for, compute_draw_items, compute_draw_items_with_config, DrawItem, MarkerCluster,
};

// Zoom-to-cluster navigation
pub mod navigation;
pub use navigation::{compute_zoom_region, compute_zoom_region_with_config};

// Algorithm toolbox - pure functions without the engine
pub mod algorithms;

// Time window / sport filtering of activities
pub mod filter;
pub use filter::{ActivityFilter, TimeWindow};

// Sport catalog
pub mod sports;
pub use sports::{find_sport, Sport, SportCategory, DEFAULT_SPORT_ID, SPORTS};

// Marker source seam
pub mod source;
pub use source::{MarkerSource, StaticMarkerSource};

// Ref-counted realtime listener lifetime
pub mod subscription;
pub use subscription::{ChannelGuard, ChannelHooks, SharedChannel};

// Stateful map engine (singleton with marker + viewport state)
pub mod engine;
pub use engine::{with_engine, EngineStats, MapEngine, ENGINE};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ActivityMapRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// An activity pin on the map.
///
/// Only `id` and the coordinates take part in clustering. The remaining
/// fields are carried through to the rendering side untouched. Accepts the
/// backend row shape (`lat`/`lng`) when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ActivityMarker {
    /// Unique activity identifier
    pub id: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
    #[serde(default)]
    pub title: String,
    /// Sport catalog id (e.g. "corrida")
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Start time as an RFC 3339 timestamp
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub creator_id: Option<String>,
}

impl ActivityMarker {
    /// Create a marker with an empty payload.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            title: String::new(),
            sport: String::new(),
            description: None,
            starts_at: String::new(),
            creator_id: None,
        }
    }

    /// Builder-style payload setter for sport and start time.
    pub fn with_schedule(mut self, sport: impl Into<String>, starts_at: impl Into<String>) -> Self {
        self.sport = sport.into();
        self.starts_at = starts_at.into();
        self
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Marker position.
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Check that the marker can be placed on the map.
    pub fn has_valid_coordinates(&self) -> bool {
        self.position().is_valid()
    }

    /// Like [`has_valid_coordinates`](Self::has_valid_coordinates), but
    /// reports which marker was rejected.
    pub fn validate(&self) -> Result<()> {
        self.has_valid_coordinates()
            .then_some(())
            .ok_or_invalid_marker(&self.id, "coordinates out of range")
    }
}

/// Angular size of a region on each axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SpanExtent {
    pub lat_span: f64,
    pub lng_span: f64,
}

impl SpanExtent {
    pub fn new(lat_span: f64, lng_span: f64) -> Self {
        Self { lat_span, lng_span }
    }
}

/// How markers are grouped once the viewport is zoomed out past the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Single pass; each marker joins the first group whose running centroid
    /// is in range. Cheap, but depends on input order.
    #[default]
    Greedy,
    /// Markers in range of each other are linked; groups are the connected
    /// components. Independent of input order.
    Linked,
}

/// Configuration for clustering, navigation and the change filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClusterConfig {
    /// Effective spans at or below this value skip clustering entirely.
    /// Default: 0.012 degrees
    pub cluster_threshold: f64,

    /// Per-axis join distance as a fraction of the effective span.
    /// Default: 0.22
    pub radius_factor: f64,

    /// Factor applied to the current span on each zoom-to-cluster step.
    /// Default: 0.55
    pub zoom_step: f64,

    /// Padding applied to a cluster's extent when framing it.
    /// Default: 1.6
    pub padding_factor: f64,

    /// Floor for every span used or produced.
    /// Default: 0.003 degrees
    pub min_span: f64,

    /// Absolute tolerance of the viewport change filter.
    /// Default: 0.00001 degrees
    pub change_epsilon: f64,

    /// Grouping strategy. Default: greedy
    pub strategy: ClusterStrategy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.012,
            radius_factor: 0.22,
            zoom_step: 0.55,
            padding_factor: 1.6,
            min_span: 0.003,
            change_epsilon: 0.00001,
            strategy: ClusterStrategy::Greedy,
        }
    }
}

impl ClusterConfig {
    /// Reject values that would make clustering or navigation degenerate.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cluster_threshold", self.cluster_threshold),
            ("radius_factor", self.radius_factor),
            ("padding_factor", self.padding_factor),
            ("min_span", self.min_span),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MapError::InvalidConfig {
                    message: format!("{} must be positive and finite, got {}", name, value),
                });
            }
        }

        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 || self.zoom_step > 1.0 {
            return Err(MapError::InvalidConfig {
                message: format!("zoom_step must be in (0, 1], got {}", self.zoom_step),
            });
        }

        if !self.change_epsilon.is_finite() || self.change_epsilon < 0.0 {
            return Err(MapError::InvalidConfig {
                message: format!(
                    "change_epsilon must be non-negative and finite, got {}",
                    self.change_epsilon
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(-22.9, -43.2).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_marker_deserializes_backend_row() {
        let json = r#"{
            "id": "abc123",
            "title": "Futevôlei no Posto 9",
            "sport": "futevolei",
            "starts_at": "2026-10-18T08:00:00Z",
            "lat": -22.986,
            "lng": -43.205,
            "creator_id": null,
            "created_at": "2026-10-10T12:00:00Z"
        }"#;

        let marker: ActivityMarker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.id, "abc123");
        assert_eq!(marker.latitude, -22.986);
        assert_eq!(marker.longitude, -43.205);
        assert_eq!(marker.sport, "futevolei");
        assert!(marker.description.is_none());
        assert!(marker.has_valid_coordinates());
    }

    #[test]
    fn test_marker_validate_names_rejected_marker() {
        assert!(ActivityMarker::new("ok", -22.9, -43.2).validate().is_ok());

        let err = ActivityMarker::new("off-map", 95.0, -43.2)
            .validate()
            .unwrap_err();
        match err {
            MapError::InvalidMarker { marker_id, .. } => assert_eq!(marker_id, "off-map"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(ActivityMarker::new("nan", f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClusterConfig {
            min_span: 0.0,
            ..ClusterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapError::InvalidConfig { .. })
        ));

        let config = ClusterConfig {
            zoom_step: 1.5,
            ..ClusterConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClusterConfig {
            radius_factor: f64::NAN,
            ..ClusterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&ClusterStrategy::Linked).unwrap();
        assert_eq!(json, "\"linked\"");
    }
}
