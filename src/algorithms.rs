//! # Algorithm Toolbox
//!
//! Direct access to the pure map algorithms, for callers that hold their own
//! marker and viewport state and don't need the [`MapEngine`](crate::MapEngine).
//!
//! ## Core Algorithms
//!
//! - **Clustering**: markers + viewport -> draw items
//! - **Navigation**: cluster + viewport -> next viewport
//! - **Change filter**: viewport + viewport -> material change?
//! - **Grouping**: index-based Union-Find used by linked clustering
//!
//! # Example
//!
//! ```rust
//! use activity_map::algorithms::{
//!     compute_draw_items, is_material_change, ActivityMarker, Viewport,
//! };
//!
//! let markers = vec![ActivityMarker::new("a", -22.97, -43.18)];
//! let current = Viewport::new(-22.97, -43.18, 0.08, 0.08);
//! let proposed = Viewport::new(-22.970001, -43.18, 0.08, 0.08);
//!
//! assert_eq!(compute_draw_items(&markers, &current).len(), 1);
//! assert!(!is_material_change(&current, &proposed));
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    ActivityMarker, ClusterConfig, ClusterStrategy, DrawItem, GeoPoint, MarkerCluster,
    SpanExtent, Viewport,
};

// =============================================================================
// Clustering
// =============================================================================

pub use crate::clustering::{cluster_id_for, compute_draw_items, compute_draw_items_with_config};

// =============================================================================
// Navigation
// =============================================================================

pub use crate::navigation::{compute_zoom_region, compute_zoom_region_with_config};

// =============================================================================
// Change Filter
// =============================================================================

pub use crate::viewport::{is_material_change, is_material_change_with_epsilon};

// =============================================================================
// Grouping
// =============================================================================

pub use crate::union_find::UnionFind;
