//! Zoom-to-cluster navigation.
//!
//! Tapping a cluster pin zooms toward it: the span shrinks by a fixed step,
//! but never further than needed to frame the cluster with some padding.

use log::debug;

use crate::{ClusterConfig, MarkerCluster, SpanExtent, Viewport};

/// Next viewport after tapping `cluster`, with the default configuration.
///
/// # Example
/// ```
/// use activity_map::{compute_draw_items, compute_zoom_region, DrawItem, Viewport};
/// use activity_map::ActivityMarker;
///
/// let markers = vec![
///     ActivityMarker::new("a", 10.0, 10.0),
///     ActivityMarker::new("b", 10.01, 10.01),
/// ];
/// let current = Viewport::new(10.0, 10.0, 0.5, 0.5);
/// let items = compute_draw_items(&markers, &current);
///
/// if let DrawItem::Cluster { cluster } = &items[0] {
///     let next = compute_zoom_region(cluster, &current);
///     assert_eq!(next.center(), cluster.centroid);
///     assert!(next.lat_span < current.lat_span);
/// }
/// ```
pub fn compute_zoom_region(cluster: &MarkerCluster, current: &Viewport) -> Viewport {
    compute_zoom_region_with_config(cluster, current, &ClusterConfig::default())
}

/// Center on the cluster centroid; per axis, take the smaller of the
/// step-zoomed current span and the padded cluster extent, floored at
/// `min_span`.
pub fn compute_zoom_region_with_config(
    cluster: &MarkerCluster,
    current: &Viewport,
    config: &ClusterConfig,
) -> Viewport {
    let lat_span = zoomed_span(current.lat_span, cluster.extent.lat_span, config);
    let lng_span = zoomed_span(current.lng_span, cluster.extent.lng_span, config);

    debug!(
        "[Navigation] {} ({} members): span {:.5}x{:.5} -> {:.5}x{:.5}",
        cluster.id,
        cluster.count(),
        current.lat_span,
        current.lng_span,
        lat_span,
        lng_span
    );

    Viewport::around(cluster.centroid, SpanExtent::new(lat_span, lng_span))
}

fn zoomed_span(current_span: f64, extent: f64, config: &ClusterConfig) -> f64 {
    let padded = (extent * config.padding_factor).max(config.min_span);
    (current_span * config.zoom_step).min(padded).max(config.min_span)
}
