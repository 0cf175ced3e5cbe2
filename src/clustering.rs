//! # Viewport Clustering
//!
//! Turns a marker snapshot and the current viewport into the list of items
//! the map should draw: individual pins, and synthetic cluster pins standing
//! in for two or more nearby activities.
//!
//! The join radius scales with the viewport, so the same markers split apart
//! as the user zooms in. Once the effective span drops to the cluster
//! threshold, clustering is skipped and every marker is drawn on its own.
//!
//! Two grouping strategies are available (see [`ClusterStrategy`]):
//! - **Greedy**: one pass in input order. A marker joins the first group
//!   whose running centroid is within the radius on both axes.
//! - **Linked**: markers within the radius of each other are linked and the
//!   connected components become the groups.
//!
//! Both use a per-axis box test rather than a geographic distance.

use geo::{BoundingRect, Centroid, MultiPoint, Point};
use log::debug;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};

use crate::union_find::UnionFind;
use crate::{ActivityMarker, ClusterConfig, ClusterStrategy, GeoPoint, SpanExtent, Viewport};

// ============================================================================
// Types
// ============================================================================

/// A synthetic pin representing at least two nearby activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MarkerCluster {
    /// Derived from the sorted member ids, stable across recomputations
    pub id: String,
    /// Display position (mean of member coordinates)
    pub centroid: GeoPoint,
    /// Members in the order they joined
    pub members: Vec<ActivityMarker>,
    /// Bounding box size of the member coordinates
    pub extent: SpanExtent,
}

impl MarkerCluster {
    /// Number of activities behind this pin.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

/// One item for the rendering sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawItem {
    Single { marker: ActivityMarker },
    Cluster { cluster: MarkerCluster },
}

impl DrawItem {
    /// Stable render key: the marker id or the derived cluster id.
    pub fn key(&self) -> &str {
        match self {
            DrawItem::Single { marker } => &marker.id,
            DrawItem::Cluster { cluster } => &cluster.id,
        }
    }

    /// Where the pin is drawn.
    pub fn position(&self) -> GeoPoint {
        match self {
            DrawItem::Single { marker } => marker.position(),
            DrawItem::Cluster { cluster } => cluster.centroid,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, DrawItem::Cluster { .. })
    }

    /// Ids of every marker represented by this item.
    pub fn marker_ids(&self) -> Vec<&str> {
        match self {
            DrawItem::Single { marker } => vec![marker.id.as_str()],
            DrawItem::Cluster { cluster } => cluster.member_ids(),
        }
    }
}

/// Cluster id for a member set: `cluster-` followed by the sorted ids
/// joined with `-`.
/// A `-` or `\` inside an id is escaped with `\`, so distinct member
/// A `-` or `\\` inside an id is escaped with `\\`, so distinct member
/// sets never share an id. Ids without either character read as plain
/// `cluster-a-b`.
pub fn cluster_id_for<'a, I>(member_ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ids: Vec<&str> = member_ids.into_iter().collect();
    ids.sort_unstable();

    let mut key = String::from("cluster");
    for id in ids {
        key.push('-');
        for ch in id.chars() {
            if ch == '-' || ch == '\\' {
                key.push('\\');
            }
            key.push(ch);
        }
    }
    key
}

// ============================================================================
// Clustering
// ============================================================================

/// Compute draw items with the default configuration.
///
/// # Example
/// ```
/// use activity_map::{compute_draw_items, ActivityMarker, Viewport};
///
/// let markers = vec![
///     ActivityMarker::new("a", 0.0, 0.0),
///     ActivityMarker::new("b", 0.0, 0.0001),
/// ];
///
/// // Zoomed out: the two pins merge
/// let items = compute_draw_items(&markers, &Viewport::new(0.0, 0.0, 0.08, 0.08));
/// assert_eq!(items.len(), 1);
///
/// // Zoomed in: drawn individually
/// let items = compute_draw_items(&markers, &Viewport::new(0.0, 0.0, 0.01, 0.01));
/// assert_eq!(items.len(), 2);
/// ```
pub fn compute_draw_items(markers: &[ActivityMarker], viewport: &Viewport) -> Vec<DrawItem> {
    compute_draw_items_with_config(markers, viewport, &ClusterConfig::default())
}

/// Partition `markers` into single and cluster draw items for `viewport`.
///
/// Every input marker appears in exactly one output item. Coordinates are
/// not validated; NaN values propagate into centroids and extents.
pub fn compute_draw_items_with_config(
    markers: &[ActivityMarker],
    viewport: &Viewport,
    config: &ClusterConfig,
) -> Vec<DrawItem> {
    if markers.is_empty() {
        return Vec::new();
    }

    let span = viewport.effective_span(config.min_span);
    if span <= config.cluster_threshold {
        debug!(
            "[Clustering] span {:.5} at or below threshold, {} singles",
            span,
            markers.len()
        );
        return markers
            .iter()
            .map(|marker| DrawItem::Single {
                marker: marker.clone(),
            })
            .collect();
    }

    let distance_threshold = span * config.radius_factor;
    let groups = match config.strategy {
        ClusterStrategy::Greedy => greedy_groups(markers, distance_threshold),
        ClusterStrategy::Linked => linked_groups(markers, distance_threshold),
    };

    let items: Vec<DrawItem> = groups.into_iter().map(PendingGroup::into_item).collect();

    debug!(
        "[Clustering] {} markers -> {} items (span {:.5}, radius {:.5}, {:?})",
        markers.len(),
        items.len(),
        span,
        distance_threshold,
        config.strategy
    );

    items
}

/// A group under construction.
struct PendingGroup<'a> {
    centroid: GeoPoint,
    members: Vec<&'a ActivityMarker>,
}

impl<'a> PendingGroup<'a> {
    fn start(marker: &'a ActivityMarker) -> Self {
        Self {
            centroid: marker.position(),
            members: vec![marker],
        }
    }

    fn in_range(&self, marker: &ActivityMarker, threshold: f64) -> bool {
        (self.centroid.latitude - marker.latitude).abs() <= threshold
            && (self.centroid.longitude - marker.longitude).abs() <= threshold
    }

    /// Add a member and move the centroid by the running-mean update.
    fn join(&mut self, marker: &'a ActivityMarker) {
        self.members.push(marker);
        let count = self.members.len() as f64;
        self.centroid.latitude += (marker.latitude - self.centroid.latitude) / count;
        self.centroid.longitude += (marker.longitude - self.centroid.longitude) / count;
    }

    fn into_item(self) -> DrawItem {
        if self.members.len() == 1 {
            return DrawItem::Single {
                marker: self.members[0].clone(),
            };
        }

        let id = cluster_id_for(self.members.iter().map(|m| m.id.as_str()));
        let extent = bounding_extent(&self.members);

        DrawItem::Cluster {
            cluster: MarkerCluster {
                id,
                centroid: self.centroid,
                members: self.members.into_iter().cloned().collect(),
                extent,
            },
        }
    }
}

/// Single pass over the markers in input order.
fn greedy_groups(markers: &[ActivityMarker], threshold: f64) -> Vec<PendingGroup<'_>> {
    let mut groups: Vec<PendingGroup> = Vec::new();

    for marker in markers {
        match groups.iter().position(|g| g.in_range(marker, threshold)) {
            Some(idx) => groups[idx].join(marker),
            None => groups.push(PendingGroup::start(marker)),
        }
    }

    groups
}

/// Connected components of the "within threshold on both axes" relation.
///
/// Markers with non-finite coordinates cannot be indexed and stay singles.
fn linked_groups(markers: &[ActivityMarker], threshold: f64) -> Vec<PendingGroup<'_>> {
    let indexed: Vec<GeomWithData<[f64; 2], usize>> = markers
        .iter()
        .enumerate()
        .filter(|(_, m)| m.latitude.is_finite() && m.longitude.is_finite())
        .map(|(i, m)| GeomWithData::new([m.longitude, m.latitude], i))
        .collect();
    let tree = RTree::bulk_load(indexed);

    let mut uf = UnionFind::new(markers.len());
    for entry in tree.iter() {
        let [lng, lat] = *entry.geom();
        let envelope = AABB::from_corners(
            [lng - threshold, lat - threshold],
            [lng + threshold, lat + threshold],
        );
        for neighbor in tree.locate_in_envelope(&envelope) {
            if neighbor.data > entry.data {
                uf.union(entry.data, neighbor.data);
            }
        }
    }

    uf.groups()
        .into_iter()
        .map(|indices| {
            let members: Vec<&ActivityMarker> = indices.iter().map(|&i| &markers[i]).collect();
            let centroid = mean_position(&members);
            PendingGroup { centroid, members }
        })
        .collect()
}

fn to_multipoint(members: &[&ActivityMarker]) -> MultiPoint<f64> {
    members
        .iter()
        .map(|m| Point::new(m.longitude, m.latitude))
        .collect()
}

fn mean_position(members: &[&ActivityMarker]) -> GeoPoint {
    if members.len() == 1 {
        return members[0].position();
    }
    match to_multipoint(members).centroid() {
        Some(c) => GeoPoint::new(c.y(), c.x()),
        None => GeoPoint::new(f64::NAN, f64::NAN),
    }
}

/// Axis-aligned bounding box size over the member coordinates.
fn bounding_extent(members: &[&ActivityMarker]) -> SpanExtent {
    if members
        .iter()
        .any(|m| m.latitude.is_nan() || m.longitude.is_nan())
    {
        return SpanExtent::new(f64::NAN, f64::NAN);
    }
    match to_multipoint(members).bounding_rect() {
        Some(rect) => SpanExtent::new(rect.height(), rect.width()),
        None => SpanExtent::new(0.0, 0.0),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn marker(id: &str, lat: f64, lng: f64) -> ActivityMarker {
        ActivityMarker::new(id, lat, lng)
    }

    fn viewport(span: f64) -> Viewport {
        Viewport::new(0.0, 0.0, span, span)
    }

    fn linked() -> ClusterConfig {
        ClusterConfig {
            strategy: ClusterStrategy::Linked,
            ..ClusterConfig::default()
        }
    }

    fn clusters(items: &[DrawItem]) -> Vec<&MarkerCluster> {
        items
            .iter()
            .filter_map(|item| match item {
                DrawItem::Cluster { cluster } => Some(cluster),
                DrawItem::Single { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_draw_items(&[], &viewport(0.08)).is_empty());
        assert!(compute_draw_items_with_config(&[], &viewport(0.08), &linked()).is_empty());
    }

    #[test]
    fn test_single_marker() {
        let items = compute_draw_items(&[marker("a", 1.0, 2.0)], &viewport(0.5));
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], DrawItem::Single { marker } if marker.id == "a"));
    }

    #[test]
    fn test_nearby_pair_clusters_when_zoomed_out() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.0, 0.0001)];
        let items = compute_draw_items(&markers, &viewport(0.08));

        assert_eq!(items.len(), 1);
        let cluster = clusters(&items)[0];
        assert_eq!(cluster.count(), 2);
        assert_eq!(cluster.id, "cluster-a-b");
        assert!(cluster.centroid.latitude.abs() < EPS);
        assert!((cluster.centroid.longitude - 0.00005).abs() < EPS);
        assert!(cluster.extent.lat_span.abs() < EPS);
        assert!((cluster.extent.lng_span - 0.0001).abs() < EPS);
    }

    #[test]
    fn test_nearby_pair_split_when_zoomed_in() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.0, 0.0001)];
        let items = compute_draw_items(&markers, &viewport(0.01));

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.is_cluster()));
    }

    #[test]
    fn test_threshold_span_is_inclusive() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.0, 0.0001)];
        let config = ClusterConfig::default();
        let items = compute_draw_items(&markers, &viewport(config.cluster_threshold));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_zero_span_viewport_uses_floor() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.0, 0.0)];
        let items = compute_draw_items(&markers, &Viewport::new(0.0, 0.0, 0.0, 0.0));
        // Floor (0.003) is below the threshold, so nothing merges
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_largest_span_drives_radius() {
        // lng span alone is wide enough to cluster
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.01, 0.0)];
        let items = compute_draw_items(&markers, &Viewport::new(0.0, 0.0, 0.005, 0.1));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_coincident_markers_zero_extent() {
        let markers: Vec<ActivityMarker> = (0..4)
            .map(|i| marker(&format!("m{}", i), -22.9, -43.2))
            .collect();
        let items = compute_draw_items(&markers, &viewport(0.08));

        assert_eq!(items.len(), 1);
        let cluster = clusters(&items)[0];
        assert_eq!(cluster.count(), 4);
        assert_eq!(cluster.extent, SpanExtent::new(0.0, 0.0));
        assert!((cluster.centroid.latitude + 22.9).abs() < 1e-9);
    }

    #[test]
    fn test_distant_markers_stay_single() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.05, 0.0)];
        let items = compute_draw_items(&markers, &viewport(0.08));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_per_axis_box_not_radius() {
        // Diagonal offset within the threshold on both axes clusters even
        // though the straight-line distance exceeds it.
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.017, 0.017)];
        let items = compute_draw_items(&markers, &viewport(0.08));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_cluster_id_sorted() {
        assert_eq!(cluster_id_for(["z", "a", "m"]), "cluster-a-m-z");

        let forward = vec![marker("b", 0.0, 0.0), marker("a", 0.0, 0.001)];
        let reverse = vec![marker("a", 0.0, 0.001), marker("b", 0.0, 0.0)];
        let id1 = compute_draw_items(&forward, &viewport(0.08))[0].key().to_string();
        let id2 = compute_draw_items(&reverse, &viewport(0.08))[0].key().to_string();
        assert_eq!(id1, "cluster-a-b");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_cluster_id_hyphenated_ids_distinct() {
        assert_eq!(cluster_id_for(["a-b", "c"]), r"cluster-a\-b-c");
        assert_eq!(cluster_id_for(["a", "b-c"]), r"cluster-a-b\-c");
        assert_ne!(cluster_id_for([r"a\", "b"]), cluster_id_for([r"a\-b"]));

        // Two knots far apart whose plain joined ids would collide
        let markers = vec![
            marker("a-b", 0.0, 0.0),
            marker("c", 0.0, 0.001),
            marker("a", 1.0, 1.0),
            marker("b-c", 1.0, 1.001),
        ];
        let items = compute_draw_items(&markers, &viewport(0.08));
        assert_eq!(clusters(&items).len(), 2);
        assert_ne!(items[0].key(), items[1].key());
    }

    #[test]
    fn test_idempotent() {
        let markers: Vec<ActivityMarker> = (0..30)
            .map(|i| marker(&format!("m{}", i), (i % 5) as f64 * 0.004, (i / 5) as f64 * 0.006))
            .collect();
        let first = compute_draw_items(&markers, &viewport(0.08));
        let second = compute_draw_items(&markers, &viewport(0.08));
        assert_eq!(first, second);
    }

    #[test]
    fn test_greedy_is_order_dependent() {
        let a = marker("a", 0.0, 0.0);
        let b = marker("b", 0.0, 0.02);
        let c = marker("c", 0.0, 0.04);

        let forward = compute_draw_items(&[a.clone(), b.clone(), c.clone()], &viewport(0.1));
        assert_eq!(forward.len(), 2);
        assert_eq!(forward[0].key(), "cluster-a-b");
        assert_eq!(forward[1].key(), "c");

        let backward = compute_draw_items(&[c, b, a], &viewport(0.1));
        assert_eq!(backward.len(), 2);
        assert_eq!(backward[0].key(), "cluster-b-c");
        assert_eq!(backward[1].key(), "a");
    }

    #[test]
    fn test_linked_is_order_independent() {
        let a = marker("a", 0.0, 0.0);
        let b = marker("b", 0.0, 0.02);
        let c = marker("c", 0.0, 0.04);
        let far = marker("far", 1.0, 1.0);

        let forward = compute_draw_items_with_config(
            &[a.clone(), b.clone(), c.clone(), far.clone()],
            &viewport(0.1),
            &linked(),
        );
        let backward =
            compute_draw_items_with_config(&[far, c, b, a], &viewport(0.1), &linked());

        let keys = |items: &[DrawItem]| {
            let mut keys: Vec<String> = items.iter().map(|i| i.key().to_string()).collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&forward), vec!["cluster-a-b-c", "far"]);
        assert_eq!(keys(&forward), keys(&backward));

        let cluster = clusters(&forward)[0];
        assert!((cluster.centroid.longitude - 0.02).abs() < 1e-9);
        assert!((cluster.extent.lng_span - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_greedy_keeps_nan_marker_single() {
        let markers = vec![
            marker("a", 0.0, 0.0),
            marker("bad", f64::NAN, 0.0),
            marker("b", 0.0, 0.001),
            marker("worse", 0.0, f64::NAN),
        ];
        let items = compute_draw_items(&markers, &viewport(0.08));
        let keys: Vec<&str> = items.iter().map(|i| i.key()).collect();
        assert_eq!(keys, vec!["cluster-a-b", "bad", "worse"]);

        let DrawItem::Cluster { cluster } = &items[0] else {
            panic!("expected a cluster");
        };
        assert!(cluster.centroid.latitude.is_finite());
        assert!((cluster.centroid.longitude - 0.0005).abs() < EPS);
    }

    #[test]
    fn test_linked_keeps_nan_marker_single() {
        let markers = vec![
            marker("a", 0.0, 0.0),
            marker("bad", f64::NAN, 0.0),
            marker("b", 0.0, 0.001),
        ];
        let items = compute_draw_items_with_config(&markers, &viewport(0.08), &linked());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key(), "cluster-a-b");
        assert_eq!(items[1].key(), "bad");
    }

    #[test]
    fn test_draw_item_json_shape() {
        let markers = vec![marker("a", 0.0, 0.0), marker("b", 0.0, 0.0001)];
        let items = compute_draw_items(&markers, &viewport(0.08));
        let json = serde_json::to_value(&items).unwrap();

        assert_eq!(json[0]["type"], "cluster");
        assert_eq!(json[0]["cluster"]["id"], "cluster-a-b");
        assert_eq!(json[0]["cluster"]["members"].as_array().unwrap().len(), 2);

        let single = DrawItem::Single {
            marker: marker("x", 1.0, 1.0),
        };
        let json = serde_json::to_value(&single).unwrap();
        assert_eq!(json["type"], "single");
        assert_eq!(json["marker"]["id"], "x");
    }
}
