//! Map viewport and the viewport change filter.
//!
//! Map callbacks fire with tiny floating-point deltas on every frame of an
//! inertial scroll. [`is_material_change`] tells the caller whether a proposed
//! viewport is worth adopting.

use serde::{Deserialize, Serialize};

use crate::{ClusterConfig, GeoPoint, SpanExtent};

/// Visible map region: center plus angular span per axis (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lng: f64,
    pub lat_span: f64,
    pub lng_span: f64,
}

impl Viewport {
    pub fn new(center_lat: f64, center_lng: f64, lat_span: f64, lng_span: f64) -> Self {
        Self {
            center_lat,
            center_lng,
            lat_span,
            lng_span,
        }
    }

    /// Build a viewport centered on `center` with the given spans.
    pub fn around(center: GeoPoint, spans: SpanExtent) -> Self {
        Self::new(
            center.latitude,
            center.longitude,
            spans.lat_span,
            spans.lng_span,
        )
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_lat, self.center_lng)
    }

    pub fn spans(&self) -> SpanExtent {
        SpanExtent::new(self.lat_span, self.lng_span)
    }

    /// Copy with both spans raised to at least `min_span`.
    pub fn normalized(&self, min_span: f64) -> Self {
        Self {
            lat_span: self.lat_span.max(min_span),
            lng_span: self.lng_span.max(min_span),
            ..*self
        }
    }

    /// Larger of the two spans, floored at `min_span`.
    pub fn effective_span(&self, min_span: f64) -> f64 {
        self.lat_span.max(self.lng_span).max(min_span)
    }

    /// Whether `point` falls inside the visible region (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (point.latitude - self.center_lat).abs() <= self.lat_span / 2.0
            && (point.longitude - self.center_lng).abs() <= self.lng_span / 2.0
    }
}

/// Whether `b` differs from `a` enough to warrant a state update, using the
/// default epsilon.
pub fn is_material_change(a: &Viewport, b: &Viewport) -> bool {
    is_material_change_with_epsilon(a, b, ClusterConfig::default().change_epsilon)
}

/// True if any of the four fields differs by more than `epsilon`.
///
/// NaN differences never count as material, which keeps the check reflexive
/// for every input.
pub fn is_material_change_with_epsilon(a: &Viewport, b: &Viewport, epsilon: f64) -> bool {
    let deltas = [
        a.center_lat - b.center_lat,
        a.center_lng - b.center_lng,
        a.lat_span - b.lat_span,
        a.lng_span - b.lng_span,
    ];
    deltas.iter().any(|d| d.abs() > epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rio() -> Viewport {
        Viewport::new(-22.9, -43.2, 0.08, 0.08)
    }

    #[test]
    fn test_reflexive() {
        let v = rio();
        assert!(!is_material_change(&v, &v));

        let odd = Viewport::new(f64::NAN, 0.0, 0.0, 1e9);
        assert!(!is_material_change(&odd, &odd));
    }

    #[test]
    fn test_symmetric() {
        let a = rio();
        let b = Viewport::new(-22.9, -43.2002, 0.08, 0.08);
        assert_eq!(is_material_change(&a, &b), is_material_change(&b, &a));
        assert!(is_material_change(&a, &b));
    }

    #[test]
    fn test_jitter_suppressed() {
        let a = rio();
        let b = Viewport::new(-22.900001, -43.200004, 0.080002, 0.079999);
        assert!(!is_material_change(&a, &b));
    }

    #[test]
    fn test_each_field_counts() {
        let a = rio();
        let fields = [
            Viewport { center_lat: -22.91, ..a },
            Viewport { center_lng: -43.19, ..a },
            Viewport { lat_span: 0.05, ..a },
            Viewport { lng_span: 0.05, ..a },
        ];
        for b in fields {
            assert!(is_material_change(&a, &b), "{:?} should be material", b);
        }
    }

    #[test]
    fn test_normalized_and_effective_span() {
        let v = Viewport::new(0.0, 0.0, 0.0, 0.001);
        let n = v.normalized(0.003);
        assert_eq!(n.lat_span, 0.003);
        assert_eq!(n.lng_span, 0.003);
        assert_eq!(v.effective_span(0.003), 0.003);

        let wide = Viewport::new(0.0, 0.0, 0.02, 0.05);
        assert_eq!(wide.effective_span(0.003), 0.05);
    }

    #[test]
    fn test_contains() {
        let v = rio();
        assert!(v.contains(&GeoPoint::new(-22.9, -43.2)));
        assert!(v.contains(&GeoPoint::new(-22.87, -43.23)));
        assert!(!v.contains(&GeoPoint::new(-22.8, -43.2)));
    }
}
