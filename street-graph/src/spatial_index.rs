//! R-tree spatial index over forward edges, used by both the baseline
//! `StreetLayer` and each scenario's temporary index.
//!
//! Grounded on `dt-spatial`'s `RoadNetwork` (`gabemgem-rust_dt`), which
//! builds an `rstar::RTree` over road nodes and answers nearest/k-nearest
//! queries around a point the same way this index answers nearest-edge
//! queries.

use geo::{Coord, Rect};
use rstar::{RTreeObject, AABB};

use crate::indices::EdgeIndex;

/// The piece of an edge's geometry the spatial index actually indexes: its
/// envelope plus the forward edge index it belongs to. Always built from a
/// *forward* edge — queries map results back to whichever direction a
/// caller asked about.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EdgeEnvelope {
    pub edge: EdgeIndex,
    pub envelope: Rect<f64>,
}

impl EdgeEnvelope {
    #[must_use]
    pub fn new(edge: EdgeIndex, envelope: Rect<f64>) -> Self {
        debug_assert!(!edge.is_backward(), "the spatial index only ever holds forward edges");
        Self { edge, envelope }
    }
}

impl RTreeObject for EdgeEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let min = self.envelope.min();
        let max = self.envelope.max();
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    }
}

/// Distance from a query point to an envelope's nearest corner/edge,
/// used to order candidates before the exact perpendicular-projection
/// check is done against each edge's real geometry.
#[must_use]
pub fn envelope_distance_squared(envelope: &Rect<f64>, point: Coord<f64>) -> f64 {
    let min = envelope.min();
    let max = envelope.max();
    let dx = if point.x < min.x {
        min.x - point.x
    } else if point.x > max.x {
        point.x - max.x
    } else {
        0.0
    };
    let dy = if point.y < min.y {
        min.y - point.y
    } else if point.y > max.y {
        point.y - max.y
    } else {
        0.0
    };
    dx.mul_add(dx, dy * dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indices::EdgePairIndex;
    use geo::coord;

    #[test]
    fn envelope_distance_is_zero_inside_the_box() {
        let envelope = Rect::new(coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0});
        assert_eq!(envelope_distance_squared(&envelope, coord! {x: 0.5, y: 0.5}), 0.0);
    }

    #[test]
    fn envelope_distance_measures_from_nearest_corner() {
        let envelope = Rect::new(coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0});
        let dist_sq = envelope_distance_squared(&envelope, coord! {x: 2.0, y: 2.0});
        assert!((dist_sq - 2.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "forward edges")]
    fn edge_envelope_rejects_backward_edges_in_debug() {
        let envelope = Rect::new(coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 1.0});
        let _ = EdgeEnvelope::new(EdgePairIndex::new(0).backward(), envelope);
    }
}
