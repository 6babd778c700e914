//! Stop egress cost tables: extending a transit layer's stop→vertex
//! distance tables to stop→point tables via a built [`PointLinkage`]
//! (spec.md §4.5 "Egress distance tables").
//!
//! Built one independent table per stop with `rayon`, matching spec.md §5
//! ("Tables are built in parallel across stops").

use std::collections::HashMap;

use geo::{coord, Rect};
use rayon::prelude::*;
use street_graph::{geo::bbox_with_center, StreetLayer};

use crate::error::LinkageError;
use crate::external::{PointSet, TransitLayer};
use crate::linkage::PointLinkage;

/// For each transit stop, a compact list of `(point_index, distance_mm)`
/// pairs reachable from that stop through the linked point set (spec.md
/// glossary: "Egress cost table").
#[derive(Debug, Clone, Default)]
pub struct EgressCostTable {
    tables: Vec<Vec<(u32, i32)>>,
}

impl EgressCostTable {
    /// Extends `transit`'s `stopToVertexDistance` tables to per-stop
    /// `(pointIndex, distance)` lists via `linkage`, considering every point
    /// within `envelope_buffer_m` of each stop.
    #[must_use]
    #[tracing::instrument(skip(layer, linkage, points, transit))]
    pub fn build(layer: &StreetLayer, linkage: &PointLinkage, points: &dyn PointSet, transit: &dyn TransitLayer, envelope_buffer_m: f64) -> Self {
        let tables = (0..transit.stop_count())
            .into_par_iter()
            .map(|stop| build_one_stop(layer, linkage, points, transit, stop, envelope_buffer_m))
            .collect();
        Self { tables }
    }

    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.tables.len()
    }

    /// The `(pointIndex, distanceMillimeters)` pairs reachable from `stop`.
    ///
    /// # Errors
    /// Returns [`LinkageError::StopOutOfRange`] if `stop_index` is not a
    /// valid stop in this table.
    pub fn for_stop(&self, stop_index: usize) -> Result<&[(u32, i32)], LinkageError> {
        self.tables
            .get(stop_index)
            .map(Vec::as_slice)
            .ok_or(LinkageError::StopOutOfRange(stop_index, self.tables.len()))
    }

    /// Slices every stop's table down to the points named by
    /// `old_to_new_point_index` (a cropped point set's remapping) without
    /// recomputing any distance (spec.md §4.5: cropping a linkage "existing
    /// tables are simply sliced without recomputation").
    #[must_use]
    pub fn remap_points(&self, old_to_new_point_index: &HashMap<usize, usize>) -> Self {
        let tables = self
            .tables
            .iter()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|&(point_index, distance_mm)| {
                        old_to_new_point_index
                            .get(&(point_index as usize))
                            .map(|&new_index| (u32::try_from(new_index).expect("point index overflow"), distance_mm))
                    })
                    .collect()
            })
            .collect();
        Self { tables }
    }
}

fn build_one_stop(
    layer: &StreetLayer,
    linkage: &PointLinkage,
    points: &dyn PointSet,
    transit: &dyn TransitLayer,
    stop: usize,
    buffer_m: f64,
) -> Vec<(u32, i32)> {
    let center = geo::Point::new(transit.stop_lon(stop), transit.stop_lat(stop));
    let (north, east, south, west) = bbox_with_center(center, buffer_m);
    let envelope = Rect::new(coord! {x: west, y: south}, coord! {x: east, y: north});

    let mut reachable = Vec::new();
    for point_index in points.indices_in_envelope(envelope) {
        let Some(edge) = linkage.edge(point_index) else { continue };
        let view = layer.edges().read(edge);
        let distance_to_edge = linkage.distance_to_edge_mm(point_index);

        let via_from = transit
            .stop_to_vertex_distance_mm(stop, view.from_vertex())
            .map(|d| d + linkage.distance0_mm(point_index) + distance_to_edge);
        let via_to = transit
            .stop_to_vertex_distance_mm(stop, view.to_vertex())
            .map(|d| d + linkage.distance1_mm(point_index) + distance_to_edge);

        let best = match (via_from, via_to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        if let Some(distance_mm) = best {
            reachable.push((u32::try_from(point_index).expect("point index overflow"), distance_mm));
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use street_graph::{BuilderConfig, EdgeFlag, StreetClass, StreetMode, VertexIndex};

    struct OnePoint {
        lat: f64,
        lon: f64,
    }

    impl PointSet for OnePoint {
        fn len(&self) -> usize {
            1
        }
        fn lat(&self, _index: usize) -> f64 {
            self.lat
        }
        fn lon(&self, _index: usize) -> f64 {
            self.lon
        }
    }

    struct OneStop {
        stop_lat: f64,
        stop_lon: f64,
        vertex: VertexIndex,
        distance_mm: i32,
    }

    impl TransitLayer for OneStop {
        fn stop_count(&self) -> usize {
            1
        }
        fn stop_to_street_vertex(&self, _stop_index: usize) -> VertexIndex {
            self.vertex
        }
        fn stop_to_vertex_distance_mm(&self, _stop_index: usize, vertex: VertexIndex) -> Option<i32> {
            (vertex == self.vertex).then_some(self.distance_mm)
        }
        fn stop_lat(&self, _stop_index: usize) -> f64 {
            self.stop_lat
        }
        fn stop_lon(&self, _stop_index: usize) -> f64 {
            self.stop_lon
        }
    }

    /// Spec.md §8 scenario 6: a stop's precomputed distance to a vertex,
    /// plus a linked point's along-edge and perpendicular distances from
    /// that same vertex, must sum to exactly the egress distance.
    #[test]
    fn egress_distance_sums_stop_to_vertex_plus_linkage_distances() {
        let mut layer = StreetLayer::new(BuilderConfig::default());
        let v = layer.add_vertex(0.0, 0.0);
        let far = layer.add_vertex(0.0, 0.01);
        let pair = layer.add_edge_pair(v, far, 100_000, 1, StreetClass::Local).unwrap();
        layer.edge_cursor(pair.forward()).set_flag(EdgeFlag::AllowsPedestrian);
        layer.edge_cursor(pair.backward()).set_flag(EdgeFlag::AllowsPedestrian);
        layer.freeze();

        let point = OnePoint { lat: 0.0000451, lon: 0.00027 };
        let linkage = PointLinkage::build(&layer, &point, StreetMode::Walk, 100.0);
        let edge = linkage.edge(0).expect("point should link to the street");
        assert_eq!(layer.edges().read(edge).from_vertex(), v);

        let stop = OneStop { stop_lat: 0.0, stop_lon: 0.0, vertex: v, distance_mm: 50_000 };
        let table = EgressCostTable::build(&layer, &linkage, &point, &stop, 1000.0);

        let entries = table.for_stop(0).unwrap();
        assert_eq!(entries.len(), 1);
        let (point_index, distance_mm) = entries[0];
        assert_eq!(point_index, 0);
        let expected = 50_000 + linkage.distance0_mm(0) + linkage.distance_to_edge_mm(0);
        assert_eq!(distance_mm, expected);
    }

    #[test]
    fn remap_points_drops_entries_outside_the_crop() {
        let mut table = EgressCostTable::default();
        table.tables.push(vec![(0, 100), (3, 200), (5, 300)]);
        let mut remap = HashMap::new();
        remap.insert(3, 0);
        remap.insert(5, 1);
        let cropped = table.remap_points(&remap);
        assert_eq!(cropped.for_stop(0).unwrap(), &[(0, 200), (1, 300)]);
    }

    #[test]
    fn for_stop_rejects_an_out_of_range_stop() {
        let table = EgressCostTable::default();
        assert!(matches!(table.for_stop(0), Err(LinkageError::StopOutOfRange(0, 0))));
    }
}
