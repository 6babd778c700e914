//! Non-destructive projection of an external point set onto a street graph
//! (spec.md §4.5).
//!
//! Grounded on `street_graph::street_layer::StreetLayer::find_split` (the
//! same nearest-edge projection spec.md's `findSplit` performs for a single
//! point), itself grounded on `dt-spatial`'s `RTree`-backed nearest-node
//! search (`gabemgem-rust_dt`, not the teacher's `valinor-map-match` — see
//! `DESIGN.md`); this module's addition is doing that search for an entire
//! indexed point set, in parallel, with the scenario-aware relink-subset
//! optimization.

use rayon::prelude::*;
use rstar::AABB;
use street_graph::{geo::bbox_with_center, EdgeIndex, StreetLayer, StreetMode, VertexIndex};

use crate::error::LinkageError;
use crate::external::PointSet;

/// One point's projection onto the graph, or the "unlinked" state (spec.md
/// §4.5's `edge[i] = -1`).
#[derive(Debug, Clone, Copy, Default)]
struct LinkedPoint {
    edge: Option<EdgeIndex>,
    distance_to_edge_mm: i32,
    distance0_mm: i32,
    distance1_mm: i32,
}

/// Four parallel arrays recording, for every point in some (point-set,
/// graph, mode) triple, the edge it was projected onto and the three
/// distances spec.md's glossary entry for "Split" names (spec.md §4.5
/// "State").
#[derive(Debug, Clone)]
pub struct PointLinkage {
    mode: StreetMode,
    link_radius_m: f64,
    points: Vec<LinkedPoint>,
}

impl PointLinkage {
    /// Links every point in `points` against `layer` fresh — the path taken
    /// when "no base linkage is provided" (spec.md §4.5).
    #[must_use]
    #[tracing::instrument(skip(layer, points))]
    pub fn build(layer: &StreetLayer, points: &dyn PointSet, mode: StreetMode, link_radius_m: f64) -> Self {
        let n = points.len();
        let linked: Vec<LinkedPoint> = (0..n).into_par_iter().map(|i| link_one(layer, points, i, mode, link_radius_m)).collect();
        let unlinked_count = linked.iter().filter(|p| p.edge.is_none()).count();
        if unlinked_count > 0 {
            tracing::debug!(unlinked_count, total = n, "point linkage left some points unlinked");
        }
        Self { mode, link_radius_m, points: linked }
    }

    /// Derives a linkage for `layer` (a scenario extending the baseline
    /// `base` was built against) by relinking only the points spec.md §4.5
    /// calls out: those whose stored edge the scenario deleted, or that lie
    /// within the buffered envelope of geometry the scenario appended.
    /// Every other point is copied from `base` unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LinkageError::MismatchedPointCount`] if `points` isn't the
    /// same point set `base` was built against (same length).
    #[tracing::instrument(skip(layer, points, base))]
    pub fn rebuild_on_scenario(layer: &StreetLayer, points: &dyn PointSet, base: &Self) -> Result<Self, LinkageError> {
        if points.len() != base.points.len() {
            return Err(LinkageError::MismatchedPointCount { base_len: base.points.len(), current_len: points.len() });
        }
        let relinked_count = std::sync::atomic::AtomicUsize::new(0);
        let linked: Vec<LinkedPoint> = (0..points.len())
            .into_par_iter()
            .map(|i| {
                let prior = base.points[i];
                let needs_relink = prior.edge.is_some_and(|e| layer.is_deleted(e)) || point_near_scenario_addition(layer, points, i, base.link_radius_m);
                if needs_relink {
                    relinked_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    link_one(layer, points, i, base.mode, base.link_radius_m)
                } else {
                    prior
                }
            })
            .collect();
        tracing::debug!(
            relinked = relinked_count.load(std::sync::atomic::Ordering::Relaxed),
            total = points.len(),
            "scenario point linkage relinked a subset of the baseline's points"
        );
        Ok(Self { mode: base.mode, link_radius_m: base.link_radius_m, points: linked })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn mode(&self) -> StreetMode {
        self.mode
    }

    #[must_use]
    pub fn edge(&self, point_index: usize) -> Option<EdgeIndex> {
        self.points[point_index].edge
    }

    #[must_use]
    pub fn distance_to_edge_mm(&self, point_index: usize) -> i32 {
        self.points[point_index].distance_to_edge_mm
    }

    #[must_use]
    pub fn distance0_mm(&self, point_index: usize) -> i32 {
        self.points[point_index].distance0_mm
    }

    #[must_use]
    pub fn distance1_mm(&self, point_index: usize) -> i32 {
        self.points[point_index].distance1_mm
    }

    /// Evaluates per-point travel times given a reached-vertex travel-time
    /// function, an on-street speed (defaulting to the linked edge's own
    /// speed), and an off-street (walking, perpendicular) speed — all in
    /// millimeters per second, matching the distances this struct stores
    /// (spec.md §4.5 "Evaluation (eval)").
    ///
    /// For each point, both endpoints of its linked edge are considered;
    /// the off-street perpendicular component is added to each, then the
    /// remaining along-edge component at `on_street_speed_mm_per_s`, and the
    /// smaller total wins. A point with neither endpoint reachable, or with
    /// no linked edge at all, is unreachable (`None`).
    #[must_use]
    pub fn eval(
        &self,
        layer: &StreetLayer,
        travel_time_at_vertex: impl Fn(VertexIndex) -> Option<f64>,
        on_street_speed_mm_per_s: Option<f64>,
        off_street_speed_mm_per_s: f64,
    ) -> Vec<Option<f64>> {
        (0..self.points.len())
            .map(|i| self.eval_one(layer, i, &travel_time_at_vertex, on_street_speed_mm_per_s, off_street_speed_mm_per_s))
            .collect()
    }

    fn eval_one(
        &self,
        layer: &StreetLayer,
        point_index: usize,
        travel_time_at_vertex: &impl Fn(VertexIndex) -> Option<f64>,
        on_street_speed_mm_per_s: Option<f64>,
        off_street_speed_mm_per_s: f64,
    ) -> Option<f64> {
        let point = self.points[point_index];
        let edge = point.edge?;
        let view = layer.edges().read(edge);
        let on_speed = on_street_speed_mm_per_s.unwrap_or_else(|| view.speed_mps() * 1000.0).max(1e-6);
        let off_speed = off_street_speed_mm_per_s.max(1e-6);
        let off_component_s = f64::from(point.distance_to_edge_mm) / off_speed;

        let via_from = travel_time_at_vertex(view.from_vertex()).map(|t| t + off_component_s + f64::from(point.distance0_mm) / on_speed);
        let via_to = travel_time_at_vertex(view.to_vertex()).map(|t| t + off_component_s + f64::from(point.distance1_mm) / on_speed);

        match (via_from, via_to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    /// Slices this linkage down to `indices` without recomputing anything
    /// (spec.md §4.5: "when cropping a linkage to a sub-area of a gridded
    /// point set, existing tables are simply sliced without recomputation").
    ///
    /// # Errors
    /// Returns [`LinkageError::PointOutOfRange`] if any entry of `indices`
    /// is not a valid point in this linkage.
    pub fn restrict_to(&self, indices: &[usize]) -> Result<Self, LinkageError> {
        let points = indices
            .iter()
            .map(|&i| self.points.get(i).copied().ok_or(LinkageError::PointOutOfRange(i, self.points.len())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mode: self.mode, link_radius_m: self.link_radius_m, points })
    }
}

/// Projects one point onto the graph, returning the unlinked sentinel if
/// [`StreetLayer::find_split`] finds nothing within `radius_m` (spec.md §7:
/// "resolution-failure... the calling linkage assigns edge = -1 for that
/// point. No exception").
fn link_one(layer: &StreetLayer, points: &dyn PointSet, index: usize, mode: StreetMode, radius_m: f64) -> LinkedPoint {
    let Some(split) = layer.find_split(points.lat(index), points.lon(index), radius_m, mode) else {
        return LinkedPoint::default();
    };
    LinkedPoint {
        edge: Some(split.edge),
        distance_to_edge_mm: split.distance_to_edge_mm,
        distance0_mm: split.distance0_mm,
        distance1_mm: split.distance1_mm,
    }
}

/// Whether `points[index]` falls within `radius_m` of any edge appended by
/// this scenario specifically (not the shared baseline), the buffered
/// bounding-geometry test spec.md §4.5 names for the relink-subset
/// optimization.
fn point_near_scenario_addition(layer: &StreetLayer, points: &dyn PointSet, index: usize, radius_m: f64) -> bool {
    let (lat, lon) = (points.lat(index), points.lon(index));
    let center = geo::Point::new(lon, lat);
    let (north, east, south, west) = bbox_with_center(center, radius_m);
    let envelope = AABB::from_corners([west, south], [east, north]);
    layer.scenario_edges_in_envelope(envelope).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use street_graph::{BuilderConfig, EdgeFlag, StreetClass};

    struct SinglePoint {
        lat: f64,
        lon: f64,
    }

    impl PointSet for SinglePoint {
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

    fn straight_street() -> (StreetLayer, VertexIndex, VertexIndex) {
        let mut layer = StreetLayer::new(BuilderConfig::default());
        let a = layer.add_vertex(0.0, 0.0);
        let b = layer.add_vertex(0.0, 0.001_797_3); // ~200m east at the equator
        let pair = layer.add_edge_pair(a, b, 200_000, 1, StreetClass::Local).unwrap();
        layer.edge_cursor(pair.forward()).set_flag(EdgeFlag::AllowsPedestrian);
        layer.edge_cursor(pair.backward()).set_flag(EdgeFlag::AllowsPedestrian);
        layer.freeze();
        (layer, a, b)
    }

    #[test]
    fn build_links_a_point_near_the_edge() {
        let (layer, a, b) = straight_street();
        let points = SinglePoint { lat: 0.00002, lon: 0.000_898_65 }; // near the midpoint
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
        let edge = linkage.edge(0).expect("point should link");
        let view = layer.edges().read(edge);
        assert!((view.from_vertex() == a && view.to_vertex() == b) || (view.from_vertex() == b && view.to_vertex() == a));
        assert!((linkage.distance0_mm(0) - linkage.distance1_mm(0)).abs() < 2000);
    }

    #[test]
    fn build_leaves_a_far_point_unlinked() {
        let (layer, _a, _b) = straight_street();
        let points = SinglePoint { lat: 10.0, lon: 10.0 };
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
        assert!(linkage.edge(0).is_none());
    }

    #[test]
    fn rebuild_on_scenario_relinks_only_points_near_a_splitter_vertex() {
        let (baseline, _a, _b) = straight_street();
        let points = SinglePoint { lat: 0.00002, lon: 0.000_898_65 };
        let base_linkage = PointLinkage::build(&baseline, &points, StreetMode::Walk, 50.0);
        let base_edge = base_linkage.edge(0).unwrap();

        let mut scenario = baseline.extend();
        scenario.get_or_create_vertex_near(0.0, 0.000_898_65, StreetMode::Walk).unwrap();

        let relinked = PointLinkage::rebuild_on_scenario(&scenario, &points, &base_linkage).unwrap();
        let new_edge = relinked.edge(0).expect("point should still link after the scenario splits its edge");
        assert_ne!(new_edge, base_edge, "the point's original edge was deleted by the scenario, so it must relink");
        assert!(!scenario.is_deleted(new_edge));
    }

    #[test]
    fn eval_takes_the_minimum_over_both_endpoints() {
        let (layer, a, b) = straight_street();
        let points = SinglePoint { lat: 0.0, lon: 0.000_898_65 }; // midpoint, on the line
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);

        let times = linkage.eval(
            &layer,
            |v| if v == a { Some(0.0) } else if v == b { Some(1000.0) } else { None },
            Some(1000.0), // 1 m/s on-street
            1000.0,       // 1 m/s off-street
        );
        let time = times[0].expect("midpoint should be reachable via a");
        assert!((time - 100.0).abs() < 1.0, "expected ~100s via the nearer endpoint a, got {time}");
    }

    #[test]
    fn eval_is_unreachable_when_neither_endpoint_is_reached() {
        let (layer, _a, _b) = straight_street();
        let points = SinglePoint { lat: 0.0, lon: 0.000_898_65 };
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
        let times = linkage.eval(&layer, |_| None, None, 1000.0);
        assert!(times[0].is_none());
    }

    #[test]
    fn restrict_to_slices_without_recomputing() {
        let (layer, _a, _b) = straight_street();
        let points = SinglePoint { lat: 0.00002, lon: 0.000_898_65 };
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
        let cropped = linkage.restrict_to(&[0]).unwrap();
        assert_eq!(cropped.len(), 1);
        assert_eq!(cropped.edge(0), linkage.edge(0));
    }

    #[test]
    fn restrict_to_rejects_an_out_of_range_point() {
        let (layer, _a, _b) = straight_street();
        let points = SinglePoint { lat: 0.00002, lon: 0.000_898_65 };
        let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
        assert!(matches!(linkage.restrict_to(&[5]), Err(LinkageError::PointOutOfRange(5, 1))));
    }

    proptest! {
        #[test]
        fn along_edge_distances_sum_to_the_edge_length(t in 0.05f64..0.95) {
            let (layer, _a, _b) = straight_street();
            let points = SinglePoint { lat: 0.00002, lon: t * 0.001_797_3 };
            let linkage = PointLinkage::build(&layer, &points, StreetMode::Walk, 50.0);
            let edge = linkage.edge(0).expect("point near the line should always link");
            let length_mm = i64::from(layer.edges().read(edge).length_mm());
            let sum = i64::from(linkage.distance0_mm(0)) + i64::from(linkage.distance1_mm(0));
            prop_assert!((sum - length_mm).abs() <= 2000, "distance0+distance1 ({sum}) should track the edge length ({length_mm})");
        }
    }
}
