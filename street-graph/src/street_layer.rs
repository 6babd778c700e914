//! `StreetLayer`: owns the vertex/edge stores, the spatial index, and the
//! turn-restriction tables; exposes point-to-street linkage (`find_split`,
//! `get_or_create_vertex_near`) and the scenario extend-only copy mechanism.
//!
//! Grounded on the teacher's `GraphTileBuilder` (the `Cow`-based lazy-copy
//! tile builder) for the extend-only overlay, and on `dt-spatial`'s
//! `RTree`-backed nearest-node search (`gabemgem-rust_dt`) for `find_split`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use enumset::EnumSet;
use geo::{coord, Coord, Distance, Haversine, Point};
use rstar::{RTree, AABB};

use crate::edge_store::EdgeStore;
use crate::error::GraphError;
use crate::flags::{EdgeFlag, StreetClass, StreetMode};
use crate::geo::{bbox_with_center, DistanceApproximator, FixedDegrees};
use crate::indices::{EdgeIndex, EdgePairIndex, VertexIndex};
use crate::spatial_index::EdgeEnvelope;
use crate::turn_restriction::{TurnRestriction, TurnRestrictionTable};
use crate::vertex_store::VertexStore;

/// Constructor parameters spec.md §6 calls out as programmatic configuration
/// (no env vars, no CLI — consistent with this crate's Non-goal on CLI/web
/// surfaces).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuilderConfig {
    /// Distance below which `get_or_create_vertex_near` snaps to an existing
    /// endpoint instead of splitting (meters).
    pub snap_radius_m: f64,
    /// The small-radius probe `find_split` tries before the caller's radius.
    pub link_radius_default_m: f64,
    /// The largest radius `find_split`/linkage callers are expected to ask for.
    pub link_radius_max_m: f64,
    /// Below this many reachable vertices, a connected component is
    /// considered a disconnected sliver (consumed by the external builder
    /// when deciding whether to keep a component; this crate only carries
    /// the constant).
    pub min_subgraph_size: usize,
    pub default_speed_kmh: f64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            snap_radius_m: 5.0,
            link_radius_default_m: 300.0,
            link_radius_max_m: 1600.0,
            min_subgraph_size: 40,
            default_speed_kmh: 50.0,
        }
    }
}

/// The projection of a geographic point onto the nearest traversable edge
/// (spec.md §4.3, §GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Always a forward edge index; the two distances below are given
    /// relative to `vertex0`/`vertex1`, i.e. the forward direction's sense.
    pub edge: EdgeIndex,
    pub segment: usize,
    pub fixed_lat: FixedDegrees,
    pub fixed_lon: FixedDegrees,
    pub distance_to_edge_mm: i32,
    pub distance0_mm: i32,
    pub distance1_mm: i32,
    pub vertex0: VertexIndex,
    pub vertex1: VertexIndex,
}

/// Per-vertex outgoing/incoming directed-edge lists ("forward star"),
/// extend-only in the same spirit as the column stores: a frozen,
/// `Arc`-shared base plus a per-scenario overlay keyed by vertex, since an
/// appended edge may attach to a vertex that already existed in the
/// baseline (e.g. splitting a baseline edge leaves its two original
/// endpoints with one new adjacency entry each).
#[derive(Debug, Clone, Default)]
struct Adjacency {
    base_outgoing: Arc<Vec<Vec<EdgeIndex>>>,
    base_incoming: Arc<Vec<Vec<EdgeIndex>>>,
    extra_outgoing: HashMap<VertexIndex, Vec<EdgeIndex>>,
    extra_incoming: HashMap<VertexIndex, Vec<EdgeIndex>>,
}

impl Adjacency {
    fn push_pair(&mut self, from: VertexIndex, to: VertexIndex, pair: EdgePairIndex) {
        self.extra_outgoing.entry(from).or_default().push(pair.forward());
        self.extra_incoming.entry(to).or_default().push(pair.forward());
        self.extra_outgoing.entry(to).or_default().push(pair.backward());
        self.extra_incoming.entry(from).or_default().push(pair.backward());
    }

    fn outgoing(&self, v: VertexIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        let base = self.base_outgoing.get(v.as_usize()).map(Vec::as_slice).unwrap_or(&[]);
        let extra = self.extra_outgoing.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        base.iter().chain(extra.iter()).copied()
    }

    fn incoming(&self, v: VertexIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        let base = self.base_incoming.get(v.as_usize()).map(Vec::as_slice).unwrap_or(&[]);
        let extra = self.extra_incoming.get(&v).map(Vec::as_slice).unwrap_or(&[]);
        base.iter().chain(extra.iter()).copied()
    }

    /// Merges the overlay into a freshly `Arc`-wrapped base, so future
    /// scenarios extend from a zero-copy-shareable snapshot. Called once,
    /// when a baseline `StreetLayer` finishes building.
    fn freeze(&mut self, vertex_count: usize) {
        let mut outgoing = Arc::try_unwrap(std::mem::take(&mut self.base_outgoing)).unwrap_or_else(|arc| (*arc).clone());
        let mut incoming = Arc::try_unwrap(std::mem::take(&mut self.base_incoming)).unwrap_or_else(|arc| (*arc).clone());
        outgoing.resize(vertex_count, Vec::new());
        incoming.resize(vertex_count, Vec::new());
        for (v, edges) in self.extra_outgoing.drain() {
            outgoing[v.as_usize()].extend(edges);
        }
        for (v, edges) in self.extra_incoming.drain() {
            incoming[v.as_usize()].extend(edges);
        }
        self.base_outgoing = Arc::new(outgoing);
        self.base_incoming = Arc::new(incoming);
    }

    fn extend_from(&self) -> Self {
        Self {
            base_outgoing: Arc::clone(&self.base_outgoing),
            base_incoming: Arc::clone(&self.base_incoming),
            extra_outgoing: HashMap::new(),
            extra_incoming: HashMap::new(),
        }
    }
}

/// The column-oriented street graph store: vertices, directed-edge pairs,
/// turn restrictions, and a spatial index of forward edges.
///
/// A baseline `StreetLayer` is built by repeated `add_vertex`/`add_edge_pair`
/// calls, then frozen with [`Self::freeze`]. A frozen layer can be shared
/// (wrap it in `Arc`) across as many concurrent [`Self::extend`]ed scenarios
/// and routers as needed — nothing here is ever mutated in place below the
/// frozen boundary again.
#[derive(Debug, Clone)]
pub struct StreetLayer {
    vertices: VertexStore,
    edges: EdgeStore,
    turn_restrictions: Arc<TurnRestrictionTable>,
    reverse_turn_restrictions: Arc<TurnRestrictionTable>,
    spatial_index: Arc<RTree<EdgeEnvelope>>,
    temp_index: RTree<EdgeEnvelope>,
    adjacency: Adjacency,
    temporarily_deleted: HashSet<EdgeIndex>,
    config: Arc<BuilderConfig>,
    pending_restrictions: Vec<TurnRestriction>,
}

impl StreetLayer {
    #[must_use]
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            vertices: VertexStore::new(),
            edges: EdgeStore::new(),
            turn_restrictions: Arc::new(TurnRestrictionTable::default()),
            reverse_turn_restrictions: Arc::new(TurnRestrictionTable::default()),
            spatial_index: Arc::new(RTree::new()),
            temp_index: RTree::new(),
            adjacency: Adjacency::default(),
            temporarily_deleted: HashSet::new(),
            config: Arc::new(config),
            pending_restrictions: Vec::new(),
        }
    }

    #[must_use]
    pub fn vertices(&self) -> &VertexStore {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    /// A read/write cursor onto one directed edge, for builders setting
    /// flags/speed/geometry while a baseline is still under construction (or
    /// while a scenario is appending its own new pairs). Panics the same way
    /// [`EdgeStore::cursor`] does if `edge` falls below the frozen baseline
    /// boundary — rewriting a frozen baseline edge in place is a programmer
    /// error (spec.md §7).
    pub fn edge_cursor(&mut self, edge: EdgeIndex) -> crate::edge_store::EdgeCursor<'_> {
        self.edges.cursor(edge)
    }

    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    #[must_use]
    pub fn turn_restrictions(&self) -> &TurnRestrictionTable {
        &self.turn_restrictions
    }

    #[must_use]
    pub fn reverse_turn_restrictions(&self) -> &TurnRestrictionTable {
        &self.reverse_turn_restrictions
    }

    /// True for a scenario-derived copy, false for an original baseline
    /// build still under construction or already frozen (spec.md §4.2).
    #[must_use]
    pub fn is_extend_only_copy(&self) -> bool {
        self.vertices.base_len() > 0
    }

    pub fn add_vertex(&mut self, lat: f64, lon: f64) -> VertexIndex {
        self.vertices.add_vertex(lat, lon)
    }

    pub fn add_vertex_fixed(&mut self, lat: FixedDegrees, lon: FixedDegrees) -> VertexIndex {
        self.vertices.add_vertex_fixed(lat, lon)
    }

    /// Appends a new edge pair and registers it in the adjacency overlay.
    /// Errors (spec.md §7, "input-range") are the caller's to log and skip;
    /// they never abort the rest of a build.
    pub fn add_edge_pair(
        &mut self,
        from: VertexIndex,
        to: VertexIndex,
        length_mm: i64,
        osm_way_id: i64,
        street_class: StreetClass,
    ) -> Result<EdgePairIndex, GraphError> {
        if from.as_usize() >= self.vertices.len() {
            return Err(GraphError::VertexOutOfRange(from));
        }
        if to.as_usize() >= self.vertices.len() {
            return Err(GraphError::VertexOutOfRange(to));
        }
        let cursor = self.edges.add_edge_pair(from, to, length_mm, osm_way_id, street_class)?;
        let pair = cursor.pair_index();
        drop(cursor);
        self.adjacency.push_pair(from, to, pair);
        Ok(pair)
    }

    /// Registers a turn restriction. Per spec.md §7 ("topology" errors), a
    /// restriction naming an edge that doesn't exist is dropped with a
    /// warning rather than failing the whole build.
    pub fn add_turn_restriction(&mut self, restriction: TurnRestriction) {
        let edge_count = self.edges.edge_count();
        let in_range = |e: EdgeIndex| e.as_usize() < edge_count;
        if !in_range(restriction.from_edge)
            || !in_range(restriction.to_edge)
            || !restriction.via_edges.iter().copied().all(in_range)
        {
            tracing::warn!(
                from = %restriction.from_edge,
                to = %restriction.to_edge,
                "dropping turn restriction referencing a non-existent edge"
            );
            return;
        }
        self.pending_restrictions.push(restriction);
    }

    /// Finalizes a baseline build: compacts every column into a frozen,
    /// `Arc`-shareable base, builds the spatial index and the forward/
    /// reverse turn-restriction tables. Idempotent-unsafe to call twice on
    /// the same layer (a programmer error, per spec.md §7) since it
    /// re-compacts an already-compacted store; callers build once, then
    /// freeze once.
    #[tracing::instrument(skip(self))]
    pub fn freeze(&mut self) {
        self.vertices.compact_into_base();
        self.edges.compact_into_base();
        self.adjacency.freeze(self.vertices.len());

        let restrictions = std::mem::take(&mut self.pending_restrictions);
        let forward = TurnRestrictionTable::new(restrictions);
        let siblings = |edge: EdgeIndex| {
            let to_vertex = self.edges.read(edge).to_vertex();
            self.adjacency.outgoing(to_vertex).collect::<Vec<_>>()
        };
        let reverse = forward.build_reverse(siblings);
        self.turn_restrictions = Arc::new(forward);
        self.reverse_turn_restrictions = Arc::new(reverse);

        let mut entries = Vec::with_capacity(self.edges.pair_count());
        for pair_idx in 0..self.edges.pair_count() {
            let pair = EdgePairIndex::new(u32::try_from(pair_idx).expect("pair count overflow"));
            if let Some(envelope) = crate::geo::envelope_of(&self.edge_polyline(pair.forward())) {
                entries.push(EdgeEnvelope::new(pair.forward(), envelope));
            }
        }
        self.spatial_index = Arc::new(RTree::bulk_load(entries));
    }

    /// Produces an extend-only scenario sharing this frozen layer's
    /// baseline: new edges/vertices append past the baseline's last index,
    /// a private set tracks baseline edges this scenario hides, and a
    /// private temporary spatial index holds geometry appended by this
    /// scenario only.
    ///
    /// # Panics
    ///
    /// Panics if `self` has not been frozen yet — extending an in-progress
    /// build is a programmer error (spec.md §7).
    #[must_use]
    pub fn extend(&self) -> Self {
        assert!(
            self.vertices.base_len() == self.vertices.len() && self.edges.pair_base_len() == self.edges.pair_count(),
            "cannot extend a StreetLayer that has not been frozen yet"
        );
        Self {
            vertices: self.vertices.extend_from(),
            edges: self.edges.extend_from(),
            turn_restrictions: Arc::clone(&self.turn_restrictions),
            reverse_turn_restrictions: Arc::clone(&self.reverse_turn_restrictions),
            spatial_index: Arc::clone(&self.spatial_index),
            temp_index: RTree::new(),
            adjacency: self.adjacency.extend_from(),
            temporarily_deleted: HashSet::new(),
            config: Arc::clone(&self.config),
            pending_restrictions: Vec::new(),
        }
    }

    #[must_use]
    pub fn temporarily_deleted(&self) -> &HashSet<EdgeIndex> {
        &self.temporarily_deleted
    }

    #[must_use]
    pub fn is_deleted(&self, edge: EdgeIndex) -> bool {
        self.temporarily_deleted.contains(&edge) || self.temporarily_deleted.contains(&edge.opposite())
    }

    fn mark_deleted(&mut self, pair: EdgePairIndex) {
        self.temporarily_deleted.insert(pair.forward());
        self.temporarily_deleted.insert(pair.backward());
    }

    /// Directed edges departing `v`, excluding anything this layer has
    /// marked temporarily deleted.
    pub fn outgoing_edges(&self, v: VertexIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.adjacency.outgoing(v).filter(move |&e| !self.is_deleted(e))
    }

    /// Directed edges arriving at `v`, excluding anything this layer has
    /// marked temporarily deleted.
    pub fn incoming_edges(&self, v: VertexIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.adjacency.incoming(v).filter(move |&e| !self.is_deleted(e))
    }

    /// The full polyline of `edge` in its direction of travel: the `from`
    /// vertex's coordinate, the stored intermediate points (already
    /// direction-ordered), and the `to` vertex's coordinate.
    #[must_use]
    pub fn edge_polyline(&self, edge: EdgeIndex) -> Vec<Coord<f64>> {
        let view = self.edges.read(edge);
        let from = self.vertices.cursor(view.from_vertex()).coord();
        let to = self.vertices.cursor(view.to_vertex()).coord();
        let mut points = Vec::with_capacity(view.geometry_points().len() + 2);
        points.push(from);
        points.extend(view.geometry_points());
        points.push(to);
        points
    }

    /// Forward edges whose envelope intersects `envelope`, from both the
    /// base spatial index and this scenario's temporary index, excluding
    /// anything temporarily deleted.
    pub fn edges_in_envelope(&self, envelope: AABB<[f64; 2]>) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.spatial_index
            .locate_in_envelope_intersecting(&envelope)
            .chain(self.temp_index.locate_in_envelope_intersecting(&envelope))
            .map(|e| e.edge)
            .filter(move |&e| !self.is_deleted(e))
    }

    /// Forward edges appended by *this scenario only* (never the shared
    /// baseline index) whose envelope intersects `envelope`. Used by
    /// `point-linkage`'s base-linkage-relink-subset optimization (spec.md
    /// §4.5): a point only needs relinking against a scenario if it falls
    /// near geometry the scenario itself introduced.
    pub fn scenario_edges_in_envelope(&self, envelope: AABB<[f64; 2]>) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.temp_index.locate_in_envelope_intersecting(&envelope).map(|e| e.edge)
    }

    fn mode_allowed(&self, edge: EdgeIndex, mode: StreetMode) -> bool {
        let bit = EdgeFlag::allows_for_mode(mode);
        self.edges.read(edge).flag(bit) || self.edges.read(edge.opposite()).flag(bit)
    }

    /// Projects `(lat, lon)` onto the nearest traversable forward edge
    /// within `radius_m`, trying a small probe radius first (spec.md §4.3).
    #[must_use]
    pub fn find_split(&self, lat: f64, lon: f64, radius_m: f64, mode: StreetMode) -> Option<Split> {
        let probe_radius = self.config.link_radius_default_m.min(radius_m.max(0.0));
        if let Some(split) = self.find_split_within(lat, lon, probe_radius, mode) {
            return Some(split);
        }
        if radius_m > probe_radius {
            return self.find_split_within(lat, lon, radius_m, mode);
        }
        None
    }

    fn find_split_within(&self, lat: f64, lon: f64, radius_m: f64, mode: StreetMode) -> Option<Split> {
        let query = coord! {x: lon, y: lat};
        let (north, east, south, west) = bbox_with_center(Point::from(query), radius_m);
        let envelope = AABB::from_corners([west, south], [east, north]);

        let approx = DistanceApproximator::new(query);
        let mut best: Option<Split> = None;
        let mut best_dist_sq = radius_m * radius_m;

        for edge in self.edges_in_envelope(envelope) {
            if !self.mode_allowed(edge, mode) {
                continue;
            }
            let polyline = self.edge_polyline(edge);
            let Some(projection) = project_onto_polyline(&approx, &polyline) else {
                continue;
            };
            if projection.dist_sq_m2 > best_dist_sq {
                continue;
            }
            best_dist_sq = projection.dist_sq_m2;

            let view = self.edges.read(edge);
            let length_mm = f64::from(view.length_mm());
            let total_len_m = projection.total_len_m.max(1e-9);
            #[allow(clippy::cast_possible_truncation)]
            let distance0_mm = ((projection.distance_along_m / total_len_m) * length_mm).round() as i32;
            let distance1_mm = view.length_mm() - distance0_mm;
            #[allow(clippy::cast_possible_truncation)]
            let distance_to_edge_mm = (projection.dist_sq_m2.sqrt() * 1000.0).round() as i32;

            best = Some(Split {
                edge,
                segment: projection.segment,
                fixed_lat: FixedDegrees::from_degrees(projection.point.y),
                fixed_lon: FixedDegrees::from_degrees(projection.point.x),
                distance_to_edge_mm,
                distance0_mm,
                distance1_mm,
                vertex0: view.from_vertex(),
                vertex1: view.to_vertex(),
            });
        }
        best
    }

    /// Snaps to the nearer endpoint if within the configured snap radius,
    /// otherwise splits the edge at the projection and returns the new
    /// vertex. Returns `None` (spec.md's `-1` sentinel) if no edge within
    /// the default link radius permits `mode`.
    pub fn get_or_create_vertex_near(&mut self, lat: f64, lon: f64, mode: StreetMode) -> Option<VertexIndex> {
        let split = self.find_split(lat, lon, self.config.link_radius_default_m, mode)?;
        let snap_radius_mm = (self.config.snap_radius_m * 1000.0).round() as i32;

        if split.distance0_mm.min(split.distance1_mm) < snap_radius_mm {
            return Some(if split.distance0_mm <= split.distance1_mm {
                split.vertex0
            } else {
                split.vertex1
            });
        }

        Some(self.split_edge_at(split))
    }

    /// Splits `split.edge`'s pair into two, inserting a new vertex at the
    /// projection point. If the pair is mutable (this build/scenario's own),
    /// it is shrunk in place and one new pair is appended. Otherwise (a
    /// baseline pair under a scenario) the original is left untouched but
    /// marked temporarily deleted, and two new pairs are appended in its
    /// place, both indexed only by this scenario's temporary spatial index.
    fn split_edge_at(&mut self, split: Split) -> VertexIndex {
        let new_vertex = self.vertices.add_vertex_fixed(split.fixed_lat, split.fixed_lon);
        let pair = split.edge.pair_index();
        let view = self.edges.read(pair.forward());
        let full_polyline = self.edge_polyline(pair.forward());
        let street_class = view.street_class();
        let osm_way_id = view.osm_way_id();
        let forward_flags = view.flags();
        let backward_flags = self.edges.read(pair.backward()).flags();
        let forward_speed = view.speed_mps();
        let backward_speed = self.edges.read(pair.backward()).speed_mps();

        let (before, after) = full_polyline.split_at(split.segment + 1);
        // `before`/`after` both include the split point itself as shared
        // boundary; intermediate points for each half exclude both of that
        // half's own endpoints.
        let first_intermediate: Vec<Coord<f64>> = before[1..].to_vec();
        let second_intermediate: Vec<Coord<f64>> = after[..after.len().saturating_sub(1)].to_vec();

        if self.edges.is_pair_mutable(pair) {
            let mut forward = self.edges.cursor(pair.forward());
            forward.set_to_vertex(new_vertex);
            forward.set_length_mm(split.distance0_mm);
            forward.set_geometry(&first_intermediate);
            forward.calculate_angles(self.vertices.cursor(split.vertex0).coord(), self.vertices.cursor(new_vertex).coord());
            drop(forward);

            let new_pair = self.append_pair_copying_attributes(
                new_vertex,
                split.vertex1,
                i64::from(split.distance1_mm),
                osm_way_id,
                street_class,
                forward_flags,
                backward_flags,
                forward_speed,
                backward_speed,
                &second_intermediate,
            );
            self.adjacency.push_pair(new_vertex, split.vertex1, new_pair);
            self.temp_index_insert(new_pair.forward());
        } else {
            let first_pair = self.append_pair_copying_attributes(
                split.vertex0,
                new_vertex,
                i64::from(split.distance0_mm),
                osm_way_id,
                street_class,
                forward_flags,
                backward_flags,
                forward_speed,
                backward_speed,
                &first_intermediate,
            );
            let second_pair = self.append_pair_copying_attributes(
                new_vertex,
                split.vertex1,
                i64::from(split.distance1_mm),
                osm_way_id,
                street_class,
                forward_flags,
                backward_flags,
                forward_speed,
                backward_speed,
                &second_intermediate,
            );
            self.adjacency.push_pair(split.vertex0, new_vertex, first_pair);
            self.adjacency.push_pair(new_vertex, split.vertex1, second_pair);
            self.mark_deleted(pair);
            self.temp_index_insert(first_pair.forward());
            self.temp_index_insert(second_pair.forward());
        }

        new_vertex
    }

    #[allow(clippy::too_many_arguments)]
    fn append_pair_copying_attributes(
        &mut self,
        from: VertexIndex,
        to: VertexIndex,
        length_mm: i64,
        osm_way_id: i64,
        street_class: StreetClass,
        forward_flags: EnumSet<EdgeFlag>,
        backward_flags: EnumSet<EdgeFlag>,
        forward_speed: f64,
        backward_speed: f64,
        intermediate: &[Coord<f64>],
    ) -> EdgePairIndex {
        let mut cursor = self
            .edges
            .add_edge_pair(from, to, length_mm, osm_way_id, street_class)
            .expect("split lengths are derived from an already-valid pair");
        let pair = cursor.pair_index();
        cursor.set_geometry(intermediate);
        let from_coord = self.vertices.cursor(from).coord();
        let to_coord = self.vertices.cursor(to).coord();
        cursor.calculate_angles(from_coord, to_coord);
        for flag in forward_flags {
            cursor.set_flag(flag);
        }
        cursor.set_speed(forward_speed);
        drop(cursor);

        let mut backward = self.edges.cursor(pair.backward());
        for flag in backward_flags {
            backward.set_flag(flag);
        }
        backward.set_speed(backward_speed);
        pair
    }

    fn temp_index_insert(&mut self, forward_edge: EdgeIndex) {
        if let Some(envelope) = crate::geo::envelope_of(&self.edge_polyline(forward_edge)) {
            self.temp_index.insert(EdgeEnvelope::new(forward_edge, envelope));
        }
    }
}

struct Projection {
    segment: usize,
    point: Coord<f64>,
    distance_along_m: f64,
    total_len_m: f64,
    dist_sq_m2: f64,
}

/// Projects `approx`'s center onto the closest segment of `polyline`,
/// returning the segment index, the projected point, the along-line
/// distance from `polyline[0]` to the projection, the polyline's total
/// length, and the squared perpendicular distance — all in meters, computed
/// in a locally-flat plane valid over the short distances routing queries.
fn project_onto_polyline(approx: &DistanceApproximator, polyline: &[Coord<f64>]) -> Option<Projection> {
    if polyline.len() < 2 {
        return None;
    }
    let local: Vec<(f64, f64)> = polyline.iter().map(|c| approx.to_local_meters(*c)).collect();

    let mut cumulative = vec![0.0; polyline.len()];
    for i in 1..polyline.len() {
        cumulative[i] = cumulative[i - 1] + Haversine.distance(Point::from(polyline[i - 1]), Point::from(polyline[i]));
    }
    let total_len_m = *cumulative.last()?;

    let mut best: Option<(usize, f64, f64, f64)> = None; // (segment, t, dist_sq, distance_along)
    for i in 0..polyline.len() - 1 {
        let (ax, ay) = local[i];
        let (bx, by) = local[i + 1];
        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx.mul_add(dx, dy * dy);
        let t = if len_sq > 1e-9 { ((-ax * dx) + (-ay * dy)) / len_sq } else { 0.0 }.clamp(0.0, 1.0);
        let (px, py) = (ax + t * dx, ay + t * dy);
        let dist_sq = px.mul_add(px, py * py);
        let distance_along = (cumulative[i + 1] - cumulative[i]).mul_add(t, cumulative[i]);
        if best.is_none_or(|(_, _, best_dist_sq, _)| dist_sq < best_dist_sq) {
            best = Some((i, t, dist_sq, distance_along));
        }
    }
    let (segment, t, dist_sq, distance_along) = best?;
    let (ax, ay) = local[segment];
    let (bx, by) = local[segment + 1];
    let point = approx.from_local_meters(ax + t * (bx - ax), ay + t * (by - ay));

    Some(Projection { segment, point, distance_along_m: distance_along, total_len_m, dist_sq_m2: dist_sq })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pins the builder's default tuning constants so a future refactor
    /// can't silently drift from the named defaults (5m snap radius, 300m
    /// default/1600m max link radius, 40-edge min subgraph, 50 km/h fallback).
    #[test]
    fn builder_config_default_matches_the_named_constants() {
        let config = BuilderConfig::default();
        assert_eq!(config.snap_radius_m, 5.0);
        assert_eq!(config.link_radius_default_m, 300.0);
        assert_eq!(config.link_radius_max_m, 1600.0);
        assert_eq!(config.min_subgraph_size, 40);
        assert_eq!(config.default_speed_kmh, 50.0);
    }

    fn two_vertex_layer() -> (StreetLayer, VertexIndex, VertexIndex) {
        let mut layer = StreetLayer::new(BuilderConfig::default());
        let a = layer.add_vertex(0.0, 0.0);
        let b = layer.add_vertex(0.0, 0.001_797_3); // ~200m east at the equator
        let pair = layer.add_edge_pair(a, b, 200_000, 1, StreetClass::Local).unwrap();
        let mut fwd = layer.edges.cursor(pair.forward());
        fwd.set_flag(EdgeFlag::AllowsPedestrian);
        fwd.set_flag(EdgeFlag::AllowsCar);
        drop(fwd);
        let mut bwd = layer.edges.cursor(pair.backward());
        bwd.set_flag(EdgeFlag::AllowsPedestrian);
        bwd.set_flag(EdgeFlag::AllowsCar);
        drop(bwd);
        layer.freeze();
        (layer, a, b)
    }

    #[test]
    fn find_split_locates_the_midpoint_of_a_straight_edge() {
        let (layer, a, b) = two_vertex_layer();
        let split = layer.find_split(0.0, 0.000_898_65, 50.0, StreetMode::Walk).unwrap();
        assert_eq!(split.vertex0, a);
        assert_eq!(split.vertex1, b);
        assert!((split.distance0_mm - split.distance1_mm).abs() < 2000);
    }

    #[test]
    fn get_or_create_vertex_near_snaps_within_radius() {
        let (mut layer, a, _b) = two_vertex_layer();
        let near_a = layer.get_or_create_vertex_near(0.0, 0.000_001, StreetMode::Walk).unwrap();
        assert_eq!(near_a, a);
    }

    #[test]
    fn get_or_create_vertex_near_splits_an_immutable_baseline_edge() {
        let (baseline, _a, _b) = two_vertex_layer();
        let mut scenario = baseline.extend();
        let pair_count_before = scenario.edges().pair_count();

        let new_vertex = scenario.get_or_create_vertex_near(0.0, 0.000_898_65, StreetMode::Walk).unwrap();
        assert_eq!(scenario.edges().pair_count(), pair_count_before + 2);
        assert!(new_vertex.as_usize() >= baseline.vertices().len());

        // The original pair is hidden, never returned by spatial queries.
        let original_forward = EdgePairIndex::new(0).forward();
        assert!(scenario.is_deleted(original_forward));
        let (north, east, south, west) = bbox_with_center(Point::from(coord! {x: 0.000_898_65, y: 0.0}), 50.0);
        let hits: Vec<_> = scenario
            .edges_in_envelope(AABB::from_corners([west, south], [east, north]))
            .collect();
        assert!(!hits.contains(&original_forward));
        assert_eq!(hits.len(), 2);

        // The baseline itself is untouched.
        assert!(!baseline.is_deleted(original_forward));
    }

    #[test]
    fn find_split_returns_none_when_no_edge_permits_the_mode() {
        let (layer, _a, _b) = two_vertex_layer();
        assert!(layer.find_split(0.0, 0.000_898_65, 50.0, StreetMode::Bicycle).is_none());
    }
}
