//! Column-oriented directed-edge storage.
//!
//! Fields shared by both directions of a pair (geometry, length, the OSM way
//! id, the two endpoints as the *forward* direction sees them, angles,
//! street class) are indexed by [`EdgePairIndex`] and held in
//! [`AppendOnlyColumn`]s, the same sharing scheme [`crate::vertex_store::VertexStore`]
//! uses, so a scenario can extend a frozen baseline's edge pairs with
//! `Arc::clone` and its own appended tail. Fields that differ per direction
//! (permissions, speed) are indexed by [`EdgeIndex`] directly; spec.md §4.2
//! allows these to be cloned outright rather than column-wrapped since a
//! scenario virtually never rewrites a baseline edge's flags or speed, only
//! appends new ones, so a plain clone-on-extend `Vec` costs nothing a real
//! scenario would notice.

use std::sync::Arc;

use enumset::EnumSet;
use geo::{Coord, Rect};

use crate::append_only::AppendOnlyColumn;
use crate::error::GraphError;
use crate::flags::{EdgeFlag, StreetClass};
use crate::geo::{coord_from_fixed, envelope_of, Brads, FixedDegrees};
use crate::indices::{EdgeIndex, EdgePairIndex, VertexIndex};

const MAX_LENGTH_MM: i64 = i32::MAX as i64;

/// An interned empty shape, shared by every edge built without an explicit
/// polyline (the overwhelming majority — a straight line between its two
/// endpoints needs no intermediate geometry).
fn empty_geometry() -> Arc<[FixedDegrees]> {
    Arc::from(Vec::new())
}

/// Struct-of-arrays directed-edge storage.
#[derive(Debug, Default, Clone)]
pub struct EdgeStore {
    // Pair-shared columns, indexed by `EdgePairIndex`, extend-only so a
    // scenario overlay can share the frozen baseline.
    from: AppendOnlyColumn<VertexIndex>,
    to: AppendOnlyColumn<VertexIndex>,
    length_mm: AppendOnlyColumn<i32>,
    osm_way_id: AppendOnlyColumn<i64>,
    /// Intermediate points only, excluding both endpoints (spec.md §3); the
    /// empty, interned array represents a straight line. Endpoint coordinates
    /// live in the `VertexStore` the owning `StreetLayer` also holds.
    geometry: AppendOnlyColumn<Arc<[FixedDegrees]>>,
    in_angle: AppendOnlyColumn<Brads>,
    out_angle: AppendOnlyColumn<Brads>,
    street_class: AppendOnlyColumn<StreetClass>,

    // Per-direction columns, indexed by `EdgeIndex` (length `2 * pairs`).
    // Cloned rather than column-wrapped on `extend_from` (see module doc).
    flags: Vec<EnumSet<EdgeFlag>>,
    speed_cms: Vec<i16>,
}

impl EdgeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.from.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.flags.len()
    }

    /// The number of pairs belonging to this store's frozen base (0 until
    /// [`Self::compact_into_base`] has been called — i.e. while this is still
    /// being built from scratch rather than extending a baseline).
    #[must_use]
    pub fn pair_base_len(&self) -> usize {
        self.from.base_len()
    }

    /// Whether `pair` was appended after this store's frozen boundary — true
    /// for every pair while a baseline is still being built, and true only
    /// for a scenario's own appended pairs once a baseline has been frozen.
    #[must_use]
    pub fn is_pair_mutable(&self, pair: EdgePairIndex) -> bool {
        pair.as_usize() >= self.pair_base_len()
    }

    /// Appends a new directed-edge pair. `length_mm` and `street_class`
    /// describe the forward direction's geometric sense; both directions
    /// start with no flags and speed zero until set through the returned
    /// cursor.
    pub fn add_edge_pair(
        &mut self,
        from: VertexIndex,
        to: VertexIndex,
        length_mm: i64,
        osm_way_id: i64,
        street_class: StreetClass,
    ) -> Result<EdgeCursor<'_>, GraphError> {
        if length_mm < 0 || length_mm > MAX_LENGTH_MM {
            return Err(GraphError::LengthOutOfRange { length_mm });
        }

        let pair_index = self.from.push(from);
        self.to.push(to);
        #[allow(clippy::cast_possible_truncation)]
        self.length_mm.push(length_mm as i32);
        self.osm_way_id.push(osm_way_id);
        self.geometry.push(empty_geometry());
        self.in_angle.push(Brads::default());
        self.out_angle.push(Brads::default());
        self.street_class.push(street_class);
        let pair = EdgePairIndex::new(u32::try_from(pair_index).expect("pair count overflow"));
        self.flags.push(EnumSet::empty());
        self.flags.push(EnumSet::empty());
        self.speed_cms.push(0);
        self.speed_cms.push(0);

        Ok(self.cursor(pair.forward()))
    }

    #[must_use]
    pub fn cursor(&mut self, index: EdgeIndex) -> EdgeCursor<'_> {
        assert!(index.as_usize() < self.edge_count(), "edge index {index} out of range");
        EdgeCursor { store: self, index }
    }

    #[must_use]
    pub fn read(&self, index: EdgeIndex) -> EdgeView<'_> {
        assert!(index.as_usize() < self.edge_count(), "edge index {index} out of range");
        EdgeView { store: self, index }
    }

    /// Merges base and extension into one new frozen base for every column,
    /// ready to be shared zero-copy by every scenario built from here on.
    /// Called once, when a baseline `StreetLayer` finishes building.
    pub fn compact_into_base(&mut self) {
        self.from = AppendOnlyColumn::freeze(collect_all(&self.from));
        self.to = AppendOnlyColumn::freeze(collect_all(&self.to));
        self.length_mm = AppendOnlyColumn::freeze(collect_all(&self.length_mm));
        self.osm_way_id = AppendOnlyColumn::freeze(collect_all(&self.osm_way_id));
        self.geometry = AppendOnlyColumn::freeze(collect_all(&self.geometry));
        self.in_angle = AppendOnlyColumn::freeze(collect_all(&self.in_angle));
        self.out_angle = AppendOnlyColumn::freeze(collect_all(&self.out_angle));
        self.street_class = AppendOnlyColumn::freeze(collect_all(&self.street_class));
    }

    /// Produces a new store sharing this one's frozen base (pair-shared
    /// columns, zero-copy) with an empty extension, plus an independent
    /// clone of the per-direction columns, for a scenario built on top of a
    /// frozen baseline.
    #[must_use]
    pub fn extend_from(&self) -> Self {
        Self {
            from: self.from.extend_from(),
            to: self.to.extend_from(),
            length_mm: self.length_mm.extend_from(),
            osm_way_id: self.osm_way_id.extend_from(),
            geometry: self.geometry.extend_from(),
            in_angle: self.in_angle.extend_from(),
            out_angle: self.out_angle.extend_from(),
            street_class: self.street_class.extend_from(),
            flags: self.flags.clone(),
            speed_cms: self.speed_cms.clone(),
        }
    }
}

fn collect_all<T: Clone>(column: &AppendOnlyColumn<T>) -> Vec<T> {
    (0..column.len()).map(|i| column.get(i).expect("index in range").clone()).collect()
}

/// Shared read-only accessors, implemented once and reused by both
/// [`EdgeCursor`] (read/write) and [`EdgeView`] (read-only, no `&mut`
/// required), mirroring the direction-aware field mapping spec'd for edge
/// cursors.
trait EdgeFields {
    fn store(&self) -> &EdgeStore;
    fn index(&self) -> EdgeIndex;

    fn pair(&self) -> EdgePairIndex {
        self.index().pair_index()
    }

    fn from_vertex(&self) -> VertexIndex {
        let pair = self.pair().as_usize();
        if self.index().is_backward() {
            *self.store().to.get(pair).expect("pair index out of range")
        } else {
            *self.store().from.get(pair).expect("pair index out of range")
        }
    }

    fn to_vertex(&self) -> VertexIndex {
        let pair = self.pair().as_usize();
        if self.index().is_backward() {
            *self.store().from.get(pair).expect("pair index out of range")
        } else {
            *self.store().to.get(pair).expect("pair index out of range")
        }
    }

    fn length_mm(&self) -> i32 {
        *self.store().length_mm.get(self.pair().as_usize()).expect("pair index out of range")
    }

    fn osm_way_id(&self) -> i64 {
        *self.store().osm_way_id.get(self.pair().as_usize()).expect("pair index out of range")
    }

    fn street_class(&self) -> StreetClass {
        *self.store().street_class.get(self.pair().as_usize()).expect("pair index out of range")
    }

    fn speed_mps(&self) -> f64 {
        f64::from(self.store().speed_cms[self.index().as_usize()]) / 100.0
    }

    fn flags(&self) -> EnumSet<EdgeFlag> {
        self.store().flags[self.index().as_usize()]
    }

    fn flag(&self, flag: EdgeFlag) -> bool {
        self.flags().contains(flag)
    }

    /// The bearing of travel at the start of this directed edge.
    fn in_angle(&self) -> Brads {
        let pair = self.pair().as_usize();
        if self.index().is_backward() {
            self.store().out_angle.get(pair).expect("pair index out of range").opposite()
        } else {
            *self.store().in_angle.get(pair).expect("pair index out of range")
        }
    }

    /// The bearing of travel at the end of this directed edge.
    fn out_angle(&self) -> Brads {
        let pair = self.pair().as_usize();
        if self.index().is_backward() {
            self.store().in_angle.get(pair).expect("pair index out of range").opposite()
        } else {
            *self.store().out_angle.get(pair).expect("pair index out of range")
        }
    }

    /// Intermediate geometry points only (endpoints excluded, spec.md §3) in
    /// this direction's order of travel: forward returns the stored shape
    /// as-is, backward walks it from the end. Callers that need the full
    /// polyline including endpoints go through
    /// [`crate::street_layer::StreetLayer::edge_polyline`], since `EdgeStore`
    /// has no handle on the vertex coordinates.
    fn geometry_points(&self) -> Vec<Coord<f64>> {
        let stored = self.store().geometry.get(self.pair().as_usize()).expect("pair index out of range");
        let mut points: Vec<Coord<f64>> = stored
            .chunks_exact(2)
            .map(|pair| coord_from_fixed(pair[0], pair[1]))
            .collect();
        if self.index().is_backward() {
            points.reverse();
        }
        points
    }

    /// Intermediate geometry points in the pair's canonical forward order,
    /// regardless of this cursor's direction (spec.md §4.1: unlike
    /// [`Self::geometry_points`], these two iteration methods never reverse).
    fn forward_geometry_points(&self) -> Vec<Coord<f64>> {
        let stored = self.store().geometry.get(self.pair().as_usize()).expect("pair index out of range");
        stored.chunks_exact(2).map(|pair| coord_from_fixed(pair[0], pair[1])).collect()
    }

    fn for_each_point(&self, mut f: impl FnMut(Coord<f64>)) {
        for p in self.forward_geometry_points() {
            f(p);
        }
    }

    fn for_each_segment(&self, mut f: impl FnMut(Coord<f64>, Coord<f64>)) {
        let points = self.forward_geometry_points();
        for pair in points.windows(2) {
            f(pair[0], pair[1]);
        }
    }

    /// Envelope of the stored intermediate geometry only; empty for a
    /// straight edge. `StreetLayer` builds the spatial index from the full
    /// polyline (see [`Self::geometry_points`]'s doc), not from this alone.
    fn envelope(&self) -> Option<Rect<f64>> {
        envelope_of(&self.geometry_points())
    }
}

/// A cheap, `Copy`, thread-local handle for reading one directed edge.
#[derive(Debug, Copy, Clone)]
pub struct EdgeView<'a> {
    store: &'a EdgeStore,
    index: EdgeIndex,
}

impl EdgeFields for EdgeView<'_> {
    fn store(&self) -> &EdgeStore {
        self.store
    }

    fn index(&self) -> EdgeIndex {
        self.index
    }
}

impl<'a> EdgeView<'a> {
    #[must_use]
    pub fn index(self) -> EdgeIndex {
        self.index
    }
    #[must_use]
    pub fn pair_index(self) -> EdgePairIndex {
        EdgeFields::pair(&self)
    }
    #[must_use]
    pub fn from_vertex(self) -> VertexIndex {
        EdgeFields::from_vertex(&self)
    }
    #[must_use]
    pub fn to_vertex(self) -> VertexIndex {
        EdgeFields::to_vertex(&self)
    }
    #[must_use]
    pub fn length_mm(self) -> i32 {
        EdgeFields::length_mm(&self)
    }
    #[must_use]
    pub fn osm_way_id(self) -> i64 {
        EdgeFields::osm_way_id(&self)
    }
    #[must_use]
    pub fn street_class(self) -> StreetClass {
        EdgeFields::street_class(&self)
    }
    #[must_use]
    pub fn speed_mps(self) -> f64 {
        EdgeFields::speed_mps(&self)
    }
    #[must_use]
    pub fn flags(self) -> EnumSet<EdgeFlag> {
        EdgeFields::flags(&self)
    }
    #[must_use]
    pub fn flag(self, flag: EdgeFlag) -> bool {
        EdgeFields::flag(&self, flag)
    }
    #[must_use]
    pub fn in_angle(self) -> Brads {
        EdgeFields::in_angle(&self)
    }
    #[must_use]
    pub fn out_angle(self) -> Brads {
        EdgeFields::out_angle(&self)
    }
    #[must_use]
    pub fn envelope(self) -> Option<Rect<f64>> {
        EdgeFields::envelope(&self)
    }
    #[must_use]
    pub fn geometry_points(self) -> Vec<Coord<f64>> {
        EdgeFields::geometry_points(&self)
    }
    pub fn for_each_point(self, f: impl FnMut(Coord<f64>)) {
        EdgeFields::for_each_point(&self, f);
    }
    pub fn for_each_segment(self, f: impl FnMut(Coord<f64>, Coord<f64>)) {
        EdgeFields::for_each_segment(&self, f);
    }
}

/// A cheap, thread-local read/write handle for one directed edge.
///
/// Writes through a backward cursor apply to the pair's shared columns
/// symmetrically: `set_to_vertex` on a backward cursor writes the pair's
/// `from` column, since the backward direction's destination is the
/// forward direction's origin.
///
/// # Panics
///
/// Every setter panics if `index` falls below the store's frozen base (see
/// [`EdgeStore::is_pair_mutable`]) — a programmer error per spec.md §7, not
/// a data-quality condition a caller is expected to recover from.
pub struct EdgeCursor<'a> {
    store: &'a mut EdgeStore,
    index: EdgeIndex,
}

impl EdgeFields for EdgeCursor<'_> {
    fn store(&self) -> &EdgeStore {
        self.store
    }

    fn index(&self) -> EdgeIndex {
        self.index
    }
}

impl<'a> EdgeCursor<'a> {
    #[must_use]
    pub fn index(&self) -> EdgeIndex {
        self.index
    }
    #[must_use]
    pub fn pair_index(&self) -> EdgePairIndex {
        EdgeFields::pair(self)
    }
    #[must_use]
    pub fn from_vertex(&self) -> VertexIndex {
        EdgeFields::from_vertex(self)
    }
    #[must_use]
    pub fn to_vertex(&self) -> VertexIndex {
        EdgeFields::to_vertex(self)
    }
    #[must_use]
    pub fn length_mm(&self) -> i32 {
        EdgeFields::length_mm(self)
    }
    #[must_use]
    pub fn speed_mps(&self) -> f64 {
        EdgeFields::speed_mps(self)
    }
    #[must_use]
    pub fn flags(&self) -> EnumSet<EdgeFlag> {
        EdgeFields::flags(self)
    }
    #[must_use]
    pub fn flag(&self, flag: EdgeFlag) -> bool {
        EdgeFields::flag(self, flag)
    }
    #[must_use]
    pub fn in_angle(&self) -> Brads {
        EdgeFields::in_angle(self)
    }
    #[must_use]
    pub fn out_angle(&self) -> Brads {
        EdgeFields::out_angle(self)
    }
    #[must_use]
    pub fn envelope(&self) -> Option<Rect<f64>> {
        EdgeFields::envelope(self)
    }
    #[must_use]
    pub fn geometry_points(&self) -> Vec<Coord<f64>> {
        EdgeFields::geometry_points(self)
    }
    pub fn for_each_point(&self, f: impl FnMut(Coord<f64>)) {
        EdgeFields::for_each_point(self, f);
    }
    pub fn for_each_segment(&self, f: impl FnMut(Coord<f64>, Coord<f64>)) {
        EdgeFields::for_each_segment(self, f);
    }

    /// Sets this direction's speed, in meters per second.
    pub fn set_speed(&mut self, mps: f64) {
        #[allow(clippy::cast_possible_truncation)]
        let cms = (mps * 100.0).round() as i16;
        self.store.speed_cms[self.index.as_usize()] = cms;
    }

    pub fn set_flag(&mut self, flag: EdgeFlag) {
        self.store.flags[self.index.as_usize()].insert(flag);
    }

    pub fn clear_flag(&mut self, flag: EdgeFlag) {
        self.store.flags[self.index.as_usize()].remove(flag);
    }

    /// Sets this direction's LTS rating, clearing any previously set level.
    pub fn set_lts(&mut self, bit: EdgeFlag) {
        let mut flags = self.store.flags[self.index.as_usize()];
        EdgeFlag::set_lts(&mut flags, bit);
        self.store.flags[self.index.as_usize()] = flags;
    }

    fn assert_mutable(&self) {
        let pair = self.pair_index();
        assert!(
            self.store.is_pair_mutable(pair),
            "edge pair {pair:?} falls within the immutable baseline and cannot be modified in place"
        );
    }

    pub fn set_length_mm(&mut self, length_mm: i32) {
        self.assert_mutable();
        let pair = self.pair_index().as_usize();
        self.store.length_mm.set(pair, length_mm).expect("checked mutable above");
    }

    /// Rewrites the vertex this direction travels *to*. On a backward
    /// cursor this mutates the pair's `from` column.
    pub fn set_to_vertex(&mut self, vertex: VertexIndex) {
        self.assert_mutable();
        let pair = self.pair_index().as_usize();
        if self.index.is_backward() {
            self.store.from.set(pair, vertex).expect("checked mutable above");
        } else {
            self.store.to.set(pair, vertex).expect("checked mutable above");
        }
    }

    /// Replaces the pair's shared intermediate geometry (endpoints
    /// excluded). `points` must be given in the *forward* direction's order
    /// regardless of which cursor calls this.
    pub fn set_geometry(&mut self, points: &[Coord<f64>]) {
        self.assert_mutable();
        let mut flat = Vec::with_capacity(points.len() * 2);
        for p in points {
            flat.push(FixedDegrees::from_degrees(p.y));
            flat.push(FixedDegrees::from_degrees(p.x));
        }
        let pair = self.pair_index().as_usize();
        self.store.geometry.set(pair, Arc::from(flat)).expect("checked mutable above");
    }

    /// Recomputes `in_angle`/`out_angle` for this pair in the forward
    /// direction's sense, regardless of which cursor this is called
    /// through. `from`/`to` are the pair's endpoint coordinates (the
    /// `EdgeStore` has no handle on `VertexStore`, so the caller — the
    /// owning `StreetLayer` — supplies them). Per spec.md §3, the bearing is
    /// measured at &ge;10m along the line when the geometry is long enough.
    pub fn calculate_angles(&mut self, from: Coord<f64>, to: Coord<f64>) {
        self.assert_mutable();
        let pair = self.pair_index().as_usize();
        let stored = self.store.geometry.get(pair).expect("checked mutable above");
        let mut polyline = Vec::with_capacity(stored.len() / 2 + 2);
        polyline.push(from);
        polyline.extend(stored.chunks_exact(2).map(|p| coord_from_fixed(p[0], p[1])));
        polyline.push(to);

        let in_angle = bearing_at_least(&polyline, 10.0);
        let mut reversed = polyline.clone();
        reversed.reverse();
        let out_angle = bearing_at_least(&reversed, 10.0).opposite();

        self.store.in_angle.set(pair, in_angle).expect("checked mutable above");
        self.store.out_angle.set(pair, out_angle).expect("checked mutable above");
    }
}

/// The bearing from `polyline[0]` towards the point at least `min_meters`
/// along the line (or the line's last point, if the whole line is shorter).
fn bearing_at_least(polyline: &[Coord<f64>], min_meters: f64) -> Brads {
    use geo::{Distance, Haversine};

    if polyline.len() < 2 {
        return Brads::default();
    }
    let origin = polyline[0];
    let mut target = polyline[1];
    for window in polyline.windows(2) {
        target = window[1];
        if Haversine.distance(geo::Point::from(origin), geo::Point::from(target)) >= min_meters {
            break;
        }
    }
    Brads::from_radians_cw(bearing(origin, target))
}

fn bearing(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let lat1 = from.y.to_radians();
    let lat2 = to.y.to_radians();
    let dlon = (to.x - from.x).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos().mul_add(lat2.sin(), -(lat1.sin() * lat2.cos() * dlon.cos()));
    y.atan2(x).rem_euclid(std::f64::consts::TAU)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indices::VertexIndex;
    use geo::coord;

    fn v(i: u32) -> VertexIndex {
        VertexIndex::new(i)
    }

    #[test]
    fn add_edge_pair_rejects_negative_or_oversized_length() {
        let mut store = EdgeStore::new();
        assert!(matches!(
            store.add_edge_pair(v(0), v(1), -1, 1, StreetClass::Local).unwrap_err(),
            GraphError::LengthOutOfRange { .. }
        ));
        assert!(matches!(
            store
                .add_edge_pair(v(0), v(1), MAX_LENGTH_MM + 1, 1, StreetClass::Local)
                .unwrap_err(),
            GraphError::LengthOutOfRange { .. }
        ));
    }

    #[test]
    fn forward_and_backward_cursors_see_swapped_endpoints() {
        let mut store = EdgeStore::new();
        let forward = store
            .add_edge_pair(v(3), v(7), 5000, 42, StreetClass::Local)
            .unwrap();
        let pair = forward.pair_index();
        drop(forward);

        let fwd = store.cursor(pair.forward());
        assert_eq!(fwd.from_vertex(), v(3));
        assert_eq!(fwd.to_vertex(), v(7));
        drop(fwd);

        let back = store.cursor(pair.backward());
        assert_eq!(back.from_vertex(), v(7));
        assert_eq!(back.to_vertex(), v(3));
    }

    #[test]
    fn set_to_vertex_on_backward_cursor_writes_pair_from_column() {
        let mut store = EdgeStore::new();
        let forward = store
            .add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local)
            .unwrap();
        let pair = forward.pair_index();
        drop(forward);

        let mut back = store.cursor(pair.backward());
        back.set_to_vertex(v(9));
        drop(back);

        assert_eq!(store.cursor(pair.forward()).from_vertex(), v(9));
        assert_eq!(store.cursor(pair.backward()).to_vertex(), v(9));
    }

    #[test]
    fn speed_round_trips_through_cm_per_second() {
        let mut store = EdgeStore::new();
        let mut edge = store
            .add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local)
            .unwrap();
        edge.set_speed(13.4);
        assert!((edge.speed_mps() - 13.4).abs() < 0.01);
    }

    #[test]
    fn flags_are_per_direction() {
        let mut store = EdgeStore::new();
        let forward = store
            .add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local)
            .unwrap();
        let pair = forward.pair_index();
        drop(forward);

        store.cursor(pair.forward()).set_flag(EdgeFlag::AllowsBike);
        assert!(store.cursor(pair.forward()).flag(EdgeFlag::AllowsBike));
        assert!(!store.cursor(pair.backward()).flag(EdgeFlag::AllowsBike));
    }

    #[test]
    fn calculate_angles_are_opposite_between_directions() {
        let mut store = EdgeStore::new();
        let mut edge = store
            .add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local)
            .unwrap();
        edge.calculate_angles(coord! {x: 0.0, y: 0.0}, coord! {x: 0.0, y: 0.01});
        let pair = edge.pair_index();
        drop(edge);

        let fwd = store.cursor(pair.forward());
        let back = store.cursor(pair.backward());
        assert_eq!(fwd.in_angle(), back.out_angle());
        assert_eq!(fwd.out_angle(), back.in_angle());
    }

    #[test]
    fn calculate_angles_on_empty_geometry_uses_the_straight_endpoint_segment() {
        let mut store = EdgeStore::new();
        let mut edge = store
            .add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local)
            .unwrap();
        assert!(edge.geometry_points().is_empty());
        edge.calculate_angles(coord! {x: 0.0, y: 0.0}, coord! {x: 1.0, y: 0.0});
        assert_eq!(edge.in_angle(), edge.out_angle());
    }

    #[test]
    fn extend_from_shares_frozen_pair_columns_and_clones_per_direction_columns() {
        let mut baseline = EdgeStore::new();
        baseline.add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local).unwrap();
        baseline.cursor(EdgePairIndex::new(0).forward()).set_flag(EdgeFlag::AllowsCar);
        baseline.compact_into_base();
        assert_eq!(baseline.pair_base_len(), 1);

        let mut scenario = baseline.extend_from();
        assert!(scenario.cursor(EdgePairIndex::new(0).forward()).flag(EdgeFlag::AllowsCar));
        scenario.add_edge_pair(v(1), v(2), 500, 2, StreetClass::Local).unwrap();
        assert_eq!(scenario.pair_count(), 2);
        assert_eq!(baseline.pair_count(), 1);
    }

    #[test]
    #[should_panic(expected = "immutable baseline")]
    fn writing_below_the_frozen_boundary_panics() {
        let mut baseline = EdgeStore::new();
        baseline.add_edge_pair(v(0), v(1), 1000, 1, StreetClass::Local).unwrap();
        baseline.compact_into_base();

        let mut scenario = baseline.extend_from();
        scenario.cursor(EdgePairIndex::new(0).forward()).set_length_mm(5);
    }
}
