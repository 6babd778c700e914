//! Column-oriented vertex storage and the read/write cursor over it.
//!
//! Vertices are append-only: once added, an index is permanent and never
//! reused, the same guarantee the teacher's tile-relative `GraphId` offsets
//! rely on. Each column is an [`AppendOnlyColumn`] so a scenario built via
//! [`crate::street_layer::StreetLayer::extend`]
//! can share a frozen baseline's vertices with `Arc::clone` and append its
//! own past them.

use enumset::EnumSet;
use geo::Coord;

use crate::append_only::AppendOnlyColumn;
use crate::flags::VertexFlag;
use crate::geo::{coord_from_fixed, FixedDegrees};
use crate::indices::VertexIndex;

/// Struct-of-arrays vertex storage: latitude, longitude, and flags, one
/// entry per vertex.
#[derive(Debug, Default, Clone)]
pub struct VertexStore {
    lat: AppendOnlyColumn<FixedDegrees>,
    lon: AppendOnlyColumn<FixedDegrees>,
    flags: AppendOnlyColumn<EnumSet<VertexFlag>>,
}

impl VertexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// The number of vertices belonging to this store's frozen base (0
    /// until [`Self::compact_into_base`] has been called).
    #[must_use]
    pub fn base_len(&self) -> usize {
        self.lat.base_len()
    }

    /// Appends a new vertex at `(lat, lon)` in floating-point degrees.
    pub fn add_vertex(&mut self, lat: f64, lon: f64) -> VertexIndex {
        self.add_vertex_fixed(FixedDegrees::from_degrees(lat), FixedDegrees::from_degrees(lon))
    }

    /// Appends a new vertex at already-fixed-point coordinates.
    pub fn add_vertex_fixed(&mut self, lat: FixedDegrees, lon: FixedDegrees) -> VertexIndex {
        let index = VertexIndex::new(u32::try_from(self.lat.len()).expect("vertex count overflow"));
        self.lat.push(lat);
        self.lon.push(lon);
        self.flags.push(EnumSet::empty());
        index
    }

    #[must_use]
    pub fn cursor(&self, index: VertexIndex) -> VertexCursor<'_> {
        assert!(index.as_usize() < self.len(), "vertex index {index} out of range");
        VertexCursor { store: self, index }
    }

    pub fn set_flag(&mut self, index: VertexIndex, flag: VertexFlag) {
        let mut flags = *self.flags.get(index.as_usize()).expect("vertex index out of range");
        flags.insert(flag);
        self.write_flags(index, flags);
    }

    pub fn clear_flag(&mut self, index: VertexIndex, flag: VertexFlag) {
        let mut flags = *self.flags.get(index.as_usize()).expect("vertex index out of range");
        flags.remove(flag);
        self.write_flags(index, flags);
    }

    fn write_flags(&mut self, index: VertexIndex, flags: EnumSet<VertexFlag>) {
        self.flags
            .set(index.as_usize(), flags)
            .expect("vertex flags below the frozen base are immutable");
    }

    /// Merges base and extension into one new frozen base, ready to be
    /// shared zero-copy by every scenario built from here on. Called once,
    /// when a baseline `StreetLayer` finishes building.
    pub fn compact_into_base(&mut self) {
        self.lat = AppendOnlyColumn::freeze(collect_all(&self.lat));
        self.lon = AppendOnlyColumn::freeze(collect_all(&self.lon));
        self.flags = AppendOnlyColumn::freeze(collect_all(&self.flags));
    }

    /// Produces a new store sharing this one's frozen base with an empty
    /// extension, for a scenario built on top of a frozen baseline.
    #[must_use]
    pub fn extend_from(&self) -> Self {
        Self {
            lat: self.lat.extend_from(),
            lon: self.lon.extend_from(),
            flags: self.flags.extend_from(),
        }
    }
}

fn collect_all<T: Clone>(column: &AppendOnlyColumn<T>) -> Vec<T> {
    (0..column.len()).map(|i| column.get(i).expect("index in range").clone()).collect()
}

/// A cheap, `Copy`, thread-local handle onto one vertex's fields.
///
/// Like the teacher's tile cursor types, this borrows the backing store
/// rather than copying it, so it must not outlive (and cannot cross threads
/// relative to) the `VertexStore` it was built from.
#[derive(Debug, Copy, Clone)]
pub struct VertexCursor<'a> {
    store: &'a VertexStore,
    index: VertexIndex,
}

impl<'a> VertexCursor<'a> {
    #[must_use]
    pub fn index(self) -> VertexIndex {
        self.index
    }

    #[must_use]
    pub fn lat(self) -> FixedDegrees {
        *self.store.lat.get(self.index.as_usize()).expect("vertex index out of range")
    }

    #[must_use]
    pub fn lon(self) -> FixedDegrees {
        *self.store.lon.get(self.index.as_usize()).expect("vertex index out of range")
    }

    #[must_use]
    pub fn coord(self) -> Coord<f64> {
        coord_from_fixed(self.lat(), self.lon())
    }

    #[must_use]
    pub fn flags(self) -> EnumSet<VertexFlag> {
        *self.store.flags.get(self.index.as_usize()).expect("vertex index out of range")
    }

    #[must_use]
    pub fn has_flag(self, flag: VertexFlag) -> bool {
        self.flags().contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_vertex_assigns_permanent_sequential_indices() {
        let mut store = VertexStore::new();
        let a = store.add_vertex(40.0, -73.0);
        let b = store.add_vertex(41.0, -74.0);
        assert_eq!(a.0, 0);
        assert_eq!(b.0, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn cursor_reads_back_coordinates_to_micro_precision() {
        let mut store = VertexStore::new();
        let idx = store.add_vertex(40.7128, -74.0060);
        let cursor = store.cursor(idx);
        assert!((cursor.lat().to_degrees() - 40.7128).abs() < 1e-6);
        assert!((cursor.lon().to_degrees() + 74.0060).abs() < 1e-6);
    }

    #[test]
    fn flags_set_and_clear_independently() {
        let mut store = VertexStore::new();
        let idx = store.add_vertex(0.0, 0.0);
        store.set_flag(idx, VertexFlag::TrafficSignal);
        store.set_flag(idx, VertexFlag::BikeShare);
        assert!(store.cursor(idx).has_flag(VertexFlag::TrafficSignal));
        store.clear_flag(idx, VertexFlag::TrafficSignal);
        assert!(!store.cursor(idx).has_flag(VertexFlag::TrafficSignal));
        assert!(store.cursor(idx).has_flag(VertexFlag::BikeShare));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn cursor_panics_on_out_of_range_index() {
        let store = VertexStore::new();
        let _ = store.cursor(VertexIndex::new(0));
    }

    #[test]
    fn extend_from_shares_frozen_base_and_accepts_new_appends() {
        let mut baseline = VertexStore::new();
        baseline.add_vertex(1.0, 1.0);
        baseline.add_vertex(2.0, 2.0);
        baseline.compact_into_base();
        assert_eq!(baseline.base_len(), 2);

        let mut scenario = baseline.extend_from();
        assert_eq!(scenario.len(), 2);
        let appended = scenario.add_vertex(3.0, 3.0);
        assert_eq!(appended.0, 2);
        assert_eq!(scenario.len(), 3);
        // The baseline is untouched by the scenario's append.
        assert_eq!(baseline.len(), 2);
    }
}
