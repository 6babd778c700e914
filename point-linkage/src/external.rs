//! Interfaces to collaborators this crate consumes but does not implement:
//! the transit (GTFS) layer and point-set sources (grids, feature
//! collections). Out of scope per spec.md §1 — represented here purely as
//! the shape [`crate::linkage::PointLinkage`] and the egress-table builder
//! need, mirroring `street_graph::external`'s same treatment of OSM
//! collaborators.

use geo::Rect;
use street_graph::VertexIndex;

/// An indexed, read-only collection of geographic points: a grid of raster
/// cells, a GTFS stop list, a set of population-weighted feature centroids,
/// or anything else a caller wants travel times computed for.
pub trait PointSet: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lat(&self, index: usize) -> f64;
    fn lon(&self, index: usize) -> f64;

    /// Indices of every point whose coordinate falls within `envelope`.
    /// A naive point set can implement this as a linear scan; a grid or
    /// indexed set can do better (see [`GridPointSet`]).
    fn indices_in_envelope(&self, envelope: Rect<f64>) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| {
                let (lat, lon) = (self.lat(i), self.lon(i));
                lon >= envelope.min().x && lon <= envelope.max().x && lat >= envelope.min().y && lat <= envelope.max().y
            })
            .collect()
    }
}

/// A [`PointSet`] additionally describing itself as a regular raster grid
/// (spec.md §6: "Grids additionally expose `(west, north, width, height,
/// zoom)`"), which lets a caller address a sub-rectangle of cells by row and
/// column instead of scanning the whole set.
pub trait GridPointSet: PointSet {
    fn west(&self) -> f64;
    fn north(&self) -> f64;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn zoom(&self) -> u8;

    /// The flat point-set index of grid cell `(column, row)`.
    fn index_of(&self, column: u32, row: u32) -> usize {
        (row as usize) * (self.width() as usize) + (column as usize)
    }
}

/// The transit layer's stop bindings, consumed opaquely by egress-table
/// construction (spec.md §1: "the transit layer, consumed only as an opaque
/// provider of stop→vertex bindings and stop→vertex distance tables").
pub trait TransitLayer: Sync {
    fn stop_count(&self) -> usize;

    /// The street vertex a stop was linked to during transit-layer build
    /// (spec.md §6: `stopToStreetVertex`).
    fn stop_to_street_vertex(&self, stop_index: usize) -> VertexIndex;

    /// A precomputed map from reachable vertex to along-street distance in
    /// millimeters (spec.md §6: `stopToVertexDistance`), queried by vertex.
    fn stop_to_vertex_distance_mm(&self, stop_index: usize, vertex: VertexIndex) -> Option<i32>;

    fn stop_lat(&self, stop_index: usize) -> f64;
    fn stop_lon(&self, stop_index: usize) -> f64;
}
