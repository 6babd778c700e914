//! Point-to-street linkage and transit stop egress tables.
//!
//! Projects an external point set (a raster grid, a feature collection, a
//! transit stop list) onto a frozen [`street_graph::StreetLayer`] and
//! evaluates per-point travel times from a set of already-reached street
//! vertices. [`egress`] builds on top of a linkage to extend a transit
//! layer's stop→vertex distance tables into stop→point egress tables.
//!
//! This crate never runs a graph search itself — it consumes whatever
//! reached-vertex travel times `street_router` (or the transit layer's own
//! build step) already produced.

pub mod egress;
pub mod error;
pub mod external;
pub mod linkage;

pub use egress::EgressCostTable;
pub use error::LinkageError;
pub use external::{GridPointSet, PointSet, TransitLayer};
pub use linkage::PointLinkage;
