//! The search crate's public-boundary error type.
//!
//! Matches `street_graph::GraphError`'s shape: one variant per failure mode,
//! no string-formatted catch-all. Per spec.md §7, a router never fails a
//! search for data-quality reasons (unreachable targets are a sentinel
//! `None`, not an error) — this enum exists only for misuse of the request
//! itself.

use street_graph::VertexIndex;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("seed vertex {0} is out of range for the routed street layer")]
    VertexOutOfRange(VertexIndex),

    #[error("seed point ({lat}, {lon}) did not link to any edge within the search radius")]
    UnlinkedSeedPoint { lat: f64, lon: f64 },
}
