//! Error enums for the graph store, one per public boundary.
//!
//! Matches the teacher's `InvalidGraphIdError` / `GraphTileProviderError`
//! shape: one variant per failure mode, `#[error("...")]` messages, no
//! string-formatted catch-all.

use crate::indices::VertexIndex;

/// Failures building or mutating the baseline graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("edge length {length_mm}mm exceeds the representable maximum")]
    LengthOutOfRange { length_mm: i64 },

    #[error("vertex index {0} is out of range for this store")]
    VertexOutOfRange(VertexIndex),
}

/// Failures specific to writing through an [`crate::append_only::AppendOnlyColumn`]
/// overlaid on a frozen baseline.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("index {0} falls within the immutable baseline and cannot be modified")]
    BaselineIsImmutable(usize),
}
