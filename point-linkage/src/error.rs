//! The linkage crate's public-boundary error type.
//!
//! Matches `street_graph::GraphError`'s shape (spec.md §7): one variant per
//! failure mode. Per spec.md §4.5/§7, an individual point failing to link
//! is not an error — it's recorded as `edge = None` in the linkage and
//! surfaces as an unreachable travel time. This enum exists only for misuse
//! of the crate's own API.

#[derive(Debug, thiserror::Error)]
pub enum LinkageError {
    #[error("point index {0} is out of range for this point set (len {1})")]
    PointOutOfRange(usize, usize),

    #[error("stop index {0} is out of range for this transit layer (stop count {1})")]
    StopOutOfRange(usize, usize),

    #[error("cannot relink against a base linkage built for a different point count ({base_len} vs {current_len})")]
    MismatchedPointCount { base_len: usize, current_len: usize },
}
