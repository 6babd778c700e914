//! Per-query configuration: the scalar a search optimizes for, the mode, the
//! soft budgets, and the pluggable cost hooks spec.md §4.4 calls out.
//!
//! Grounded on `valinor_sif::costing::Costing`'s request-shaped configuration
//! struct (walk speed, bike speed, wheelchair flag), generalized with the
//! dominance-variable choice and the reverse-search flag this router adds.

use std::sync::Arc;

use street_graph::{EdgeIndex, StreetMode, VertexIndex};

/// The scalar the priority queue and the best-state table order states by
/// (spec.md glossary: "dominance variable").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominanceVariable {
    TimeSeconds,
    GeneralizedWeight,
    DistanceMillimeters,
}

/// Which side of the road traffic drives on; flips which numeric turn-cost
/// bucket reads as "left" versus "right" (spec.md §4.4's turn-cost table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveSide {
    #[default]
    Right,
    Left,
}

/// An additive generalized-cost contribution evaluated per traversed edge
/// (spec.md: "any registered cost fields, e.g. slope, surface"). Returned
/// seconds are added to a state's weight, never its duration.
pub type CostField = Arc<dyn Fn(EdgeIndex) -> f64 + Send + Sync>;

/// A per-edge multiplier applied to the request's flat walk/bike speed
/// (spec.md §4.4: "optionally multiplied by a per-edge walk/bike factor").
pub type SpeedFactor = Arc<dyn Fn(EdgeIndex) -> f64 + Send + Sync>;

/// The configurable inputs to one [`crate::router::StreetRouter`] search.
#[derive(Clone)]
pub struct RoutingRequest {
    pub dominance: DominanceVariable,
    pub mode: StreetMode,
    pub drive_side: DriveSide,

    pub distance_limit_mm: Option<i64>,
    pub time_limit_s: Option<i64>,

    pub wheelchair: bool,
    /// Bike level-of-traffic-stress threshold, 1-4; edges rated above this
    /// force a walk-the-bike switch (or are skipped if walking isn't
    /// permitted either).
    pub bike_lts_threshold: u8,

    pub walk_speed_mps: f64,
    pub bike_speed_mps: f64,

    pub target_vertex: Option<VertexIndex>,

    /// Reverses adjacency (incoming instead of outgoing) and the
    /// turn-restriction table/sense consulted during expansion.
    pub reverse: bool,

    pub speed_factor: Option<SpeedFactor>,
    pub cost_fields: Vec<CostField>,
}

impl Default for RoutingRequest {
    fn default() -> Self {
        Self {
            dominance: DominanceVariable::TimeSeconds,
            mode: StreetMode::Walk,
            drive_side: DriveSide::Right,
            distance_limit_mm: None,
            time_limit_s: None,
            wheelchair: false,
            bike_lts_threshold: 4,
            walk_speed_mps: 1.0,
            bike_speed_mps: 4.2,
            target_vertex: None,
            reverse: false,
            speed_factor: None,
            cost_fields: Vec::new(),
        }
    }
}
