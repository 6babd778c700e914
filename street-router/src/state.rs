//! Search state and the small per-state turn-restriction progress map.
//!
//! Mirrors the teacher's `EdgeLabel` (the per-expansion record `valinor-sif`
//! threads through its `Costing` trait), with `backEdge`/`backState` playing
//! the role of `EdgeLabel::predecessor` for path reconstruction, generalized
//! with the turn-restriction bookkeeping spec.md §4.4 requires.

use street_graph::{EdgeIndex, StreetMode, VertexIndex};

use crate::request::DominanceVariable;

/// `backEdge`/turn-restriction keys are directed-edge indices widened to
/// `i64` so seed states can carry a unique negative synthetic id (spec.md
/// §4.4: "use a unique synthetic backEdge < 0 for each seed to prevent
/// mutual domination") without the best-state table confusing two seeds
/// for the same edge.
pub type EdgeKey = i64;

#[must_use]
pub fn edge_key(edge: EdgeIndex) -> EdgeKey {
    i64::from(edge.0)
}

/// Per-state progress through zero or more simultaneously active turn
/// restrictions: `(restriction_index, via_edges_consumed)`. Spec.md §9 notes
/// at most ~2 are active in practice, so a linearly-scanned `Vec` beats a
/// `BTreeMap`'s allocation and ordering overhead at this size.
pub type TurnRestrictionProgress = Vec<(u32, u16)>;

/// One label-correcting search state (spec.md §4.4 "State").
#[derive(Debug, Clone)]
pub struct State {
    pub vertex: VertexIndex,
    /// The directed edge this state arrived by, or a unique negative
    /// synthetic id for a seed state not associated with any real edge.
    pub back_edge: EdgeKey,
    /// Arena index (in [`crate::router::StreetRouter`]'s state arena) of the
    /// state this one was expanded from; `None` for a seed.
    pub back_state: Option<usize>,
    pub duration_s: i64,
    pub weight: f64,
    pub distance_mm: i64,
    pub mode: StreetMode,
    pub turn_restrictions: TurnRestrictionProgress,
}

impl State {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dominance_value(&self, variable: DominanceVariable) -> f64 {
        match variable {
            DominanceVariable::TimeSeconds => self.duration_s as f64,
            DominanceVariable::GeneralizedWeight => self.weight,
            DominanceVariable::DistanceMillimeters => self.distance_mm as f64,
        }
    }

    /// The normalized signature used for dominance comparisons: positions
    /// only, sorted by restriction index. Empty means "no active
    /// restriction" — the "free" state the dominance rule treats specially.
    #[must_use]
    pub fn restriction_signature(&self) -> TurnRestrictionProgress {
        let mut sig = self.turn_restrictions.clone();
        sig.sort_unstable_by_key(|&(idx, _)| idx);
        sig
    }
}
