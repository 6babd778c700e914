//! Turn restrictions and the forward/reverse-search restriction tables.
//!
//! A restriction names a `fromEdge`, a `toEdge`, and an ordered (possibly
//! empty) list of `viaEdges` that must be traversed in between — a
//! multi-way "via-way" restriction. `only` marks the restriction as the
//! single permitted turn rather than a forbidden one.

use std::collections::HashMap;

use crate::indices::EdgeIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRestriction {
    pub from_edge: EdgeIndex,
    pub to_edge: EdgeIndex,
    pub via_edges: Vec<EdgeIndex>,
    pub only: bool,
}

impl TurnRestriction {
    /// The edge a traversal must be at (consuming position `position`) to
    /// satisfy this restriction's path: `via_edges[position]` when still
    /// mid-via, `to_edge` once every via edge has been consumed.
    #[must_use]
    pub fn edge_at_position(&self, position: usize) -> EdgeIndex {
        self.via_edges.get(position).copied().unwrap_or(self.to_edge)
    }

    #[must_use]
    pub fn final_position(&self) -> usize {
        self.via_edges.len()
    }

    fn reversed(&self) -> Self {
        let from_edge = self.to_edge.opposite();
        let to_edge = self.from_edge.opposite();
        let via_edges = self.via_edges.iter().rev().map(|e| e.opposite()).collect();
        Self { from_edge, to_edge, via_edges, only: self.only }
    }
}

/// A restriction lookup keyed by `from_edge`, with cheap index-based access
/// to avoid cloning restrictions into every directed edge's bucket.
#[derive(Debug, Clone, Default)]
pub struct TurnRestrictionTable {
    restrictions: Vec<TurnRestriction>,
    by_from_edge: HashMap<EdgeIndex, Vec<u32>>,
}

impl TurnRestrictionTable {
    #[must_use]
    pub fn new(restrictions: Vec<TurnRestriction>) -> Self {
        let mut by_from_edge: HashMap<EdgeIndex, Vec<u32>> = HashMap::new();
        for (i, r) in restrictions.iter().enumerate() {
            by_from_edge
                .entry(r.from_edge)
                .or_default()
                .push(u32::try_from(i).expect("restriction count overflow"));
        }
        Self { restrictions, by_from_edge }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: u32) -> &TurnRestriction {
        &self.restrictions[index as usize]
    }

    /// Restrictions that begin at `from_edge`, as `(index, restriction)`
    /// pairs — the index is what a router's per-state progress map keys on.
    pub fn restrictions_starting_at(&self, from_edge: EdgeIndex) -> impl Iterator<Item = (u32, &TurnRestriction)> {
        self.by_from_edge
            .get(&from_edge)
            .into_iter()
            .flatten()
            .map(move |&i| (i, &self.restrictions[i as usize]))
    }

    /// Builds the table used for reverse search: every directed edge is
    /// reversed (`from`/`to`/`via` swapped and mirrored to the opposite
    /// direction), and every `only` restriction is expanded into a set of
    /// `no` restrictions covering every sibling turn but the one the
    /// original restriction designated as mandatory.
    ///
    /// `siblings(edge)` must return every directed edge departing from
    /// `edge`'s destination vertex (what the forward table would call
    /// `edge`'s out-edges) — the table itself holds no adjacency.
    #[must_use]
    pub fn build_reverse(&self, siblings: impl Fn(EdgeIndex) -> Vec<EdgeIndex>) -> Self {
        let mut reversed = Vec::with_capacity(self.restrictions.len());
        for r in &self.restrictions {
            let rev = r.reversed();
            if !rev.only {
                reversed.push(rev);
                continue;
            }
            let designated = rev.edge_at_position(0);
            for sibling in siblings(rev.from_edge) {
                if sibling != designated {
                    reversed.push(TurnRestriction {
                        from_edge: rev.from_edge,
                        to_edge: sibling,
                        via_edges: Vec::new(),
                        only: false,
                    });
                }
            }
        }
        Self::new(reversed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indices::EdgePairIndex;

    fn e(pair: u32, backward: bool) -> EdgeIndex {
        let p = EdgePairIndex::new(pair);
        if backward { p.backward() } else { p.forward() }
    }

    #[test]
    fn restrictions_starting_at_groups_by_from_edge() {
        let table = TurnRestrictionTable::new(vec![
            TurnRestriction { from_edge: e(0, false), to_edge: e(1, false), via_edges: vec![], only: false },
            TurnRestriction { from_edge: e(0, false), to_edge: e(2, false), via_edges: vec![], only: false },
            TurnRestriction { from_edge: e(3, false), to_edge: e(4, false), via_edges: vec![], only: false },
        ]);
        let starting_at_0: Vec<_> = table.restrictions_starting_at(e(0, false)).collect();
        assert_eq!(starting_at_0.len(), 2);
        assert!(table.restrictions_starting_at(e(9, false)).next().is_none());
    }

    #[test]
    fn reversing_a_no_restriction_table_twice_recovers_the_original() {
        let original = vec![TurnRestriction {
            from_edge: e(0, false),
            to_edge: e(2, false),
            via_edges: vec![e(1, false)],
            only: false,
        }];
        let table = TurnRestrictionTable::new(original.clone());
        let no_siblings = |_: EdgeIndex| Vec::new();
        let reversed_twice = table.build_reverse(&no_siblings).build_reverse(&no_siblings);
        assert_eq!(reversed_twice.restrictions, table.restrictions);
    }

    #[test]
    fn only_restriction_expands_to_no_restrictions_for_every_other_sibling() {
        let table = TurnRestrictionTable::new(vec![TurnRestriction {
            from_edge: e(0, false),
            to_edge: e(1, false),
            via_edges: vec![],
            only: true,
        }]);
        // reversed "from" edge is e(1, false).opposite() == e(1, true)
        let reversed_from = e(1, false).opposite();
        let siblings = move |edge: EdgeIndex| {
            if edge == reversed_from {
                vec![e(0, false).opposite(), e(5, false), e(6, false)]
            } else {
                Vec::new()
            }
        };
        let reverse_table = table.build_reverse(siblings);
        assert_eq!(reverse_table.len(), 2);
        for r in &reverse_table.restrictions {
            assert!(!r.only);
            assert_eq!(r.from_edge, reversed_from);
            assert_ne!(r.to_edge, e(0, false).opposite());
        }
    }
}
