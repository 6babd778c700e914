//! The label-correcting Dijkstra search (spec.md §4.4).
//!
//! Hand-rolled over a `BinaryHeap`, grounded on the ad hoc `dijkstra()` in
//! the teacher's `valinor-map-match/src/main.rs`: a local `State` struct
//! ordered by reversed `PartialOrd` so a max-heap behaves as a min-heap,
//! pushed/popped without a generic shortest-path crate. `valinor-sif`'s
//! `Costing` trait plus `pathfinding::astar` isn't reused here because the
//! per-directed-edge dominance rule (several co-dominant states per edge
//! while a turn restriction is in progress) doesn't fit a generic
//! single-state-per-node visited set.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use street_graph::{EdgeFlag, EdgeIndex, Split, StreetLayer, StreetMode, VertexFlag, VertexIndex};

use crate::error::RouterError;
use crate::request::{DominanceVariable, RoutingRequest};
use crate::state::{edge_key, EdgeKey, State, TurnRestrictionProgress};
use crate::turn_cost::car_turn_cost_seconds;

/// One entry in a directed edge's stored-state list: enough to compare
/// dominance (`value`, `signature`) without re-borrowing the arena.
struct StoredState {
    arena_index: usize,
    value: f64,
    signature: TurnRestrictionProgress,
}

/// Min-heap entry. `Ord`/`PartialOrd` are reversed relative to `value` the
/// same way the teacher's `State` reverses `partial_cmp` so `BinaryHeap`
/// (a max-heap) pops the smallest dominance value first.
struct HeapEntry {
    value: f64,
    arena_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.value.partial_cmp(&self.value)
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// A single label-correcting search over one [`StreetLayer`] borrowed
/// read-only (spec.md §5: "query search is strictly single-threaded per
/// instance; no synchronization inside the search loop").
pub struct StreetRouter<'a> {
    layer: &'a StreetLayer,
    request: RoutingRequest,
    arena: Vec<State>,
    best_at_edge: HashMap<EdgeKey, Vec<StoredState>>,
    seeds_by_vertex: HashMap<VertexIndex, Vec<usize>>,
    queue: BinaryHeap<HeapEntry>,
    best_value_at_destination: Option<f64>,
    next_synthetic_back_edge: EdgeKey,
}

impl<'a> StreetRouter<'a> {
    #[must_use]
    pub fn new(layer: &'a StreetLayer, request: RoutingRequest) -> Self {
        Self {
            layer,
            request,
            arena: Vec::new(),
            best_at_edge: HashMap::new(),
            seeds_by_vertex: HashMap::new(),
            queue: BinaryHeap::new(),
            best_value_at_destination: None,
            next_synthetic_back_edge: -1,
        }
    }

    #[must_use]
    pub fn request(&self) -> &RoutingRequest {
        &self.request
    }

    fn next_seed_key(&mut self) -> EdgeKey {
        let key = self.next_synthetic_back_edge;
        self.next_synthetic_back_edge -= 1;
        key
    }

    /// Vertex seed: a single state with a unique negative synthetic
    /// `backEdge` (spec.md §4.4).
    ///
    /// # Errors
    /// Returns [`RouterError::VertexOutOfRange`] if `vertex` does not exist
    /// in the routed layer, rather than letting a later lookup panic.
    pub fn seed_vertex(&mut self, vertex: VertexIndex) -> Result<(), RouterError> {
        if vertex.as_usize() >= self.layer.vertices().len() {
            return Err(RouterError::VertexOutOfRange(vertex));
        }
        let back_edge = self.next_seed_key();
        self.insert_and_enqueue(State {
            vertex,
            back_edge,
            back_state: None,
            duration_s: 0,
            weight: 0.0,
            distance_mm: 0,
            mode: self.request.mode,
            turn_restrictions: Vec::new(),
        });
        Ok(())
    }

    /// Point seed: one state per endpoint of `split`, weighted by the
    /// along-edge distance at walking speed (spec.md §4.4).
    #[allow(clippy::cast_precision_loss)]
    pub fn seed_split(&mut self, split: Split) {
        let walk_speed = self.request.walk_speed_mps.max(1e-6);
        for (vertex, along_mm) in [(split.vertex0, split.distance0_mm), (split.vertex1, split.distance1_mm)] {
            let duration_s = (f64::from(along_mm) / 1000.0 / walk_speed).round() as i64;
            let back_edge = self.next_seed_key();
            self.insert_and_enqueue(State {
                vertex,
                back_edge,
                back_state: None,
                duration_s,
                weight: duration_s as f64,
                distance_mm: i64::from(along_mm),
                mode: self.request.mode,
                turn_restrictions: Vec::new(),
            });
        }
    }

    /// Point seed from raw coordinates: locates `(lat, lon)` on this
    /// router's own layer with [`StreetLayer::find_split`] and seeds both
    /// endpoints of the resulting split (spec.md §4.4 "Point seed").
    ///
    /// # Errors
    /// Returns [`RouterError::UnlinkedSeedPoint`] if nothing within
    /// `radius_m` permits the request's mode — the resolution-failure
    /// spec.md §7 describes for `findSplit`, surfaced here since this is
    /// itself the caller a bare `None` would otherwise leave unhandled.
    pub fn seed_point(&mut self, lat: f64, lon: f64, radius_m: f64) -> Result<(), RouterError> {
        match self.layer.find_split(lat, lon, radius_m, self.request.mode) {
            Some(split) => {
                self.seed_split(split);
                Ok(())
            }
            None => Err(RouterError::UnlinkedSeedPoint { lat, lon }),
        }
    }

    /// Multi-origin seed: a prior search's reached vertex, carried forward
    /// with an added mode-switch time/cost (spec.md §4.4).
    pub fn seed_multi_origin(&mut self, vertex: VertexIndex, switch_time_s: i64, switch_weight: f64) {
        let back_edge = self.next_seed_key();
        self.insert_and_enqueue(State {
            vertex,
            back_edge,
            back_state: None,
            duration_s: switch_time_s,
            weight: switch_weight,
            distance_mm: 0,
            mode: self.request.mode,
            turn_restrictions: Vec::new(),
        });
    }

    /// Runs the search to completion (or until target pruning/limits stop
    /// further expansion). A no-op with a warning if no seed was pushed.
    pub fn route(&mut self) {
        if self.arena.is_empty() {
            tracing::warn!("street-router search started with an empty seed set");
            return;
        }
        loop {
            if let Some(best) = self.best_value_at_destination {
                match self.queue.peek() {
                    Some(top) if top.value > best => break,
                    Some(_) => {}
                    None => break,
                }
            }
            let Some(popped) = self.queue.pop() else { break };
            if !self.is_current(popped.arena_index) {
                continue;
            }
            self.expand(popped.arena_index);
        }
    }

    fn restriction_table(&self) -> &street_graph::TurnRestrictionTable {
        if self.request.reverse {
            self.layer.reverse_turn_restrictions()
        } else {
            self.layer.turn_restrictions()
        }
    }

    fn expand(&mut self, arena_index: usize) {
        let state = self.arena[arena_index].clone();

        if let Some(target) = self.request.target_vertex {
            if state.vertex == target {
                let v = state.dominance_value(self.request.dominance);
                self.best_value_at_destination = Some(self.best_value_at_destination.map_or(v, |b| b.min(v)));
            }
        }

        let edges: Vec<EdgeIndex> = if self.request.reverse {
            self.layer.incoming_edges(state.vertex).map(EdgeIndex::opposite).collect()
        } else {
            self.layer.outgoing_edges(state.vertex).collect()
        };
        for edge in edges {
            self.try_relax(arena_index, &state, edge);
        }
    }

    fn resolve_mode(&self, parent_mode: StreetMode, view: street_graph::EdgeView<'_>) -> Option<StreetMode> {
        if parent_mode != StreetMode::Bicycle {
            return Some(parent_mode);
        }
        match EdgeFlag::lts(view.flags()) {
            Some(lts) if lts > self.request.bike_lts_threshold => {
                if view.flag(EdgeFlag::AllowsPedestrian) {
                    Some(StreetMode::Walk)
                } else {
                    None
                }
            }
            _ => Some(StreetMode::Bicycle),
        }
    }

    fn effective_speed_mps(&self, edge: EdgeIndex, mode: StreetMode, view: &street_graph::EdgeView<'_>) -> f64 {
        match mode {
            StreetMode::Car => view.speed_mps(),
            StreetMode::Walk | StreetMode::Bicycle => {
                let base = if mode == StreetMode::Walk { self.request.walk_speed_mps } else { self.request.bike_speed_mps };
                let factor = self.request.speed_factor.as_ref().map_or(1.0, |f| f(edge));
                base * factor
            }
        }
    }

    /// Consumes a step of every turn restriction the incoming state carries,
    /// and installs any restriction starting at `edge`. `None` means the
    /// turn is forbidden outright (spec.md §4.4 `canTurnFrom`).
    fn can_turn_from(&self, parent: &State, edge: EdgeIndex) -> Option<TurnRestrictionProgress> {
        let table = self.restriction_table();
        let mut next = TurnRestrictionProgress::new();
        for &(idx, pos) in &parent.turn_restrictions {
            let restriction = table.get(idx);
            let expected = restriction.edge_at_position(usize::from(pos));
            if edge == expected {
                if usize::from(pos) == restriction.final_position() {
                    if !restriction.only {
                        return None;
                    }
                    // "only" satisfied: consumed, drop from the progress map.
                } else {
                    next.push((idx, pos + 1));
                }
            } else if restriction.only {
                return None;
            }
        }
        for (idx, _restriction) in table.restrictions_starting_at(edge) {
            if !next.iter().any(|&(existing, _)| existing == idx) {
                next.push((idx, 0));
            }
        }
        Some(next)
    }

    #[allow(clippy::cast_precision_loss)]
    fn try_relax(&mut self, parent_idx: usize, parent: &State, edge: EdgeIndex) {
        let view = self.layer.edges().read(edge);

        let Some(mode) = self.resolve_mode(parent.mode, view) else { return };
        if !view.flag(EdgeFlag::allows_for_mode(mode)) {
            return;
        }
        if self.request.wheelchair && mode == StreetMode::Walk && !view.flag(EdgeFlag::AllowsWheelchair) {
            return;
        }

        if let Some(prev_view) = self.real_back_edge_view(parent.back_edge) {
            if prev_view.flag(EdgeFlag::Link) && view.flag(EdgeFlag::Link) {
                return;
            }
        }

        let Some(new_restrictions) = self.can_turn_from(parent, edge) else { return };

        let effective_speed = self.effective_speed_mps(edge, mode, &view).max(1e-6);
        let traverse_time_s = (f64::from(view.length_mm()) / 1000.0 / effective_speed).round() as i64;

        let turn_time_s = if mode == StreetMode::Car {
            self.real_back_edge_view(parent.back_edge)
                .map_or(0.0, |prev_view| car_turn_cost_seconds(prev_view.out_angle(), view.in_angle(), self.request.drive_side))
        } else {
            0.0
        };

        let additive_cost: f64 = self.request.cost_fields.iter().map(|f| f(edge)).sum();

        let mut duration_s = parent.duration_s + traverse_time_s + (turn_time_s.round() as i64);
        let mut distance_mm = parent.distance_mm + i64::from(view.length_mm());
        let weight = parent.weight + traverse_time_s as f64 + turn_time_s + additive_cost;

        // Anti-zero-delta nudge (spec.md §9 open question: exact policy is
        // unspecified upstream; this reproduces "increment by 1 unit when
        // time or distance does not increase", applied independently to
        // each dimension so a state that only nudges distance still sorts
        // ahead of one that nudges both).
        if duration_s <= parent.duration_s {
            duration_s = parent.duration_s + 1;
        }
        if distance_mm <= parent.distance_mm {
            distance_mm = parent.distance_mm + 1;
        }

        if let Some(limit) = self.request.distance_limit_mm {
            if limit > 0 && distance_mm > limit {
                return;
            }
        }
        if let Some(limit) = self.request.time_limit_s {
            if limit > 0 && duration_s > limit {
                return;
            }
        }

        self.insert_and_enqueue(State {
            vertex: view.to_vertex(),
            back_edge: edge_key(edge),
            back_state: Some(parent_idx),
            duration_s,
            weight,
            distance_mm,
            mode,
            turn_restrictions: new_restrictions,
        });
    }

    fn real_back_edge_view(&self, back_edge: EdgeKey) -> Option<street_graph::EdgeView<'_>> {
        if back_edge < 0 {
            return None;
        }
        let raw = u32::try_from(back_edge).expect("non-negative back_edge fits in u32");
        Some(self.layer.edges().read(EdgeIndex::new(raw)))
    }

    /// Inserts `state` into the arena and the per-edge stored-state table,
    /// applying the insertion-time dominance rule (spec.md §4.4 rule 2), and
    /// enqueues it if it survives. A lazily-deleted heap entry later found
    /// not to be the current stored state is skipped on pop (the practical
    /// form of rule 1: insertion-time pruning keeps at most one
    /// unconditional "free" winner per edge, so a popped state no longer
    /// present in the table is, by construction, dominated by it).
    fn insert_and_enqueue(&mut self, state: State) {
        let key = state.back_edge;
        let value = state.dominance_value(self.request.dominance);
        let signature = state.restriction_signature();

        let entries = self.best_at_edge.entry(key).or_default();
        for existing in entries.iter() {
            if existing.value <= value && (existing.signature.is_empty() || existing.signature == signature) {
                return;
            }
        }
        entries.retain(|existing| {
            if existing.value > value {
                !existing.signature.is_empty() && existing.signature != signature
            } else {
                true
            }
        });

        let arena_index = self.arena.len();
        let is_seed = state.back_edge < 0;
        let vertex = state.vertex;
        self.arena.push(state);
        self.best_at_edge.get_mut(&key).expect("just inserted above").push(StoredState { arena_index, value, signature });
        if is_seed {
            self.seeds_by_vertex.entry(vertex).or_default().push(arena_index);
        }
        self.queue.push(HeapEntry { value, arena_index });
    }

    fn is_current(&self, arena_index: usize) -> bool {
        let state = &self.arena[arena_index];
        self.best_at_edge
            .get(&state.back_edge)
            .is_some_and(|entries| entries.iter().any(|e| e.arena_index == arena_index))
    }

    /// Lowest-dominance-variable state among those stored at `e`.
    #[must_use]
    pub fn state_at_edge(&self, edge: EdgeIndex) -> Option<&State> {
        self.best_at_edge
            .get(&edge_key(edge))
            .into_iter()
            .flatten()
            .filter(|e| self.is_current(e.arena_index))
            .min_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal))
            .map(|e| &self.arena[e.arena_index])
    }

    fn states_arriving_at(&self, vertex: VertexIndex) -> impl Iterator<Item = &State> + '_ {
        let via_edges = self.layer.incoming_edges(vertex).filter_map(|e| self.state_at_edge(e));
        let via_seeds = self
            .seeds_by_vertex
            .get(&vertex)
            .into_iter()
            .flatten()
            .filter(|&&idx| self.is_current(idx))
            .map(|&idx| &self.arena[idx]);
        via_edges.chain(via_seeds)
    }

    /// Minimum over states at each incoming edge of `v` (and any seed placed
    /// directly at `v`).
    #[must_use]
    pub fn state_at_vertex(&self, vertex: VertexIndex) -> Option<&State> {
        self.states_arriving_at(vertex)
            .min_by(|a, b| {
                a.dominance_value(self.request.dominance)
                    .partial_cmp(&b.dominance_value(self.request.dominance))
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// Evaluates both endpoints of `split`, checking the turn onto the split
    /// edge from each stored endpoint state and adding the remaining
    /// along-edge time/turn cost, returning the winner (spec.md §4.4).
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn state_at_split(&self, split: Split) -> Option<State> {
        let mut best: Option<State> = None;
        for (vertex, remaining_mm, edge) in
            [(split.vertex0, split.distance0_mm, split.edge), (split.vertex1, split.distance1_mm, split.edge.opposite())]
        {
            let Some(parent) = self.state_at_vertex(vertex) else { continue };
            if self.can_turn_from(parent, edge).is_none() {
                continue;
            }
            let view = self.layer.edges().read(edge);
            let effective_speed = self.effective_speed_mps(edge, parent.mode, &view).max(1e-6);
            let traverse_time_s = (f64::from(remaining_mm) / 1000.0 / effective_speed).round() as i64;
            let turn_time_s = if parent.mode == StreetMode::Car {
                self.real_back_edge_view(parent.back_edge)
                    .map_or(0.0, |prev_view| car_turn_cost_seconds(prev_view.out_angle(), view.in_angle(), self.request.drive_side))
            } else {
                0.0
            };
            let candidate = State {
                vertex: view.to_vertex(),
                back_edge: edge_key(edge),
                back_state: None,
                duration_s: parent.duration_s + traverse_time_s + (turn_time_s.round() as i64),
                weight: parent.weight + traverse_time_s as f64 + turn_time_s,
                distance_mm: parent.distance_mm + i64::from(remaining_mm),
                mode: parent.mode,
                turn_restrictions: Vec::new(),
            };
            let value = candidate.dominance_value(self.request.dominance);
            if best.as_ref().is_none_or(|b| value < b.dominance_value(self.request.dominance)) {
                best = Some(candidate);
            }
        }
        best
    }

    /// `(stopIndex, value)` for every stop whose bound vertex was reached.
    #[must_use]
    pub fn reached_stops(&self, stop_to_vertex: &[VertexIndex]) -> Vec<(usize, f64)> {
        stop_to_vertex
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| self.state_at_vertex(v).map(|s| (i, s.dominance_value(self.request.dominance))))
            .collect()
    }

    /// Best dominance value per reached vertex.
    #[must_use]
    pub fn reached_vertices(&self) -> HashMap<VertexIndex, f64> {
        let mut best: HashMap<VertexIndex, f64> = HashMap::new();
        for entries in self.best_at_edge.values() {
            for stored in entries {
                let vertex = self.arena[stored.arena_index].vertex;
                best.entry(vertex).and_modify(|v| *v = v.min(stored.value)).or_insert(stored.value);
            }
        }
        best
    }

    /// Best state per reached vertex whose stored [`VertexFlag`] matches.
    #[must_use]
    pub fn reached_vertices_with_flag(&self, flag: VertexFlag) -> HashMap<VertexIndex, State> {
        let mut best: HashMap<VertexIndex, (f64, usize)> = HashMap::new();
        for entries in self.best_at_edge.values() {
            for stored in entries {
                let vertex = self.arena[stored.arena_index].vertex;
                if !self.layer.vertices().cursor(vertex).has_flag(flag) {
                    continue;
                }
                best.entry(vertex)
                    .and_modify(|(value, idx)| {
                        if stored.value < *value {
                            *value = stored.value;
                            *idx = stored.arena_index;
                        }
                    })
                    .or_insert((stored.value, stored.arena_index));
            }
        }
        best.into_iter().map(|(v, (_, idx))| (v, self.arena[idx].clone())).collect()
    }
}
