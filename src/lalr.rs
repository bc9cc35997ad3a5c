//! LALR(1) merging of the canonical LR(1) collection.

use crate::grammar::ProductionID;
use crate::lr1::{Lr1Automaton, State, StateID};
use crate::types::Map;
use std::collections::BTreeSet;

/// An item set stripped of lookaheads. States sharing a kernel are merged.
type Kernel = BTreeSet<(ProductionID, usize)>;

/// Merge LR(1) states by kernel equivalence.
///
/// Items that differ only in lookahead coexist in the merged set. Edges are
/// rewritten through the class map; kernel-equivalent states have
/// kernel-equivalent successors, so rewritten edges never contradict each
/// other. Class IDs are assigned in first-seen order over the input IDs,
/// and the merged start state is the class of the input start state.
///
/// Merging is idempotent: applying it to an already merged automaton
/// returns an equal automaton.
pub fn merge(automaton: &Lr1Automaton) -> Lr1Automaton {
    let mut classes: Map<Kernel, StateID> = Map::default();
    let mut class_of: Map<StateID, StateID> = Map::default();

    for (id, state) in automaton.states() {
        let kernel: Kernel = state
            .items()
            .map(|item| (item.production, item.marker))
            .collect();
        let next = StateID::from_index(classes.len());
        let class = *classes.entry(kernel).or_insert(next);
        class_of.insert(id, class);
    }

    let mut states: Map<StateID, State> = Map::default();
    for (id, state) in automaton.states() {
        let merged = states.entry(class_of[&id]).or_insert_with(|| State {
            items: BTreeSet::new(),
            edges: Map::default(),
        });
        merged.items.extend(state.items().copied());
        for (symbol, target) in state.edges() {
            merged.edges.insert(symbol, class_of[&target]);
        }
    }

    tracing::debug!(
        lr1 = automaton.len(),
        lalr = states.len(),
        "merged kernel-equivalent states"
    );

    Lr1Automaton::from_parts(states, class_of[&automaton.start()])
}
