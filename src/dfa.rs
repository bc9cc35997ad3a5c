//! Subset construction from NFAs to DFAs.
//!
//! A DFA state stands for a ε-closed set of NFA states; the sorted ID
//! vector of that set is the deduplication key, so state numbering only
//! depends on the input automaton and the alphabet order.

use crate::nfa::{self, MergedNfa, Nfa};
use crate::types::{Map, Set};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// The input alphabet Σ. Iteration is in sorted order.
pub type Alphabet = BTreeSet<char>;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Accept label attached to the final states of a token DFA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Token type produced when a match ends in this state.
    pub token: String,
    /// Rule priority; resolves overlaps between patterns.
    pub priority: u32,
    /// Matches are dropped from the token stream (whitespace and the like).
    pub skip: bool,
}

#[derive(Debug, Clone)]
pub struct DfaState {
    /// The ε-closed NFA state set this state stands for, sorted by ID.
    nfa_states: Vec<nfa::StateID>,
    transitions: Map<char, StateID>,
    is_final: bool,
    label: Option<Label>,
}

impl DfaState {
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    pub fn transition(&self, c: char) -> Option<StateID> {
        self.transitions.get(&c).copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (char, StateID)> + '_ {
        self.transitions.iter().map(|(&c, &to)| (c, to))
    }

    pub(crate) fn nfa_states(&self) -> &[nfa::StateID] {
        &self.nfa_states
    }

    pub(crate) fn new(
        nfa_states: Vec<nfa::StateID>,
        is_final: bool,
        label: Option<Label>,
    ) -> Self {
        Self {
            nfa_states,
            transitions: Map::default(),
            is_final,
            label,
        }
    }

    pub(crate) fn insert_transition(&mut self, c: char, to: StateID) {
        self.transitions.insert(c, to);
    }
}

/// A deterministic finite automaton with creation-order state IDs.
#[derive(Debug)]
pub struct Dfa {
    states: Vec<DfaState>,
    start: StateID,
}

impl Dfa {
    pub fn start(&self) -> StateID {
        self.start
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateID) -> &DfaState {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &DfaState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_index(i), state))
    }

    /// Run the automaton over `input` and report whether it ends in an
    /// accepting state.
    pub fn accepts(&self, input: &str) -> bool {
        let mut current = self.start;
        for c in input.chars() {
            match self.state(current).transition(c) {
                Some(next) => current = next,
                None => return false,
            }
        }
        self.state(current).is_final
    }

    pub(crate) fn from_parts(states: Vec<DfaState>, start: StateID) -> Self {
        Self { states, start }
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states() {
            write!(f, "- id: {:02}", id)?;
            if id == self.start {
                f.write_str(" (start)")?;
            }
            if state.is_final {
                f.write_str(" (final)")?;
            }
            if let Some(label) = &state.label {
                write!(f, " [token = {}, priority = {}]", label.token, label.priority)?;
            }
            writeln!(f)?;
            for (c, to) in state.transitions() {
                writeln!(f, "  {:?} -> {:02}", c, to)?;
            }
        }
        Ok(())
    }
}

/// Convert a single-pattern NFA into a DFA over the alphabet Σ.
pub fn subset(nfa: &Nfa, alphabet: &Alphabet) -> Dfa {
    Determinizer {
        states: nfa.states(),
        accepts: &[],
        alphabet,
    }
    .run(nfa.start())
}

/// Convert several rule NFAs into one token DFA.
///
/// The rules are joined below a fresh start state; each DFA state whose set
/// contains the accepting state of some rule is labeled with the rule of
/// strictly greatest priority, earlier rules winning ties.
pub fn subset_tokens(rules: &[(Nfa, Label)], alphabet: &Alphabet) -> Dfa {
    let merged = MergedNfa::new(rules.iter().map(|(nfa, _)| nfa));
    let accepts: Vec<(nfa::StateID, Label)> = merged
        .ends()
        .iter()
        .copied()
        .zip(rules.iter().map(|(_, label)| label.clone()))
        .collect();
    Determinizer {
        states: merged.states(),
        accepts: &accepts,
        alphabet,
    }
    .run(merged.start())
}

struct Determinizer<'a> {
    states: &'a [nfa::State],
    /// `(rule end state, label)` in rule declaration order.
    accepts: &'a [(nfa::StateID, Label)],
    alphabet: &'a Alphabet,
}

impl Determinizer<'_> {
    fn run(&self, start: nfa::StateID) -> Dfa {
        let mut dfa_states: Vec<DfaState> = Vec::new();
        let mut index: Map<Vec<nfa::StateID>, StateID> = Map::default();
        let mut queue = VecDeque::new();

        let mut initial = Set::default();
        initial.insert(start);
        nfa::epsilon_closure(self.states, &mut initial);
        let start_state = self.intern(&mut dfa_states, &mut index, &initial);
        queue.push_back(start_state);

        while let Some(current) = queue.pop_front() {
            let source: Set<nfa::StateID> = dfa_states[current.index()]
                .nfa_states
                .iter()
                .copied()
                .collect();

            for &c in self.alphabet {
                let mut target = nfa::move_on(self.states, &source, c);
                if target.is_empty() {
                    continue;
                }
                nfa::epsilon_closure(self.states, &mut target);

                let known = index.len();
                let id = self.intern(&mut dfa_states, &mut index, &target);
                if index.len() > known {
                    queue.push_back(id);
                }
                dfa_states[current.index()].transitions.insert(c, id);
            }
        }

        tracing::debug!(states = dfa_states.len(), "subset construction finished");

        Dfa {
            states: dfa_states,
            start: start_state,
        }
    }

    /// Look up the DFA state for an ε-closed NFA set, creating it with the
    /// next ID if the set is new.
    fn intern(
        &self,
        dfa_states: &mut Vec<DfaState>,
        index: &mut Map<Vec<nfa::StateID>, StateID>,
        set: &Set<nfa::StateID>,
    ) -> StateID {
        let mut key: Vec<nfa::StateID> = set.iter().copied().collect();
        key.sort_unstable();

        if let Some(&id) = index.get(&key) {
            return id;
        }

        let is_final = key.iter().any(|s| self.states[s.index()].is_final);
        let label = self.resolve_label(set);
        let id = StateID(dfa_states.len() as u32);
        dfa_states.push(DfaState {
            nfa_states: key.clone(),
            transitions: Map::default(),
            is_final,
            label,
        });
        index.insert(key, id);
        id
    }

    fn resolve_label(&self, set: &Set<nfa::StateID>) -> Option<Label> {
        let mut best: Option<&Label> = None;
        for (end, label) in self.accepts {
            if !set.contains(end) {
                continue;
            }
            match best {
                Some(b) if b.priority >= label.priority => {}
                _ => best = Some(label),
            }
        }
        best.cloned()
    }
}
