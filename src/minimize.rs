//! DFA minimization by table filling.
//!
//! Distinguishability is tracked in an upper-triangular table over state
//! pairs in canonical `(min, max)` ID order; unmarked pairs are merged with
//! a union-find and the quotient automaton is rebuilt from one
//! representative per class.

use crate::dfa::{Alphabet, Dfa, DfaState, Label, StateID};

/// Minimize a DFA over the alphabet Σ.
///
/// For token DFAs, states with different accept labels are never merged, so
/// minimization preserves which token each final state produces.
pub fn minimize(dfa: &Dfa, alphabet: &Alphabet) -> Dfa {
    let n = dfa.len();
    let id = StateID::from_index;

    let mut table = PairTable::new(n);

    // Pairs with different finality or different token labels are
    // distinguishable from the start.
    for j in 1..n {
        for i in 0..j {
            let (a, b) = (dfa.state(id(i)), dfa.state(id(j)));
            if a.is_final() != b.is_final() || !same_label(a.label(), b.label()) {
                table.mark(i, j);
            }
        }
    }

    // Propagate distinguishability backwards along transitions until the
    // table is stable.
    let mut changed = true;
    while changed {
        changed = false;
        for j in 1..n {
            for i in 0..j {
                if table.marked(i, j) {
                    continue;
                }
                let distinguishable = alphabet.iter().any(|&c| {
                    let ta = dfa.state(id(i)).transition(c);
                    let tb = dfa.state(id(j)).transition(c);
                    match (ta, tb) {
                        (Some(ta), Some(tb)) => {
                            ta != tb && table.marked(ta.index(), tb.index())
                        }
                        (None, None) => false,
                        _ => true,
                    }
                });
                if distinguishable {
                    table.mark(i, j);
                    changed = true;
                }
            }
        }
    }

    // Merge every unmarked pair.
    let mut classes = UnionFind::new(n);
    for j in 1..n {
        for i in 0..j {
            if !table.marked(i, j) {
                classes.union(i, j);
            }
        }
    }

    // Rebuild the quotient automaton. Class IDs are assigned in first-seen
    // order over the original IDs, and each class inherits finality, label
    // and transitions from its lowest-ID representative.
    let mut class_ids: Vec<Option<StateID>> = vec![None; n];
    let mut class_of: Vec<StateID> = vec![StateID::from_index(0); n];
    let mut representatives: Vec<usize> = Vec::new();
    for i in 0..n {
        let root = classes.find(i);
        class_of[i] = match class_ids[root] {
            Some(class) => class,
            None => {
                let class = id(representatives.len());
                class_ids[root] = Some(class);
                representatives.push(i);
                class
            }
        };
    }

    let mut states: Vec<DfaState> = representatives
        .iter()
        .map(|&rep| {
            let s = dfa.state(id(rep));
            DfaState::new(s.nfa_states().to_vec(), s.is_final(), s.label().cloned())
        })
        .collect();
    for (new_index, &rep) in representatives.iter().enumerate() {
        for (c, to) in dfa.state(id(rep)).transitions() {
            states[new_index].insert_transition(c, class_of[to.index()]);
        }
    }

    tracing::debug!(before = n, after = states.len(), "minimized DFA");

    let start = class_of[dfa.start().index()];
    Dfa::from_parts(states, start)
}

fn same_label(a: Option<&Label>, b: Option<&Label>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.token == b.token && a.skip == b.skip,
        _ => false,
    }
}

/// Upper-triangular bit table over unordered state pairs.
struct PairTable {
    marks: Vec<bool>,
}

impl PairTable {
    fn new(n: usize) -> Self {
        Self {
            marks: vec![false; n * n.saturating_sub(1) / 2],
        }
    }

    fn slot(i: usize, j: usize) -> usize {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        hi * (hi - 1) / 2 + lo
    }

    fn mark(&mut self, i: usize, j: usize) {
        self.marks[Self::slot(i, j)] = true;
    }

    fn marked(&self, i: usize, j: usize) -> bool {
        i != j && self.marks[Self::slot(i, j)]
    }
}

/// Union-find with path compression and naive union.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut i = i;
        while self.parent[i] != root {
            let next = self.parent[i];
            self.parent[i] = root;
            i = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{subset, subset_tokens};
    use crate::nfa::Nfa;

    fn alphabet(chars: &str) -> Alphabet {
        chars.chars().collect()
    }

    #[test]
    fn kleene_star_collapses_to_one_state() {
        let nfa = Nfa::compile("a*").unwrap();
        let sigma = alphabet("a");
        let dfa = subset(&nfa, &sigma);
        assert!(dfa.len() >= 2);

        let minimized = minimize(&dfa, &sigma);
        assert_eq!(minimized.len(), 1);
        assert!(minimized.state(minimized.start()).is_final());
        assert!(minimized.accepts(""));
        assert!(minimized.accepts("aaaa"));
    }

    #[test]
    fn language_is_preserved() {
        let nfa = Nfa::compile("(a|b)*abb").unwrap();
        let sigma = alphabet("ab");
        let dfa = subset(&nfa, &sigma);
        let minimized = minimize(&dfa, &sigma);

        // the minimal automaton for (a|b)*abb is the four-state suffix tracker
        assert_eq!(minimized.len(), 4);
        for input in ["abb", "aabb", "babb", "abababb", "", "ab", "abba", "bba"] {
            assert_eq!(
                minimized.accepts(input),
                nfa.accepts(input),
                "diverged on {:?}",
                input
            );
        }
    }

    #[test]
    fn minimization_is_idempotent() {
        let nfa = Nfa::compile("a(b|c)*").unwrap();
        let sigma = alphabet("abc");
        let once = minimize(&subset(&nfa, &sigma), &sigma);
        let twice = minimize(&once, &sigma);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.to_string(), twice.to_string());
    }

    #[test]
    fn distinct_token_labels_stay_apart() {
        let rules = vec![
            (
                Nfa::compile("a").unwrap(),
                Label {
                    token: "A".into(),
                    priority: 0,
                    skip: false,
                },
            ),
            (
                Nfa::compile("b").unwrap(),
                Label {
                    token: "B".into(),
                    priority: 0,
                    skip: false,
                },
            ),
        ];
        let sigma = alphabet("ab");
        let dfa = subset_tokens(&rules, &sigma);
        let minimized = minimize(&dfa, &sigma);

        // both accepting states survive: merging them would lose the label
        assert_eq!(minimized.len(), 3);
        let a = minimized.state(minimized.start()).transition('a').unwrap();
        let b = minimized.state(minimized.start()).transition('b').unwrap();
        assert_ne!(a, b);
        assert_eq!(minimized.state(a).label().unwrap().token, "A");
        assert_eq!(minimized.state(b).label().unwrap().token, "B");
    }
}
