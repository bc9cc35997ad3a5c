//! Canonical LR(1) collection construction.

use crate::first_follow::FirstSets;
use crate::grammar::{Grammar, ProductionID, SymbolID, TerminalID};
use crate::types::Map;
use crate::util::display_fn;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// LR(1) item: a production with a marker position and one lookahead
// terminal, e.g. [ X -> Y1 . Y2 Y3, a ]. The derived ordering
// (production, marker, lookahead) fixes the iteration order of every item
// set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub production: ProductionID,
    pub marker: usize,
    pub lookahead: TerminalID,
}

impl LRItem {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.production(self.production);
            write!(f, "[ {} ->", g.nonterminal_name(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ", {} ]", g.terminal_name(self.lookahead))
        })
    }
}

/// A state of the LR(1) automaton: a closed item set plus its outgoing
/// edges. Two states are the same iff their item sets are equal.
#[derive(Debug)]
pub struct State {
    pub(crate) items: BTreeSet<LRItem>,
    pub(crate) edges: Map<SymbolID, StateID>,
}

impl State {
    pub fn items(&self) -> impl Iterator<Item = &LRItem> + '_ {
        self.items.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.edges.iter().map(|(&symbol, &to)| (symbol, to))
    }

    pub fn edge(&self, symbol: SymbolID) -> Option<StateID> {
        self.edges.get(&symbol).copied()
    }
}

/// The canonical LR(1) collection of a grammar, or its LALR(1) quotient
/// after [`crate::lalr::merge`].
#[derive(Debug)]
pub struct Lr1Automaton {
    states: Map<StateID, State>,
    start: StateID,
}

impl Lr1Automaton {
    /// Build the canonical collection from the augmented grammar by BFS
    /// over CLOSURE/GOTO.
    pub fn generate(grammar: &Grammar) -> Self {
        let generator = Generator {
            grammar,
            first_sets: FirstSets::new(grammar),
        };
        generator.generate()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states.iter().map(|(&id, state)| (id, state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[&id]
    }

    pub fn start(&self) -> StateID {
        self.start
    }

    pub(crate) fn from_parts(states: Map<StateID, State>, start: StateID) -> Self {
        Self { states, start }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;
                writeln!(f, "## items")?;
                for item in state.items() {
                    writeln!(f, "- {}", item.display(g))?;
                }
                writeln!(f, "## edges")?;
                for (symbol, to) in state.edges() {
                    writeln!(f, "- {} -> {:02}", g.symbol_name(symbol), to)?;
                }
            }
            Ok(())
        })
    }
}

struct Generator<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
}

impl Generator<'_> {
    fn generate(&self) -> Lr1Automaton {
        let mut states: Map<StateID, State> = Map::default();
        let mut index: Map<BTreeSet<LRItem>, StateID> = Map::default();
        let mut queue = VecDeque::new();

        // I0 = closure({ [ S' -> . S, $ ] })
        let mut initial = BTreeSet::new();
        initial.insert(LRItem {
            production: ProductionID::ACCEPT,
            marker: 0,
            lookahead: TerminalID::EOI,
        });
        self.closure(&mut initial);

        let start = StateID(0);
        index.insert(initial.clone(), start);
        states.insert(
            start,
            State {
                items: initial,
                edges: Map::default(),
            },
        );
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let mut edges = Map::default();
            for (symbol, mut items) in self.transitions(&states[&current].items) {
                self.closure(&mut items);

                let id = match index.get(&items) {
                    Some(&id) => id,
                    None => {
                        let id = StateID::from_index(index.len());
                        index.insert(items.clone(), id);
                        states.insert(
                            id,
                            State {
                                items,
                                edges: Map::default(),
                            },
                        );
                        queue.push_back(id);
                        id
                    }
                };
                edges.insert(symbol, id);
            }
            states[&current].edges = edges;
        }

        tracing::debug!(states = states.len(), "built canonical LR(1) collection");

        Lr1Automaton { states, start }
    }

    /// Close an item set: for [ A -> α . B β, a ] with nonterminal B, add
    /// [ B -> . γ, x ] for every rule B -> γ and every x ∈ First(β a).
    fn closure(&self, items: &mut BTreeSet<LRItem>) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added = Vec::new();
            for item in items.iter() {
                let rule = self.grammar.production(item.production);
                let (b, beta) = match &rule.right()[item.marker..] {
                    [SymbolID::N(b), beta @ ..] => (*b, beta),
                    _ => continue,
                };

                for x in self.first_sets.get(beta, item.lookahead).iter() {
                    for (id, p) in self.grammar.productions() {
                        if p.left() == b {
                            added.push(LRItem {
                                production: id,
                                marker: 0,
                                lookahead: x,
                            });
                        }
                    }
                }
            }

            for item in added {
                changed |= items.insert(item);
            }
        }
    }

    /// Group the items by the symbol after their marker and advance it,
    /// producing the unexpanded kernel of each successor state.
    fn transitions(&self, items: &BTreeSet<LRItem>) -> Map<SymbolID, BTreeSet<LRItem>> {
        let mut successors: Map<SymbolID, BTreeSet<LRItem>> = Map::default();
        for item in items {
            let rule = self.grammar.production(item.production);
            let Some(&label) = rule.right().get(item.marker) else {
                continue;
            };
            successors.entry(label).or_default().insert(LRItem {
                marker: item.marker + 1,
                ..*item
            });
        }
        successors
    }
}
