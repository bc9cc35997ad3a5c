//! ACTION/GOTO table synthesis with conflict resolution.

use crate::grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID};
use crate::lr1::{Lr1Automaton, StateID};
use crate::types::Map;
use crate::util::display_fn;
use std::fmt;

/// The action the parser performs in a state on a lookahead terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the lookahead and transition to the specified state.
    Shift(StateID),
    /// Reduce by the specified production rule.
    Reduce(ProductionID),
    /// The input has been parsed completely.
    Accept,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("the LR(1) automaton has not been constructed")]
    UnconstructedAutomaton,
}

/// A table cell that was assigned two incompatible actions.
///
/// Conflicts are recorded, not raised: the table is still produced under
/// the fixed resolution policy and the caller decides whether a non-empty
/// conflict list is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    /// Name of the offending terminal.
    pub token: String,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Shift/reduce; the shift is kept.
    ShiftReduce { discarded: ProductionID },
    /// Reduce/reduce; the first written reduce is kept.
    ReduceReduce {
        kept: ProductionID,
        discarded: ProductionID,
    },
    /// Another action collided with ACCEPT; ACCEPT is kept.
    AcceptCollision,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::ShiftReduce { discarded } => write!(
                f,
                "shift/reduce conflict in state {} on `{}`: kept shift, discarded reduce({:?})",
                self.state, self.token, discarded
            ),
            ConflictKind::ReduceReduce { kept, discarded } => write!(
                f,
                "reduce/reduce conflict in state {} on `{}`: kept reduce({:?}), discarded reduce({:?})",
                self.state, self.token, kept, discarded
            ),
            ConflictKind::AcceptCollision => write!(
                f,
                "accept conflict in state {} on `{}`: kept accept",
                self.state, self.token
            ),
        }
    }
}

/// The ACTION/GOTO table driving the shift-reduce parser.
#[derive(Debug)]
pub struct ParseTable {
    actions: Map<StateID, Map<TerminalID, Action>>,
    gotos: Map<StateID, Map<NonterminalID, StateID>>,
    start: StateID,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// Fill the table from an LR(1) or LALR(1) automaton.
    pub fn generate(grammar: &Grammar, automaton: &Lr1Automaton) -> Result<Self, TableError> {
        if automaton.is_empty() {
            return Err(TableError::UnconstructedAutomaton);
        }

        let mut filler = Filler {
            grammar,
            conflicts: Vec::new(),
        };
        let mut actions = Map::default();
        let mut gotos = Map::default();

        for (id, state) in automaton.states() {
            let mut row: Map<TerminalID, Action> = Map::default();

            for item in state.items() {
                let rule = grammar.production(item.production);
                match rule.right().get(item.marker) {
                    // [ A -> α . t β, a ]: shift
                    Some(&SymbolID::T(t)) => {
                        if let Some(target) = state.edge(SymbolID::T(t)) {
                            filler.shift(&mut row, id, t, target);
                        }
                    }
                    Some(&SymbolID::N(_)) => {}
                    // [ A -> α ., a ]: accept for the augmented rule on $,
                    // reduce otherwise
                    None => {
                        if item.production == ProductionID::ACCEPT {
                            if item.lookahead == TerminalID::EOI {
                                filler.accept(&mut row, id);
                            }
                        } else {
                            filler.reduce(&mut row, id, item.lookahead, item.production);
                        }
                    }
                }
            }

            let goto_row: Map<NonterminalID, StateID> = state
                .edges()
                .filter_map(|(symbol, target)| match symbol {
                    SymbolID::N(n) => Some((n, target)),
                    SymbolID::T(_) => None,
                })
                .collect();

            actions.insert(id, row);
            gotos.insert(id, goto_row);
        }

        for conflict in &filler.conflicts {
            tracing::warn!("{}", conflict);
        }

        Ok(Self {
            actions,
            gotos,
            start: automaton.start(),
            conflicts: filler.conflicts,
        })
    }

    pub fn action(&self, state: StateID, token: TerminalID) -> Option<Action> {
        self.actions.get(&state)?.get(&token).copied()
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos.get(&state)?.get(&symbol).copied()
    }

    pub fn start_state(&self) -> StateID {
        self.start
    }

    /// Every conflict encountered while filling the table. An empty list
    /// means the grammar is conflict-free under this construction.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (state, row) in &self.actions {
                writeln!(f, "#### State {:02}", state)?;
                writeln!(f, "## actions")?;
                for (token, action) in row {
                    let token = g.terminal_name(*token);
                    match action {
                        Action::Shift(next) => writeln!(f, "- {} => shift({:02})", token, next)?,
                        Action::Reduce(p) => {
                            writeln!(f, "- {} => reduce({})", token, g.production(*p).display(g))?
                        }
                        Action::Accept => writeln!(f, "- {} => accept", token)?,
                    }
                }
                let gotos = &self.gotos[state];
                if !gotos.is_empty() {
                    writeln!(f, "## gotos")?;
                    for (symbol, goto) in gotos {
                        writeln!(f, "- {} => goto({:02})", g.nonterminal_name(*symbol), goto)?;
                    }
                }
            }
            Ok(())
        })
    }
}

struct Filler<'g> {
    grammar: &'g Grammar,
    conflicts: Vec<Conflict>,
}

impl Filler<'_> {
    fn shift(&mut self, row: &mut Map<TerminalID, Action>, state: StateID, t: TerminalID, target: StateID) {
        match row.get(&t) {
            None => {
                row.insert(t, Action::Shift(target));
            }
            // several items shift the same terminal into the same state
            Some(Action::Shift(prev)) => debug_assert_eq!(*prev, target),
            Some(Action::Reduce(p)) => {
                self.record(state, t, ConflictKind::ShiftReduce { discarded: *p });
                row.insert(t, Action::Shift(target));
            }
            Some(Action::Accept) => {
                self.record(state, t, ConflictKind::AcceptCollision);
            }
        }
    }

    fn reduce(&mut self, row: &mut Map<TerminalID, Action>, state: StateID, t: TerminalID, p: ProductionID) {
        match row.get(&t) {
            None => {
                row.insert(t, Action::Reduce(p));
            }
            Some(Action::Shift(_)) => {
                self.record(state, t, ConflictKind::ShiftReduce { discarded: p });
            }
            Some(Action::Reduce(kept)) if *kept != p => {
                let kept = *kept;
                self.record(state, t, ConflictKind::ReduceReduce { kept, discarded: p });
            }
            Some(Action::Reduce(_)) => {}
            Some(Action::Accept) => {
                self.record(state, t, ConflictKind::AcceptCollision);
            }
        }
    }

    fn accept(&mut self, row: &mut Map<TerminalID, Action>, state: StateID) {
        match row.get(&TerminalID::EOI) {
            None => {
                row.insert(TerminalID::EOI, Action::Accept);
            }
            Some(Action::Accept) => {}
            Some(_) => {
                self.record(state, TerminalID::EOI, ConflictKind::AcceptCollision);
                row.insert(TerminalID::EOI, Action::Accept);
            }
        }
    }

    fn record(&mut self, state: StateID, t: TerminalID, kind: ConflictKind) {
        self.conflicts.push(Conflict {
            state,
            token: self.grammar.terminal_name(t).to_owned(),
            kind,
        });
    }
}
