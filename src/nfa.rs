//! Thompson NFA construction and simulation.
//!
//! States live in an arena indexed by dense creation-order IDs; transitions
//! reference IDs rather than owning their targets, so the cyclic automaton
//! graph needs no shared-ownership handles.

use crate::regex::{self, RegexError, CONCAT};
use crate::types::Set;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    fn offset(self, by: usize) -> Self {
        Self(self.0 + by as u32)
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q#{:03}", self.0)
    }
}

/// An NFA state: labeled or ε transitions, plus the accepting flag.
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) transitions: Vec<(Option<char>, StateID)>,
    pub(crate) is_final: bool,
}

/// Extends `set` with every state reachable through ε-transitions alone.
pub(crate) fn epsilon_closure(states: &[State], set: &mut Set<StateID>) {
    let mut stack: Vec<StateID> = set.iter().copied().collect();
    while let Some(s) = stack.pop() {
        for &(label, to) in &states[s.index()].transitions {
            if label.is_none() && set.insert(to) {
                stack.push(to);
            }
        }
    }
}

/// The set of states reachable from `from` by one transition labeled `c`.
pub(crate) fn move_on(states: &[State], from: &Set<StateID>, c: char) -> Set<StateID> {
    let mut next = Set::default();
    for &s in from {
        for &(label, to) in &states[s.index()].transitions {
            if label == Some(c) {
                next.insert(to);
            }
        }
    }
    next
}

/// An NFA produced by Thompson's construction.
///
/// The automaton is a `(start, end)` pair; `end` is the only accepting
/// state of a freshly compiled pattern.
#[derive(Debug)]
pub struct Nfa {
    states: Vec<State>,
    start: StateID,
    end: StateID,
}

impl Nfa {
    /// Compile an infix pattern into an NFA.
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        let postfix = regex::to_postfix(pattern)?;
        Self::from_postfix(&postfix)
    }

    /// Build an NFA matching `text` verbatim, with no regex interpretation.
    ///
    /// This is the escape hatch for tokens spelled with operator
    /// characters, such as `+` or `(`, which the pattern syntax cannot
    /// express literally.
    pub fn literal(text: &str) -> Result<Self, RegexError> {
        if text.is_empty() {
            return Err(RegexError::EmptyPattern);
        }

        let mut builder = Builder { states: Vec::new() };
        let start = builder.state(false);
        let mut current = start;
        for c in text.chars() {
            let next = builder.state(false);
            builder.edge(current, Some(c), next);
            current = next;
        }
        builder.states[current.index()].is_final = true;

        Ok(Self {
            states: builder.states,
            start,
            end: current,
        })
    }

    /// Build an NFA from a postfix pattern, maintaining a stack of
    /// `(start, end)` fragments.
    fn from_postfix(postfix: &str) -> Result<Self, RegexError> {
        let mut builder = Builder { states: Vec::new() };
        let mut stack: Vec<(StateID, StateID)> = Vec::new();

        for c in postfix.chars() {
            match c {
                CONCAT => {
                    let (r_start, r_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let (l_start, l_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    builder.edge(l_end, None, r_start);
                    builder.clear_final(l_end);
                    stack.push((l_start, r_end));
                }
                '|' => {
                    let (b_start, b_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let (a_start, a_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let start = builder.state(false);
                    let end = builder.state(true);
                    builder.edge(start, None, a_start);
                    builder.edge(start, None, b_start);
                    builder.edge(a_end, None, end);
                    builder.edge(b_end, None, end);
                    builder.clear_final(a_end);
                    builder.clear_final(b_end);
                    stack.push((start, end));
                }
                '*' => {
                    let (x_start, x_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let start = builder.state(false);
                    let end = builder.state(true);
                    builder.edge(start, None, end);
                    builder.edge(start, None, x_start);
                    builder.edge(x_end, None, end);
                    builder.edge(x_end, None, x_start);
                    builder.clear_final(x_end);
                    stack.push((start, end));
                }
                '+' => {
                    let (x_start, x_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let start = builder.state(false);
                    let end = builder.state(true);
                    builder.edge(start, None, x_start);
                    builder.edge(x_end, None, x_start);
                    builder.edge(x_end, None, end);
                    builder.clear_final(x_end);
                    stack.push((start, end));
                }
                '?' => {
                    let (x_start, x_end) = stack.pop().ok_or(RegexError::MissingOperand(c))?;
                    let start = builder.state(false);
                    let end = builder.state(true);
                    builder.edge(start, None, end);
                    builder.edge(start, None, x_start);
                    builder.edge(x_end, None, end);
                    builder.clear_final(x_end);
                    stack.push((start, end));
                }
                c => {
                    let start = builder.state(false);
                    let end = builder.state(true);
                    builder.edge(start, Some(c), end);
                    stack.push((start, end));
                }
            }
        }

        match stack[..] {
            [(start, end)] => Ok(Self {
                states: builder.states,
                start,
                end,
            }),
            _ => Err(RegexError::UnconnectedFragments(stack.len())),
        }
    }

    /// Simulate the NFA on `input` and report whether it accepts.
    pub fn accepts(&self, input: &str) -> bool {
        let mut current = Set::default();
        current.insert(self.start);
        epsilon_closure(&self.states, &mut current);

        for c in input.chars() {
            let mut next = move_on(&self.states, &current, c);
            epsilon_closure(&self.states, &mut next);
            current = next;
        }

        current.iter().any(|&s| self.states[s.index()].is_final)
    }

    pub(crate) fn states(&self) -> &[State] {
        &self.states
    }

    pub fn start(&self) -> StateID {
        self.start
    }

    pub fn end(&self) -> StateID {
        self.end
    }
}

struct Builder {
    states: Vec<State>,
}

impl Builder {
    fn state(&mut self, is_final: bool) -> StateID {
        let id = StateID(self.states.len() as u32);
        self.states.push(State {
            transitions: Vec::new(),
            is_final,
        });
        id
    }

    fn edge(&mut self, from: StateID, label: Option<char>, to: StateID) {
        self.states[from.index()].transitions.push((label, to));
    }

    fn clear_final(&mut self, id: StateID) {
        self.states[id.index()].is_final = false;
    }
}

/// Several rule NFAs relabeled into one arena, joined by a fresh start
/// state with an ε-edge to each rule's start.
#[derive(Debug)]
pub(crate) struct MergedNfa {
    states: Vec<State>,
    start: StateID,
    ends: Vec<StateID>,
}

impl MergedNfa {
    pub(crate) fn new<'a, I>(rules: I) -> Self
    where
        I: IntoIterator<Item = &'a Nfa>,
    {
        let mut states = vec![State {
            transitions: Vec::new(),
            is_final: false,
        }];
        let start = StateID(0);
        let mut ends = Vec::new();

        for nfa in rules {
            let offset = states.len();
            for state in &nfa.states {
                states.push(State {
                    transitions: state
                        .transitions
                        .iter()
                        .map(|&(label, to)| (label, to.offset(offset)))
                        .collect(),
                    is_final: state.is_final,
                });
            }
            states[start.index()]
                .transitions
                .push((None, nfa.start.offset(offset)));
            ends.push(nfa.end.offset(offset));
        }

        Self { states, start, ends }
    }

    pub(crate) fn states(&self) -> &[State] {
        &self.states
    }

    pub(crate) fn start(&self) -> StateID {
        self.start
    }

    /// The accepting state of each source NFA, in input order.
    pub(crate) fn ends(&self) -> &[StateID] {
        &self.ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_character() {
        let nfa = Nfa::compile("a").unwrap();
        assert!(nfa.accepts("a"));
        assert!(!nfa.accepts(""));
        assert!(!nfa.accepts("aa"));
        assert!(!nfa.accepts("b"));
    }

    #[test]
    fn union_and_star() {
        let nfa = Nfa::compile("a(b|c)*").unwrap();
        for accepted in ["a", "abbbc", "ac", "abcbc"] {
            assert!(nfa.accepts(accepted), "should accept {:?}", accepted);
        }
        for rejected in ["", "b", "ca"] {
            assert!(!nfa.accepts(rejected), "should reject {:?}", rejected);
        }
    }

    #[test]
    fn plus_and_optional() {
        let nfa = Nfa::compile("ab+c?").unwrap();
        assert!(nfa.accepts("ab"));
        assert!(nfa.accepts("abbb"));
        assert!(nfa.accepts("abc"));
        assert!(!nfa.accepts("a"));
        assert!(!nfa.accepts("ac"));
    }

    #[test]
    fn only_the_end_state_accepts() {
        let nfa = Nfa::compile("ab").unwrap();
        let finals: Vec<_> = (0..nfa.states().len())
            .filter(|&i| nfa.states()[i].is_final)
            .map(|i| StateID(i as u32))
            .collect();
        assert_eq!(finals, vec![nfa.end()]);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        assert_eq!(
            Nfa::compile("*").unwrap_err(),
            RegexError::MissingOperand('*'),
        );
        assert!(Nfa::compile("|").is_err());
    }

    #[test]
    fn literal_text_is_not_interpreted() {
        let nfa = Nfa::literal("(+)").unwrap();
        assert!(nfa.accepts("(+)"));
        assert!(!nfa.accepts("("));
        assert!(!nfa.accepts("(+)(+)"));
        assert!(Nfa::literal("").is_err());
    }

    #[test]
    fn merged_rules_share_one_start() {
        let a = Nfa::compile("a").unwrap();
        let b = Nfa::compile("b").unwrap();
        let merged = MergedNfa::new([&a, &b]);

        let mut closure = Set::default();
        closure.insert(merged.start());
        epsilon_closure(merged.states(), &mut closure);
        // virtual start plus both rule starts
        assert_eq!(closure.len(), 3);
        assert_eq!(merged.ends().len(), 2);
    }
}
