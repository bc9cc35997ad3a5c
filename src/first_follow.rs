//! FIRST and FOLLOW set computation.

use crate::grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet};

/// The FIRST sets of a grammar's nonterminals, together with their
/// nullability.
///
/// ε-membership of `FIRST(α)` is carried as the nullable flag of the
/// sequence rather than as a sentinel element of the set. Both tables are
/// indexed by nonterminal ID.
#[derive(Debug)]
pub struct FirstSets {
    sets: Vec<TerminalSet>,
    nullable: Vec<bool>,
}

impl FirstSets {
    /// Sweep the productions until neither any FIRST set nor any nullable
    /// flag moves.
    ///
    /// One pass handles a rule `A -> X1 X2 ... Xn` left to right: a
    /// terminal prefix symbol lands in `FIRST(A)` and stops the scan, a
    /// nonterminal contributes its whole FIRST set and stops the scan
    /// unless it is nullable. Scanning past `Xn` makes `A` itself
    /// nullable; an ε-production does so trivially.
    pub fn new(grammar: &Grammar) -> Self {
        let mut sets = vec![TerminalSet::default(); grammar.num_nonterminals()];
        let mut nullable = vec![false; grammar.num_nonterminals()];

        loop {
            let mut changed = false;

            for (_, rule) in grammar.productions() {
                let left = rule.left().index();
                let mut scanned_past_end = true;

                for symbol in rule.right() {
                    match *symbol {
                        SymbolID::T(t) => {
                            changed |= sets[left].insert(t);
                            scanned_past_end = false;
                        }
                        SymbolID::N(n) => {
                            let addition = sets[n.index()].clone();
                            let before = sets[left].len();
                            sets[left].merge(&addition);
                            changed |= sets[left].len() != before;
                            scanned_past_end = nullable[n.index()];
                        }
                    }
                    if !scanned_past_end {
                        break;
                    }
                }

                if scanned_past_end && !nullable[left] {
                    nullable[left] = true;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        Self { sets, nullable }
    }

    /// `First(N)` of a nonterminal.
    pub fn first(&self, id: NonterminalID) -> &TerminalSet {
        &self.sets[id.index()]
    }

    /// `First(prefix a)` for an item lookahead `a`.
    pub fn get(&self, prefix: &[SymbolID], lookahead: TerminalID) -> TerminalSet {
        let (mut first, nullable) = self.of_sequence(prefix);
        if nullable {
            first.insert(lookahead);
        }
        first
    }

    /// The FIRST set of a symbol sequence, and whether the whole sequence
    /// can derive ε. The empty sequence yields `({}, true)`.
    pub fn of_sequence(&self, seq: &[SymbolID]) -> (TerminalSet, bool) {
        let mut first = TerminalSet::default();
        for symbol in seq {
            match *symbol {
                SymbolID::T(t) => {
                    first.insert(t);
                    return (first, false);
                }
                SymbolID::N(n) => {
                    first.merge(&self.sets[n.index()]);
                    if !self.nullable[n.index()] {
                        return (first, false);
                    }
                }
            }
        }
        (first, true)
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.nullable[n.index()])
    }
}

/// The FOLLOW sets of a grammar's nonterminals, indexed by ID.
#[derive(Debug)]
pub struct FollowSets {
    sets: Vec<TerminalSet>,
}

impl FollowSets {
    /// For each occurrence `B -> α N β`: `Follow(N) ⊇ First(β)`, and
    /// additionally `Follow(N) ⊇ Follow(B)` when β is nullable or empty.
    /// `Follow(start)` is seeded with `$`.
    pub fn new(grammar: &Grammar, firsts: &FirstSets) -> Self {
        let mut sets = vec![TerminalSet::default(); grammar.num_nonterminals()];
        sets[grammar.start_symbol().index()].insert(TerminalID::EOI);

        loop {
            let mut changed = false;

            for (_, rule) in grammar.productions() {
                let right = rule.right();
                for (i, symbol) in right.iter().enumerate() {
                    let SymbolID::N(n) = *symbol else { continue };

                    let (mut addition, nullable) = firsts.of_sequence(&right[i + 1..]);
                    if nullable {
                        addition.merge(&sets[rule.left().index()]);
                    }

                    let follow = &mut sets[n.index()];
                    let before = follow.len();
                    follow.merge(&addition);
                    changed |= follow.len() != before;
                }
            }

            if !changed {
                break;
            }
        }

        Self { sets }
    }

    pub fn follow(&self, id: NonterminalID) -> &TerminalSet {
        &self.sets[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    // E -> E + T | T ; T -> T * F | F ; F -> ( E ) | id
    fn expression_grammar() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("+");
            let star = g.terminal("*");
            let lparen = g.terminal("(");
            let rparen = g.terminal(")");
            let id = g.terminal("id");

            let e = g.nonterminal("E");
            let t = g.nonterminal("T");
            let f = g.nonterminal("F");
            g.start_symbol(e);

            g.production(e, [N(e), T(plus), N(t)]);
            g.production(e, [N(t)]);
            g.production(t, [N(t), T(star), N(f)]);
            g.production(t, [N(f)]);
            g.production(f, [T(lparen), N(e), T(rparen)]);
            g.production(f, [T(id)]);
        })
    }

    fn nt(g: &Grammar, name: &str) -> NonterminalID {
        g.nonterminals()
            .find_map(|(id, n)| (n == name).then_some(id))
            .unwrap()
    }

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminal_name(t).to_owned()).collect()
    }

    #[test]
    fn first_sets_of_expression_grammar() {
        let g = expression_grammar();
        let firsts = FirstSets::new(&g);

        for name in ["E", "T", "F"] {
            let id = nt(&g, name);
            assert_eq!(names(&g, firsts.first(id)), ["(", "id"], "First({})", name);
            assert!(!firsts.is_nullable(N(id)));
        }
    }

    #[test]
    fn follow_sets_of_expression_grammar() {
        let g = expression_grammar();
        let firsts = FirstSets::new(&g);
        let follows = FollowSets::new(&g, &firsts);

        assert_eq!(names(&g, follows.follow(nt(&g, "E"))), ["$", "+", ")"]);
        assert_eq!(names(&g, follows.follow(nt(&g, "T"))), ["$", "+", "*", ")"]);
        assert_eq!(names(&g, follows.follow(nt(&g, "F"))), ["$", "+", "*", ")"]);
    }

    #[test]
    fn nullable_chain() {
        // S -> A B ; A -> ε ; B -> ε | b
        let g = Grammar::define(|g| {
            let b = g.terminal("b");
            let s = g.nonterminal("S");
            let a = g.nonterminal("A");
            let bb = g.nonterminal("B");
            g.start_symbol(s);
            g.production(s, [N(a), N(bb)]);
            g.production(a, []);
            g.production(bb, []);
            g.production(bb, [T(b)]);
        });
        let firsts = FirstSets::new(&g);

        assert!(firsts.is_nullable(N(nt(&g, "S"))));
        assert_eq!(names(&g, firsts.first(nt(&g, "S"))), ["b"]);

        // First(prefix a) falls through nullable prefixes to the lookahead
        let first = firsts.get(&[N(nt(&g, "A"))], TerminalID::EOI);
        assert!(first.contains(TerminalID::EOI));
    }
}
