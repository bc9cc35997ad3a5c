//! Context-free grammars.
//!
//! Symbols, productions and their names live in dense index-addressed
//! tables, so every ID doubles as a stable position and iteration order is
//! declaration order throughout.

use crate::util::display_fn;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);

impl TerminalID {
    /// Reserved terminal that marks the end of input, written `$`.
    pub const EOI: Self = Self(0);

    pub(crate) fn index(self) -> usize {
        self.0.into()
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index.try_into().expect("too many terminal symbols"))
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::EOI {
            f.write_str("$")
        } else {
            write!(f, "t{}", self.0)
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);

impl NonterminalID {
    /// Reserved nonterminal on the left of the augmented rule `S' -> S`.
    pub const START: Self = Self(0);

    pub(crate) fn index(self) -> usize {
        self.0.into()
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index.try_into().expect("too many nonterminal symbols"))
    }
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => t.fmt(f),
            Self::N(n) => n.fmt(f),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);

impl ProductionID {
    /// ID of the augmented start production, always stored first.
    pub const ACCEPT: Self = Self(0);

    pub(crate) fn index(self) -> usize {
        self.0.into()
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index.try_into().expect("too many productions"))
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A set of terminal symbols, backed by a bitmap over their IDs.
///
/// Iteration yields terminals in ID order, which keeps every construction
/// that walks lookahead sets deterministic.
#[derive(Debug, Default, Clone)]
pub struct TerminalSet {
    bits: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.bits.contains(id.index())
    }

    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.bits.insert(id.index())
    }

    /// Add every terminal of `other` to this set.
    pub fn merge(&mut self, other: &Self) {
        self.bits.union_with(&other.bits)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.bits.iter().map(TerminalID::from_index)
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = TerminalID>,
    {
        for id in iter {
            self.insert(id);
        }
    }
}

/// A production rule `A -> X1 X2 ... Xn`.
///
/// An empty right-hand side denotes an ε-production.
#[derive(Debug)]
pub struct Production {
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Production {
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                f.write_str(" ε")?;
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// Slot 0 of each table is reserved: terminal 0 is `$`, nonterminal 0 is
/// the augmented start symbol (named after the user's start symbol with a
/// prime, e.g. `E'`), and production 0 is the augmented rule `S' -> S`.
#[derive(Debug)]
pub struct Grammar {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    productions: Vec<Production>,
    start_symbol: NonterminalID,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Self
    where
        F: FnOnce(&mut GrammarDef),
    {
        let mut def = GrammarDef {
            terminals: vec!["$".to_owned()],
            // the augmented start symbol is named once the user's start
            // symbol is known
            nonterminals: vec![String::new()],
            productions: Vec::new(),
            start_symbol: None,
        };

        f(&mut def);

        assert!(
            def.nonterminals.len() > 1,
            "cannot define a grammar without nonterminal symbols"
        );
        // fall back to the first declared nonterminal (index 1, right
        // after the reserved slot)
        let start = def
            .start_symbol
            .unwrap_or_else(|| NonterminalID::from_index(1));
        def.nonterminals[0] = format!("{}'", def.nonterminals[start.index()]);

        let mut productions = Vec::with_capacity(def.productions.len() + 1);
        productions.push(Production {
            left: NonterminalID::START,
            right: vec![SymbolID::N(start)],
        });
        productions.append(&mut def.productions);

        Self {
            terminals: def.terminals,
            nonterminals: def.nonterminals,
            productions,
            start_symbol: start,
        }
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.terminals
            .iter()
            .enumerate()
            .map(|(i, name)| (TerminalID::from_index(i), name.as_str()))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &str)> + '_ {
        self.nonterminals
            .iter()
            .enumerate()
            .map(|(i, name)| (NonterminalID::from_index(i), name.as_str()))
    }

    pub fn productions(&self) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductionID::from_index(i), p))
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[id.index()]
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// Look up a terminal symbol by its name.
    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .iter()
            .position(|n| n == name)
            .map(TerminalID::from_index)
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        &self.terminals[id.index()]
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        &self.nonterminals[id.index()]
    }

    pub fn symbol_name(&self, id: SymbolID) -> &str {
        match id {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    pub(crate) fn num_nonterminals(&self) -> usize {
        self.nonterminals.len()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "start symbol: {}",
            self.nonterminal_name(self.start_symbol)
        )?;
        write!(f, "terminals:")?;
        for (_, name) in self.terminals() {
            write!(f, " {}", name)?;
        }
        write!(f, "\nnonterminals:")?;
        for (_, name) in self.nonterminals() {
            write!(f, " {}", name)?;
        }
        writeln!(f, "\nrules:")?;
        for (id, p) in self.productions() {
            writeln!(f, "  {:?}: {}", id, p.display(self))?;
        }
        Ok(())
    }
}

/// The contextual values for building a [`Grammar`].
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    productions: Vec<Production>,
    start_symbol: Option<NonterminalID>,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> TerminalID {
        let id = TerminalID::from_index(self.terminals.len());
        self.terminals.push(name.to_owned());
        id
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> NonterminalID {
        let id = NonterminalID::from_index(self.nonterminals.len());
        self.nonterminals.push(name.to_owned());
        id
    }

    /// Add a production rule `left -> right` to this grammar.
    ///
    /// A right-hand side consisting of the single reserved terminal `ε` is
    /// normalized to the empty sequence.
    pub fn production<I>(&mut self, left: NonterminalID, right: I) -> ProductionID
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let mut right: Vec<_> = right.into_iter().collect();
        if let [SymbolID::T(t)] = right[..] {
            if self.terminals[t.index()] == "ε" {
                right.clear();
            }
        }

        let duplicate = self
            .productions
            .iter()
            .any(|p| p.left == left && p.right == right);
        assert!(!duplicate, "the grammar already contains this production");

        // slot 0 of the final table belongs to the augmented rule
        let id = ProductionID::from_index(self.productions.len() + 1);
        self.productions.push(Production { left, right });
        id
    }

    /// Specify the start symbol. Defaults to the first declared nonterminal.
    pub fn start_symbol(&mut self, start: NonterminalID) {
        self.start_symbol.replace(start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    #[test]
    fn define_and_display() {
        let g = Grammar::define(|g| {
            let plus = g.terminal("`+`");
            let num = g.terminal("NUM");
            let expr = g.nonterminal("expr");
            g.start_symbol(expr);
            g.production(expr, [N(expr), T(plus), T(num)]);
            g.production(expr, [T(num)]);
        });

        assert_eq!(g.terminal_id("`+`"), Some(TerminalID(1)));
        assert_eq!(g.terminal_id("$"), Some(TerminalID::EOI));
        assert_eq!(g.production(ProductionID::ACCEPT).right().len(), 1);

        let dump = g.to_string();
        assert!(dump.contains("expr -> expr `+` NUM"));
        assert!(dump.contains("expr' -> expr"));
    }

    #[test]
    fn start_symbol_defaults_to_the_first_nonterminal() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a");
            let s = g.nonterminal("S");
            let t = g.nonterminal("T");
            g.production(s, [T(a)]);
            g.production(t, [T(a), T(a)]);
        });

        assert_eq!(g.nonterminal_name(g.start_symbol()), "S");
        assert_eq!(g.nonterminal_name(NonterminalID::START), "S'");
    }

    #[test]
    fn epsilon_production_is_normalized() {
        let g = Grammar::define(|g| {
            let eps = g.terminal("ε");
            let a = g.terminal("a");
            let s = g.nonterminal("S");
            g.start_symbol(s);
            g.production(s, [T(a)]);
            g.production(s, [T(eps)]);
        });

        let (_, empty) = g
            .productions()
            .find(|(_, p)| p.right().is_empty())
            .expect("normalized ε-production");
        assert_eq!(empty.left(), g.start_symbol());
        assert!(empty.display(&g).to_string().ends_with("ε"));
    }

    #[test]
    fn terminal_set_iterates_in_id_order() {
        let set: TerminalSet = [TerminalID(4), TerminalID(1), TerminalID::EOI]
            .into_iter()
            .collect();
        let ids: Vec<_> = set.iter().collect();
        assert_eq!(ids, vec![TerminalID::EOI, TerminalID(1), TerminalID(4)]);
        assert_eq!(set.len(), 3);
    }
}
