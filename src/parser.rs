//! The shift-reduce parser driver.

use crate::grammar::{Grammar, TerminalID};
use crate::lr1::StateID;
use crate::parse_table::{Action, ParseTable};
use crate::scanner::{Token, TokenKind};

/// A reject verdict from the driver. Any variant means the input is not in
/// the language of the table's grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("no terminal symbol is named `{0}`")]
    UnknownTerminal(String),

    #[error("the scanner could not classify `{0}`")]
    UnrecognizedInput(String),

    #[error("unexpected `{token}` in state {state}")]
    Unexpected { state: StateID, token: String },

    #[error("missing goto for `{nonterminal}` in state {state}")]
    MissingGoto {
        state: StateID,
        nonterminal: String,
    },
}

/// A shift-reduce parser over an ACTION/GOTO table.
///
/// The driver only accepts or rejects; it builds no syntax tree. Tables are
/// read-only, so any number of parsers may share one.
#[derive(Debug)]
pub struct Parser<'a> {
    grammar: &'a Grammar,
    table: &'a ParseTable,
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a Grammar, table: &'a ParseTable) -> Self {
        Self { grammar, table }
    }

    /// Parse a sequence of terminal names. The end-of-input marker `$` is
    /// appended here and must not be part of the input.
    pub fn parse<I>(&self, input: I) -> Result<(), SyntaxError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut terminals = Vec::new();
        for name in input {
            let name = name.as_ref();
            let id = self
                .grammar
                .terminal_id(name)
                .ok_or_else(|| SyntaxError::UnknownTerminal(name.to_owned()))?;
            terminals.push(id);
        }
        terminals.push(TerminalID::EOI);
        self.drive(&terminals)
    }

    /// Parse a scanned token stream by terminal name.
    pub fn parse_tokens(&self, tokens: &[Token]) -> Result<(), SyntaxError> {
        let mut names = Vec::new();
        for token in tokens {
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::Unknown => {
                    return Err(SyntaxError::UnrecognizedInput(token.lexeme.clone()))
                }
                TokenKind::Term(name) => names.push(name.as_str()),
            }
        }
        self.parse(names)
    }

    fn drive(&self, input: &[TerminalID]) -> Result<(), SyntaxError> {
        let mut stack = vec![self.table.start_state()];
        let mut cursor = 0;

        loop {
            let state = *stack.last().unwrap();
            let token = input[cursor];

            let action =
                self.table
                    .action(state, token)
                    .ok_or_else(|| SyntaxError::Unexpected {
                        state,
                        token: self.grammar.terminal_name(token).to_owned(),
                    })?;

            match action {
                Action::Shift(next) => {
                    stack.push(next);
                    cursor += 1;
                }
                Action::Reduce(p) => {
                    let rule = self.grammar.production(p);
                    // ε-productions have an empty right-hand side, so they
                    // pop nothing
                    stack.truncate(stack.len() - rule.right().len());
                    let top = *stack.last().unwrap();
                    let goto = self.table.goto(top, rule.left()).ok_or_else(|| {
                        SyntaxError::MissingGoto {
                            state: top,
                            nonterminal: self.grammar.nonterminal_name(rule.left()).to_owned(),
                        }
                    })?;
                    stack.push(goto);
                }
                Action::Accept => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;
    use crate::lalr;
    use crate::lr1::Lr1Automaton;

    fn build(g: &Grammar) -> ParseTable {
        ParseTable::generate(g, &lalr::merge(&Lr1Automaton::generate(g))).unwrap()
    }

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

    #[test]
    fn accepts_and_rejects_expressions() {
        let g = expression_grammar();
        let table = build(&g);
        let parser = Parser::new(&g, &table);

        assert!(parser.parse(["id", "+", "id", "*", "id"]).is_ok());
        assert!(parser.parse(["(", "id", "+", "id", ")", "*", "id"]).is_ok());
        assert!(parser.parse(["id"]).is_ok());

        assert!(matches!(
            parser.parse(["id", "+"]),
            Err(SyntaxError::Unexpected { .. })
        ));
        assert!(parser.parse(["+", "id"]).is_err());
        assert!(parser.parse(["id", "id"]).is_err());
    }

    #[test]
    fn empty_input_is_rejected_here() {
        let g = expression_grammar();
        let table = build(&g);
        let parser = Parser::new(&g, &table);
        assert!(parser.parse(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn unknown_terminal_name_is_reported() {
        let g = expression_grammar();
        let table = build(&g);
        let parser = Parser::new(&g, &table);
        assert_eq!(
            parser.parse(["bogus"]),
            Err(SyntaxError::UnknownTerminal("bogus".into()))
        );
    }

    #[test]
    fn epsilon_grammar_accepts_only_empty_input() {
        // S -> ε, written with the reserved ε terminal
        let g = Grammar::define(|g| {
            let eps = g.terminal("ε");
            let a = g.terminal("a");
            let s = g.nonterminal("S");
            g.start_symbol(s);
            g.production(s, [T(eps)]);
            let _ = a;
        });
        let table = build(&g);
        let parser = Parser::new(&g, &table);

        assert!(parser.parse(Vec::<&str>::new()).is_ok());
        assert!(parser.parse(["a"]).is_err());
    }

    #[test]
    fn epsilon_alternative_pops_nothing() {
        // S -> a B ; B -> b | ε
        let g = Grammar::define(|g| {
            let a = g.terminal("a");
            let b = g.terminal("b");
            let s = g.nonterminal("S");
            let bb = g.nonterminal("B");
            g.start_symbol(s);
            g.production(s, [T(a), N(bb)]);
            g.production(bb, [T(b)]);
            g.production(bb, []);
        });
        let table = build(&g);
        let parser = Parser::new(&g, &table);

        assert!(parser.parse(["a"]).is_ok());
        assert!(parser.parse(["a", "b"]).is_ok());
        assert!(parser.parse(["b"]).is_err());
        assert!(parser.parse(["a", "b", "b"]).is_err());
    }
}
