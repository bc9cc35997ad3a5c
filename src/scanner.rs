//! Longest-match token scanning.

use crate::dfa::{self, Alphabet, Dfa, Label};
use crate::minimize::minimize;
use crate::nfa::Nfa;
use crate::regex::{self, RegexError};
use std::fmt;

/// A lexical rule: the token type produced when `pattern` matches, and a
/// priority that resolves overlaps between rules matching the same lexeme.
#[derive(Debug, Clone)]
pub struct LexicalRule {
    token: String,
    pattern: String,
    priority: u32,
    skip: bool,
    literal: bool,
}

impl LexicalRule {
    pub fn new(token: impl Into<String>, pattern: impl Into<String>, priority: u32) -> Self {
        Self {
            token: token.into(),
            pattern: pattern.into(),
            priority,
            skip: false,
            literal: false,
        }
    }

    /// A rule matching `text` verbatim, with no regex interpretation.
    ///
    /// Needed for tokens spelled with operator characters, e.g. `+` or `(`.
    pub fn literal(token: impl Into<String>, text: impl Into<String>, priority: u32) -> Self {
        Self {
            literal: true,
            ..Self::new(token, text, priority)
        }
    }

    /// A rule whose matches are suppressed from the token stream, such as
    /// whitespace.
    pub fn skip(token: impl Into<String>, pattern: impl Into<String>, priority: u32) -> Self {
        Self {
            skip: true,
            ..Self::new(token, pattern, priority)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A token produced by a lexical rule, carrying the rule's token type.
    Term(String),
    /// A character no rule matches.
    Unknown,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// The terminal name this token contributes to a parser input.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Term(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// Byte offset of the first matched character.
    pub start: usize,
    /// Byte offset one past the last matched character.
    pub end: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Term(name) => write!(f, "{}({:?})", name, self.lexeme),
            TokenKind::Unknown => write!(f, "UNKNOWN({:?})", self.lexeme),
            TokenKind::Eof => f.write_str("EOF"),
        }
    }
}

/// A tokenizer driven by one minimized DFA over all lexical rules.
#[derive(Debug)]
pub struct Scanner {
    dfa: Dfa,
}

impl Scanner {
    /// Compile the rules into a merged, minimized token DFA.
    ///
    /// The alphabet is the set of literal operands appearing in the rule
    /// patterns.
    pub fn new(rules: &[LexicalRule]) -> Result<Self, RegexError> {
        let mut alphabet = Alphabet::new();
        for rule in rules {
            if rule.literal {
                alphabet.extend(rule.pattern.chars());
            } else {
                alphabet.extend(regex::operands(&rule.pattern));
            }
        }

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let nfa = if rule.literal {
                Nfa::literal(&rule.pattern)?
            } else {
                Nfa::compile(&rule.pattern)?
            };
            compiled.push((
                nfa,
                Label {
                    token: rule.token.clone(),
                    priority: rule.priority,
                    skip: rule.skip,
                },
            ));
        }

        let dfa = dfa::subset_tokens(&compiled, &alphabet);
        let dfa = minimize(&dfa, &alphabet);
        tracing::debug!(
            rules = rules.len(),
            states = dfa.len(),
            "compiled scanner"
        );

        Ok(Self { dfa })
    }

    /// The minimized token DFA backing this scanner.
    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    /// Split `input` into tokens by repeated longest match.
    ///
    /// Positions with no match yield single-character `Unknown` tokens;
    /// matches of skip rules are dropped; a final `Eof` token is always
    /// appended.
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            match self.longest_match(input, pos) {
                Some((label, end)) => {
                    if !label.skip {
                        tokens.push(Token {
                            kind: TokenKind::Term(label.token.clone()),
                            lexeme: input[pos..end].to_owned(),
                            start: pos,
                            end,
                        });
                    }
                    pos = end;
                }
                None => {
                    let len = input[pos..].chars().next().map_or(1, char::len_utf8);
                    tokens.push(Token {
                        kind: TokenKind::Unknown,
                        lexeme: input[pos..pos + len].to_owned(),
                        start: pos,
                        end: pos + len,
                    });
                    pos += len;
                }
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            start: pos,
            end: pos,
        });
        tokens
    }

    /// Walk the DFA from `start`, remembering the last accepting position.
    fn longest_match(&self, input: &str, start: usize) -> Option<(&Label, usize)> {
        let mut state = self.dfa.start();
        let mut last_accept = None;

        for (offset, c) in input[start..].char_indices() {
            match self.dfa.state(state).transition(c) {
                Some(next) => {
                    state = next;
                    if let Some(label) = self.dfa.state(state).label() {
                        last_accept = Some((label, start + offset + c.len_utf8()));
                    }
                }
                None => break,
            }
        }

        last_accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn union(chars: impl Iterator<Item = char>) -> String {
        let alternatives: Vec<String> = chars.map(String::from).collect();
        format!("({})", alternatives.join("|"))
    }

    fn ident_pattern() -> String {
        let alpha = union(('a'..='z').chain('A'..='Z'));
        let alnum = union(('a'..='z').chain('A'..='Z').chain('0'..='9').chain(['_']));
        format!("{}{}*", alpha, alnum)
    }

    fn kinds(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn longest_match_beats_priority() {
        let scanner = Scanner::new(&[
            LexicalRule::new("IF", "if", 10),
            LexicalRule::new("IDENT", ident_pattern(), 5),
            LexicalRule::skip("WHITESPACE", " +", 1),
        ])
        .unwrap();

        let tokens = scanner.tokenize("ifVar if");
        assert_eq!(
            kinds(&tokens),
            vec![r#"IDENT("ifVar")"#, r#"IF("if")"#, "EOF"]
        );
        assert_eq!((tokens[0].start, tokens[0].end), (0, 5));
        assert_eq!((tokens[1].start, tokens[1].end), (6, 8));
        assert_eq!((tokens[2].start, tokens[2].end), (8, 8));
    }

    #[test]
    fn longest_match_prefers_double_equals() {
        let scanner = Scanner::new(&[
            LexicalRule::new("ASSIGN", "=", 6),
            LexicalRule::new("EQ", "==", 6),
            LexicalRule::new("IDENT", ident_pattern(), 5),
        ])
        .unwrap();

        let tokens = scanner.tokenize("a==b");
        assert_eq!(
            kinds(&tokens),
            vec![r#"IDENT("a")"#, r#"EQ("==")"#, r#"IDENT("b")"#, "EOF"]
        );
    }

    #[test]
    fn priority_resolves_equal_length_matches() {
        let scanner = Scanner::new(&[
            LexicalRule::new("IF", "if", 10),
            LexicalRule::new("IDENT", ident_pattern(), 5),
        ])
        .unwrap();

        let tokens = scanner.tokenize("if");
        assert_eq!(kinds(&tokens), vec![r#"IF("if")"#, "EOF"]);
    }

    #[test]
    fn literal_rules_cover_operator_characters() {
        let scanner = Scanner::new(&[
            LexicalRule::literal("PLUS", "+", 6),
            LexicalRule::literal("LPAREN", "(", 6),
            LexicalRule::literal("RPAREN", ")", 6),
            LexicalRule::new("IDENT", ident_pattern(), 5),
        ])
        .unwrap();

        let tokens = scanner.tokenize("(a+b)");
        assert_eq!(
            kinds(&tokens),
            vec![
                r#"LPAREN("(")"#,
                r#"IDENT("a")"#,
                r#"PLUS("+")"#,
                r#"IDENT("b")"#,
                r#"RPAREN(")")"#,
                "EOF"
            ]
        );
    }

    #[test]
    fn unmatched_characters_become_unknown() {
        let scanner = Scanner::new(&[LexicalRule::new("IDENT", ident_pattern(), 5)]).unwrap();

        let tokens = scanner.tokenize("ab%cd");
        assert_eq!(
            kinds(&tokens),
            vec![r#"IDENT("ab")"#, r#"UNKNOWN("%")"#, r#"IDENT("cd")"#, "EOF"]
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        let scanner = Scanner::new(&[LexicalRule::new("IDENT", ident_pattern(), 5)]).unwrap();
        let tokens = scanner.tokenize("");
        assert_eq!(kinds(&tokens), vec!["EOF"]);
    }

    #[test]
    fn bad_rule_pattern_is_reported() {
        let err = Scanner::new(&[LexicalRule::new("BROKEN", "(a", 1)]).unwrap_err();
        assert_eq!(err, RegexError::UnmatchedParen);
    }
}
