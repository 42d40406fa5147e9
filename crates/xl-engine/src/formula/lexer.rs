//! Formula tokenizer.
//!
//! Token patterns are tried in a fixed priority order at every position and
//! the first one that matches wins. Whitespace is emitted as a token so the
//! printer and editors can see it; the parser skips it.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    /// The `=` that opens every formula.
    Marker,
    Operator,
    Number,
    String,
    Boolean,
    /// An identifier directly followed by `(`; the parenthesis is part of the token.
    FuncName,
    /// A sheet name directly followed by `!`; the `!` is part of the token.
    Sheet,
    Cell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

const KINDS: &[(&str, TokenKind)] = &[
    ("ws", TokenKind::Whitespace),
    ("op", TokenKind::Operator),
    ("number", TokenKind::Number),
    ("string", TokenKind::String),
    ("boolean", TokenKind::Boolean),
    ("func", TokenKind::FuncName),
    ("sheet", TokenKind::Sheet),
    ("cell", TokenKind::Cell),
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:",
            r"(?<ws>\s+)",
            r#"|(?<op><>|<=|>=|[-+*/()=<>,:])"#,
            r"|(?<number>[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)",
            r#"|(?<string>"(?:[^"]|"")*")"#,
            r"|(?<boolean>(?i:TRUE|FALSE)\b)",
            r"|(?<func>[A-Za-z0-9_]+\()",
            r"|(?<sheet>(?:[A-Za-z0-9_]+|'(?:[^']|'')*')!)",
            r"|(?<cell>[A-Za-z]+[1-9][0-9]*)",
            r")"
        ))
        .expect("token regex must compile")
    })
}

/// Split formula source into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let re = token_re();
    let mut tokens = Vec::new();
    let mut pos = 0;

    if source.starts_with('=') {
        tokens.push(Token {
            kind: TokenKind::Marker,
            text: &source[..1],
            offset: 0,
        });
        pos = 1;
    }

    while pos < source.len() {
        let rest = &source[pos..];
        let caps = re.captures(rest).ok_or_else(|| ParseError::Lexical {
            offset: pos,
            near: rest.chars().take(10).collect(),
        })?;
        let (kind, m) = KINDS
            .iter()
            .find_map(|(name, kind)| caps.name(name).map(|m| (*kind, m)))
            .ok_or_else(|| ParseError::Lexical {
                offset: pos,
                near: rest.chars().take(10).collect(),
            })?;
        tokens.push(Token {
            kind,
            text: m.as_str(),
            offset: pos,
        });
        pos += m.end();
    }

    Ok(tokens)
}
