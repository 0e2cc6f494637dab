//! Tokeniser for style mapping lines

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Kinds of token in a style mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Identifier,
    Dot,
    Colon,
    Gt,
    Whitespace,
    Arrow,
    Equals,
    StartsWith,
    OpenParen,
    CloseParen,
    OpenSquareBracket,
    CloseSquareBracket,
    String,
    UnterminatedString,
    Integer,
    Choice,
    Bang,
    Unrecognised,
    End,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::Identifier => "identifier",
            TokenType::Dot => "dot",
            TokenType::Colon => "colon",
            TokenType::Gt => "gt",
            TokenType::Whitespace => "whitespace",
            TokenType::Arrow => "arrow",
            TokenType::Equals => "equals",
            TokenType::StartsWith => "startsWith",
            TokenType::OpenParen => "open-paren",
            TokenType::CloseParen => "close-paren",
            TokenType::OpenSquareBracket => "open-square-bracket",
            TokenType::CloseSquareBracket => "close-square-bracket",
            TokenType::String => "string",
            TokenType::UnterminatedString => "unterminated-string",
            TokenType::Integer => "integer",
            TokenType::Choice => "choice",
            TokenType::Bang => "bang",
            TokenType::Unrecognised => "unrecognisedCharacter",
            TokenType::End => "end",
        };
        f.write_str(name)
    }
}

/// A token and where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    /// Raw text for identifiers and integers, the quoted body for strings
    pub value: String,
    /// Character offset of the token start
    pub offset: usize,
}

impl Token {
    /// How the token is described in parse errors
    pub fn describe(&self) -> String {
        match self.token_type {
            TokenType::End => "end".to_string(),
            other => format!("{} \"{}\"", other, self.value),
        }
    }
}

/// Token patterns, tried in order at each position; the first match wins.
/// A capture group, when present, is the token value.
const TOKEN_PATTERNS: &[(TokenType, &str)] = &[
    (TokenType::Identifier, r"(?:[a-zA-Z\-_]|\\.)(?:[a-zA-Z\-_]|\\.|[0-9])*"),
    (TokenType::Whitespace, r"\s+"),
    (TokenType::String, r"'((?:\\.|[^'])*)'"),
    (TokenType::UnterminatedString, r"'((?:\\.|[^'])*)"),
    (TokenType::Integer, r"[0-9]+"),
    (TokenType::Arrow, r"=>"),
    (TokenType::StartsWith, r"\^="),
    (TokenType::Equals, r"="),
    (TokenType::Dot, r"\."),
    (TokenType::Colon, r":"),
    (TokenType::Gt, r">"),
    (TokenType::OpenParen, r"\("),
    (TokenType::CloseParen, r"\)"),
    (TokenType::OpenSquareBracket, r"\["),
    (TokenType::CloseSquareBracket, r"\]"),
    (TokenType::Choice, r"\|"),
    (TokenType::Bang, r"!"),
];

fn token_table() -> &'static [(TokenType, Regex)] {
    static TABLE: OnceLock<Vec<(TokenType, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        TOKEN_PATTERNS
            .iter()
            .map(|(token_type, pattern)| (*token_type, Regex::new(&format!("^(?:{})", pattern)).unwrap()))
            .collect()
    })
}

/// First matching token at the start of `rest`: type, matched text, value
fn next_token(rest: &str) -> (TokenType, &str, String) {
    for (token_type, pattern) in token_table() {
        if let Some(captures) = pattern.captures(rest) {
            let matched = captures.get(0).map_or("", |m| m.as_str());
            let value = captures.get(1).map_or(matched, |m| m.as_str());
            return (*token_type, matched, value.to_string());
        }
    }
    let width = rest.chars().next().map_or(1, char::len_utf8);
    let matched = &rest[..width];
    (TokenType::Unrecognised, matched, matched.to_string())
}

/// Split a style mapping into tokens; the last token is always `End`
///
/// Offsets count characters, not bytes.
pub fn tokenise(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    let mut offset = 0;

    while position < input.len() {
        let (token_type, matched, value) = next_token(&input[position..]);
        tokens.push(Token {
            token_type,
            value,
            offset,
        });
        position += matched.len();
        offset += matched.chars().count();
    }

    tokens.push(Token {
        token_type: TokenType::End,
        value: String::new(),
        offset,
    });
    tokens
}

/// Decode `\n`, `\r`, `\t`; any other escaped character stands for itself
pub fn decode_escape_sequences(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('t') => decoded.push('\t'),
            Some(other) => decoded.push(other),
            None => decoded.push('\\'),
        }
    }
    decoded
}
