//! Recursive-descent parser for style mappings
//!
//! Grammar, one mapping per line:
//!
//! ```text
//! mapping  = matcher WS "=>" [WS path] END
//! matcher  = ("p" | "r") suffix* | "table" style-suffix* | "b" | "i" | "u"
//!          | "strike" | "all-caps" | "small-caps" | "comment-reference"
//!          | "br[type='line'|'page'|'column']"
//! path     = "!" | [element (WS ">" WS element)*]
//! element  = tag ("|" tag)* ("." class)* [":fresh"] [":separator('...')"]
//! ```
//!
//! Once a suffix or class has committed (after `.`, `[` or a list keyword)
//! a mismatch is reported instead of backtracking.

use std::fmt;

use super::html_paths::HtmlPath;
use super::matchers::{DocumentMatcher, ElementMatcher, ListMatcher, StringMatcher};
use super::tokeniser::{decode_escape_sequences, tokenise, Token, TokenType};
use crate::document::BreakType;
use crate::html::HtmlTag;
use crate::results::{ConversionResult, Message};

/// One `matcher => path` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMapping {
    pub from: DocumentMatcher,
    pub to: HtmlPath,
}

impl fmt::Display for StyleMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} =>", self.from)?;
        let path = self.to.to_string();
        if !path.is_empty() {
            write!(f, " {}", path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParseError {
    offset: usize,
    expected: String,
    actual: String,
}

type ParseResult<T> = std::result::Result<T, ParseError>;

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            tokens: tokenise(input),
            position: 0,
        }
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let index = (self.position + ahead).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn is_at(&self, ahead: usize, token_type: TokenType) -> bool {
        self.peek_at(ahead).token_type == token_type
    }

    fn is_identifier_at(&self, ahead: usize, value: &str) -> bool {
        let token = self.peek_at(ahead);
        token.token_type == TokenType::Identifier && token.value == value
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            offset: token.offset,
            expected: expected.into(),
            actual: token.describe(),
        }
    }

    fn expect(&mut self, token_type: TokenType) -> ParseResult<Token> {
        if self.is_at(0, token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(token_type.to_string()))
        }
    }

    fn expect_identifier(&mut self, value: &str) -> ParseResult<()> {
        if self.is_identifier_at(0, value) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("identifier \"{}\"", value)))
        }
    }

    fn style_mapping(&mut self) -> ParseResult<StyleMapping> {
        let from = self.document_matcher()?;
        self.expect(TokenType::Whitespace)?;
        self.expect(TokenType::Arrow)?;
        let to = if self.is_at(0, TokenType::Whitespace) {
            self.advance();
            self.html_path()?
        } else {
            HtmlPath::empty()
        };
        Ok(StyleMapping { from, to })
    }

    fn document_matcher(&mut self) -> ParseResult<DocumentMatcher> {
        if !self.is_at(0, TokenType::Identifier) {
            return Err(self.error("element type"));
        }
        let keyword = self.peek().value.clone();
        let simple = match keyword.as_str() {
            "b" => Some(DocumentMatcher::Bold),
            "i" => Some(DocumentMatcher::Italic),
            "u" => Some(DocumentMatcher::Underline),
            "strike" => Some(DocumentMatcher::Strikethrough),
            "all-caps" => Some(DocumentMatcher::AllCaps),
            "small-caps" => Some(DocumentMatcher::SmallCaps),
            "comment-reference" => Some(DocumentMatcher::CommentReference),
            _ => None,
        };
        if let Some(matcher) = simple {
            self.advance();
            return Ok(matcher);
        }

        match keyword.as_str() {
            "p" => {
                self.advance();
                Ok(DocumentMatcher::Paragraph(self.matcher_suffixes(true)?))
            }
            "r" => {
                self.advance();
                Ok(DocumentMatcher::Run(self.matcher_suffixes(true)?))
            }
            "table" => {
                self.advance();
                Ok(DocumentMatcher::Table(self.matcher_suffixes(false)?))
            }
            "br" => {
                self.advance();
                self.break_matcher()
            }
            _ => Err(self.error("element type")),
        }
    }

    fn matcher_suffixes(&mut self, allow_list: bool) -> ParseResult<ElementMatcher> {
        let mut matcher = ElementMatcher::default();
        loop {
            if self.is_at(0, TokenType::Dot) {
                self.advance();
                let id = self.expect(TokenType::Identifier)?;
                matcher.style_id = Some(decode_escape_sequences(&id.value));
            } else if self.is_at(0, TokenType::OpenSquareBracket) {
                self.advance();
                self.expect_identifier("style-name")?;
                matcher.style_name = Some(self.style_name_matcher()?);
                self.expect(TokenType::CloseSquareBracket)?;
            } else if allow_list
                && self.is_at(0, TokenType::Colon)
                && (self.is_identifier_at(1, "ordered-list")
                    || self.is_identifier_at(1, "unordered-list"))
            {
                self.advance();
                let is_ordered = self.advance().value == "ordered-list";
                self.expect(TokenType::OpenParen)?;
                let level = self.list_level()?;
                self.expect(TokenType::CloseParen)?;
                matcher.list = Some(ListMatcher {
                    is_ordered,
                    level_index: level - 1,
                });
            } else {
                return Ok(matcher);
            }
        }
    }

    fn style_name_matcher(&mut self) -> ParseResult<StringMatcher> {
        let starts_with = match self.peek().token_type {
            TokenType::Equals => false,
            TokenType::StartsWith => true,
            _ => return Err(self.error("style name matcher")),
        };
        self.advance();
        let name = self.string()?;
        Ok(if starts_with {
            StringMatcher::StartsWith(name)
        } else {
            StringMatcher::EqualTo(name)
        })
    }

    fn list_level(&mut self) -> ParseResult<usize> {
        if !self.is_at(0, TokenType::Integer) {
            return Err(self.error("integer"));
        }
        match self.peek().value.parse::<usize>() {
            Ok(level) if level >= 1 => {
                self.advance();
                Ok(level)
            }
            _ => Err(self.error("list level of at least 1")),
        }
    }

    fn break_matcher(&mut self) -> ParseResult<DocumentMatcher> {
        self.expect(TokenType::OpenSquareBracket)?;
        self.expect_identifier("type")?;
        self.expect(TokenType::Equals)?;
        if !self.is_at(0, TokenType::String) {
            return Err(self.error("string"));
        }
        let break_type = match decode_escape_sequences(&self.peek().value).as_str() {
            "line" => BreakType::Line,
            "page" => BreakType::Page,
            "column" => BreakType::Column,
            _ => return Err(self.error("break type")),
        };
        self.advance();
        self.expect(TokenType::CloseSquareBracket)?;
        Ok(DocumentMatcher::Break(break_type))
    }

    fn string(&mut self) -> ParseResult<String> {
        let token = self.expect(TokenType::String)?;
        Ok(decode_escape_sequences(&token.value))
    }

    fn html_path(&mut self) -> ParseResult<HtmlPath> {
        if self.is_at(0, TokenType::Bang) {
            self.advance();
            return Ok(HtmlPath::Ignore);
        }

        let mut tags = Vec::new();
        if !self.is_at(0, TokenType::Identifier) {
            return Ok(HtmlPath::Elements(tags));
        }
        tags.push(self.html_path_element()?);
        while self.is_at(0, TokenType::Whitespace)
            && self.is_at(1, TokenType::Gt)
            && self.is_at(2, TokenType::Whitespace)
            && self.is_at(3, TokenType::Identifier)
        {
            for _ in 0..3 {
                self.advance();
            }
            tags.push(self.html_path_element()?);
        }
        Ok(HtmlPath::Elements(tags))
    }

    fn html_path_element(&mut self) -> ParseResult<HtmlTag> {
        let first = self.expect(TokenType::Identifier)?;
        let mut tag_names = vec![decode_escape_sequences(&first.value)];
        while self.is_at(0, TokenType::Choice) && self.is_at(1, TokenType::Identifier) {
            self.advance();
            tag_names.push(decode_escape_sequences(&self.advance().value));
        }

        let mut classes = Vec::new();
        while self.is_at(0, TokenType::Dot) {
            self.advance();
            let class = self.expect(TokenType::Identifier)?;
            classes.push(decode_escape_sequences(&class.value));
        }

        let mut fresh = false;
        if self.is_at(0, TokenType::Colon) && self.is_identifier_at(1, "fresh") {
            self.advance();
            self.advance();
            fresh = true;
        }

        let mut separator = None;
        if self.is_at(0, TokenType::Colon)
            && self.is_identifier_at(1, "separator")
            && self.is_at(2, TokenType::OpenParen)
            && self.is_at(3, TokenType::String)
            && self.is_at(4, TokenType::CloseParen)
        {
            self.advance();
            self.advance();
            self.advance();
            let value = decode_escape_sequences(&self.advance().value);
            self.advance();
            if !value.is_empty() {
                separator = Some(value);
            }
        }

        let mut tag = HtmlTag {
            tag_names,
            attributes: Vec::new(),
            fresh,
            separator,
        };
        if !classes.is_empty() {
            tag.attributes.push(("class".to_string(), classes.join(" ")));
        }
        Ok(tag)
    }
}

fn parse_string<T>(
    input: &str,
    rule: impl FnOnce(&mut Parser) -> ParseResult<T>,
) -> ConversionResult<Option<T>> {
    let mut parser = Parser::new(input);
    let result = rule(&mut parser).and_then(|value| {
        parser.expect(TokenType::End)?;
        Ok(value)
    });
    match result {
        Ok(value) => ConversionResult::success(Some(value)),
        Err(error) => ConversionResult::new(
            None,
            vec![Message::warning(format!(
                "Did not understand this style mapping, so ignored it: {}\nError was at character number {}: Expected {} but got {}",
                input,
                error.offset + 1,
                error.expected,
                error.actual
            ))],
        ),
    }
}

/// Parse one style mapping; failures are warnings and yield `None`
pub fn read_style(line: &str) -> ConversionResult<Option<StyleMapping>> {
    parse_string(line, Parser::style_mapping)
}

/// Parse only the document side of a mapping
pub fn read_document_matcher(input: &str) -> ConversionResult<Option<DocumentMatcher>> {
    parse_string(input, Parser::document_matcher)
}

/// Parse only the HTML side of a mapping
pub fn read_html_path(input: &str) -> ConversionResult<Option<HtmlPath>> {
    parse_string(input, Parser::html_path)
}

/// Split style-map text into rules, dropping blank lines and `#` comments
pub fn read_style_map_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Parse every rule, keeping the ones that parsed
pub fn parse_style_map<S: AsRef<str>>(lines: &[S]) -> ConversionResult<Vec<StyleMapping>> {
    ConversionResult::combine(lines.iter().map(|line| read_style(line.as_ref())))
        .map(|mappings| mappings.into_iter().flatten().collect())
}
