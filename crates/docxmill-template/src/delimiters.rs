//! Command delimiters and splitting text into literal and command segments

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};

/// Default marker on both sides of a command
pub const DEFAULT_DELIMITER: &str = "+++";

/// The pair of markers bounding a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::symmetric(DEFAULT_DELIMITER)
    }
}

impl Delimiters {
    /// An asymmetric pair, e.g. `{` and `}`
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self> {
        let delimiters = Self {
            open: open.into(),
            close: close.into(),
        };
        delimiters.validate()?;
        Ok(delimiters)
    }

    /// The same marker on both sides
    pub fn symmetric(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        Self {
            open: delimiter.clone(),
            close: delimiter,
        }
    }

    /// Reject empty markers
    pub fn validate(&self) -> Result<()> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(TemplateError::InvalidOptions(
                "command delimiters must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Wrap a command in the delimiters
    pub fn wrap(&self, command: &str) -> String {
        format!("{}{}{}", self.open, command, self.close)
    }

    /// Byte ranges of complete commands (delimiters included) in `text`
    ///
    /// An opening marker without a closing one ends the scan.
    pub(crate) fn command_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut position = 0;
        while let Some(found) = text[position..].find(&self.open) {
            let start = position + found;
            let body = start + self.open.len();
            match text[body..].find(&self.close) {
                Some(found) => {
                    let end = body + found + self.close.len();
                    ranges.push((start, end));
                    position = end;
                }
                None => break,
            }
        }
        ranges
    }

    /// Split text into literal runs and command bodies
    pub(crate) fn split(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut position = 0;
        for (start, end) in self.command_ranges(text) {
            if start > position {
                segments.push(Segment::Literal(text[position..start].to_string()));
            }
            let body = &text[start + self.open.len()..end - self.close.len()];
            segments.push(Segment::Command(body.to_string()));
            position = end;
        }
        if position < text.len() {
            segments.push(Segment::Literal(text[position..].to_string()));
        }
        segments
    }
}

/// A piece of a text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Command(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_symmetric() {
        let d = Delimiters::default();
        assert_eq!(d.open, "+++");
        assert_eq!(d.close, "+++");
        assert_eq!(d.wrap("INS x"), "+++INS x+++");
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert!(Delimiters::new("", "}").is_err());
        assert!(Delimiters::new("{", "}").is_ok());
    }

    #[test]
    fn test_split_segments() {
        let d = Delimiters::default();
        assert_eq!(
            d.split("Hello +++name+++!+++=x+++"),
            vec![
                Segment::Literal("Hello ".to_string()),
                Segment::Command("name".to_string()),
                Segment::Literal("!".to_string()),
                Segment::Command("=x".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_command_stays_literal() {
        let d = Delimiters::new("{", "}").unwrap();
        assert_eq!(
            d.split("a {b} {c"),
            vec![
                Segment::Literal("a ".to_string()),
                Segment::Command("b".to_string()),
                Segment::Literal(" {c".to_string()),
            ]
        );
    }
}
