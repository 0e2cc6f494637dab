//! Left-hand side of a style mapping: which document elements it applies to

use std::fmt;

use crate::document::{BreakType, NumberingLevel, Paragraph, Run, Table};

/// Comparison applied to a style name (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringMatcher {
    EqualTo(String),
    StartsWith(String),
}

impl StringMatcher {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            StringMatcher::EqualTo(operand) => operand.to_uppercase() == value.to_uppercase(),
            StringMatcher::StartsWith(operand) => {
                value.to_uppercase().starts_with(&operand.to_uppercase())
            }
        }
    }
}

/// List membership required by `:ordered-list(N)` / `:unordered-list(N)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMatcher {
    pub is_ordered: bool,
    /// Zero-based; written one-based
    pub level_index: usize,
}

impl ListMatcher {
    fn matches(&self, numbering: Option<&NumberingLevel>) -> bool {
        numbering.is_some_and(|n| n.level_index == self.level_index && n.is_ordered == self.is_ordered)
    }
}

/// Conditions shared by paragraph, run and table matchers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementMatcher {
    pub style_id: Option<String>,
    pub style_name: Option<StringMatcher>,
    pub list: Option<ListMatcher>,
}

impl ElementMatcher {
    fn matches(
        &self,
        style_id: Option<&str>,
        style_name: Option<&str>,
        numbering: Option<&NumberingLevel>,
    ) -> bool {
        self.style_id.as_deref().map_or(true, |id| style_id == Some(id))
            && self
                .style_name
                .as_ref()
                .map_or(true, |m| style_name.is_some_and(|name| m.matches(name)))
            && self.list.map_or(true, |list| list.matches(numbering))
    }
}

/// The document side of a style mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentMatcher {
    Paragraph(ElementMatcher),
    Run(ElementMatcher),
    Table(ElementMatcher),
    Bold,
    Italic,
    Underline,
    Strikethrough,
    AllCaps,
    SmallCaps,
    CommentReference,
    Break(BreakType),
}

/// Something a matcher can be tested against
#[derive(Debug, Clone, Copy)]
pub enum MatchTarget<'a> {
    Paragraph(&'a Paragraph),
    Run(&'a Run),
    Table(&'a Table),
    Break(BreakType),
    Bold,
    Italic,
    Underline,
    Strikethrough,
    AllCaps,
    SmallCaps,
    CommentReference,
}

impl DocumentMatcher {
    pub fn matches(&self, target: MatchTarget<'_>) -> bool {
        match (self, target) {
            (DocumentMatcher::Paragraph(m), MatchTarget::Paragraph(p)) => m.matches(
                p.style_id.as_deref(),
                p.style_name.as_deref(),
                p.numbering.as_ref(),
            ),
            (DocumentMatcher::Run(m), MatchTarget::Run(r)) => {
                m.matches(r.style_id.as_deref(), r.style_name.as_deref(), None)
            }
            (DocumentMatcher::Table(m), MatchTarget::Table(t)) => {
                m.matches(t.style_id.as_deref(), t.style_name.as_deref(), None)
            }
            (DocumentMatcher::Break(expected), MatchTarget::Break(actual)) => *expected == actual,
            (DocumentMatcher::Bold, MatchTarget::Bold)
            | (DocumentMatcher::Italic, MatchTarget::Italic)
            | (DocumentMatcher::Underline, MatchTarget::Underline)
            | (DocumentMatcher::Strikethrough, MatchTarget::Strikethrough)
            | (DocumentMatcher::AllCaps, MatchTarget::AllCaps)
            | (DocumentMatcher::SmallCaps, MatchTarget::SmallCaps)
            | (DocumentMatcher::CommentReference, MatchTarget::CommentReference) => true,
            _ => false,
        }
    }
}

/// Escape a value for use inside a quoted style-map string
pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::from("'");
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

/// Escape a value for use as a style-map identifier
pub(crate) fn identifier(value: &str) -> String {
    let mut escaped = String::new();
    for (i, c) in value.chars().enumerate() {
        let plain = c.is_ascii_alphabetic() || c == '-' || c == '_' || (i > 0 && c.is_ascii_digit());
        match c {
            _ if plain => escaped.push(c),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => {
                escaped.push('\\');
                escaped.push(other);
            }
        }
    }
    escaped
}

fn write_element_matcher(f: &mut fmt::Formatter<'_>, m: &ElementMatcher) -> fmt::Result {
    if let Some(id) = &m.style_id {
        write!(f, ".{}", identifier(id))?;
    }
    match &m.style_name {
        Some(StringMatcher::EqualTo(name)) => write!(f, "[style-name={}]", quote(name))?,
        Some(StringMatcher::StartsWith(name)) => write!(f, "[style-name^={}]", quote(name))?,
        None => {}
    }
    if let Some(list) = &m.list {
        let kind = if list.is_ordered { "ordered-list" } else { "unordered-list" };
        write!(f, ":{}({})", kind, list.level_index + 1)?;
    }
    Ok(())
}

impl fmt::Display for DocumentMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentMatcher::Paragraph(m) => {
                f.write_str("p")?;
                write_element_matcher(f, m)
            }
            DocumentMatcher::Run(m) => {
                f.write_str("r")?;
                write_element_matcher(f, m)
            }
            DocumentMatcher::Table(m) => {
                f.write_str("table")?;
                write_element_matcher(f, m)
            }
            DocumentMatcher::Bold => f.write_str("b"),
            DocumentMatcher::Italic => f.write_str("i"),
            DocumentMatcher::Underline => f.write_str("u"),
            DocumentMatcher::Strikethrough => f.write_str("strike"),
            DocumentMatcher::AllCaps => f.write_str("all-caps"),
            DocumentMatcher::SmallCaps => f.write_str("small-caps"),
            DocumentMatcher::CommentReference => f.write_str("comment-reference"),
            DocumentMatcher::Break(break_type) => write!(f, "br[type='{}']", break_type.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading() -> Paragraph {
        Paragraph {
            style_id: Some("Heading1".into()),
            style_name: Some("Heading 1".into()),
            ..Paragraph::default()
        }
    }

    #[test]
    fn test_style_name_is_case_insensitive() {
        let matcher = DocumentMatcher::Paragraph(ElementMatcher {
            style_name: Some(StringMatcher::EqualTo("heading 1".into())),
            ..ElementMatcher::default()
        });
        assert!(matcher.matches(MatchTarget::Paragraph(&heading())));

        let prefix = DocumentMatcher::Paragraph(ElementMatcher {
            style_name: Some(StringMatcher::StartsWith("HEAD".into())),
            ..ElementMatcher::default()
        });
        assert!(prefix.matches(MatchTarget::Paragraph(&heading())));
        assert!(!prefix.matches(MatchTarget::Paragraph(&Paragraph::default())));
    }

    #[test]
    fn test_style_id_is_exact() {
        let matcher = DocumentMatcher::Paragraph(ElementMatcher {
            style_id: Some("heading1".into()),
            ..ElementMatcher::default()
        });
        assert!(!matcher.matches(MatchTarget::Paragraph(&heading())));
    }

    #[test]
    fn test_list_level() {
        let matcher = DocumentMatcher::Paragraph(ElementMatcher {
            list: Some(ListMatcher {
                is_ordered: true,
                level_index: 1,
            }),
            ..ElementMatcher::default()
        });
        let mut item = Paragraph::default();
        assert!(!matcher.matches(MatchTarget::Paragraph(&item)));
        item.numbering = Some(NumberingLevel {
            level_index: 1,
            is_ordered: true,
        });
        assert!(matcher.matches(MatchTarget::Paragraph(&item)));
    }

    #[test]
    fn test_element_kinds_do_not_cross() {
        let run_matcher = DocumentMatcher::Run(ElementMatcher::default());
        assert!(!run_matcher.matches(MatchTarget::Paragraph(&Paragraph::default())));
        assert!(run_matcher.matches(MatchTarget::Run(&Run::default())));
        assert!(DocumentMatcher::Break(BreakType::Page).matches(MatchTarget::Break(BreakType::Page)));
        assert!(!DocumentMatcher::Break(BreakType::Page).matches(MatchTarget::Break(BreakType::Line)));
    }

    #[test]
    fn test_display() {
        let matcher = DocumentMatcher::Paragraph(ElementMatcher {
            style_id: Some("Heading 1".into()),
            style_name: Some(StringMatcher::EqualTo("it's".into())),
            list: Some(ListMatcher {
                is_ordered: false,
                level_index: 0,
            }),
        });
        assert_eq!(
            matcher.to_string(),
            r"p.Heading\ 1[style-name='it\'s']:unordered-list(1)"
        );
        assert_eq!(DocumentMatcher::Break(BreakType::Column).to_string(), "br[type='column']");
    }
}
