//! Right-hand side of a style mapping: the HTML to wrap content in

use std::fmt;

use super::matchers::{identifier, quote};
use crate::html::{element_with_tag, HtmlNode, HtmlTag};

/// Nested HTML elements, outermost first, or an instruction to drop content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlPath {
    /// `!`: the element and its content are discarded
    Ignore,
    Elements(Vec<HtmlTag>),
}

impl HtmlPath {
    /// Emit the children without a wrapper
    pub fn empty() -> Self {
        HtmlPath::Elements(Vec::new())
    }

    /// A single fresh element
    pub fn top_level_element(tag_name: &str) -> Self {
        HtmlPath::Elements(vec![HtmlTag::new(tag_name).fresh()])
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, HtmlPath::Ignore)
    }

    /// Wrap generated children; `children` is not called for ignored paths
    pub fn wrap(&self, children: impl FnOnce() -> Vec<HtmlNode>) -> Vec<HtmlNode> {
        match self {
            HtmlPath::Ignore => Vec::new(),
            HtmlPath::Elements(tags) => tags
                .iter()
                .rev()
                .fold(children(), |nodes, tag| vec![element_with_tag(tag.clone(), nodes)]),
        }
    }
}

impl fmt::Display for HtmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags = match self {
            HtmlPath::Ignore => return f.write_str("!"),
            HtmlPath::Elements(tags) => tags,
        };
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            let names: Vec<String> = tag.tag_names.iter().map(|n| identifier(n)).collect();
            f.write_str(&names.join("|"))?;
            if let Some(classes) = tag.attribute("class") {
                for class in classes.split(' ').filter(|c| !c.is_empty()) {
                    write!(f, ".{}", identifier(class))?;
                }
            }
            if tag.fresh {
                f.write_str(":fresh")?;
            }
            if let Some(separator) = &tag.separator {
                write!(f, ":separator({})", quote(separator))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::text;

    #[test]
    fn test_wrap_nests_outermost_first() {
        let path = HtmlPath::Elements(vec![HtmlTag::new("ul"), HtmlTag::new("li").fresh()]);
        let nodes = path.wrap(|| vec![text("x")]);
        assert_eq!(
            nodes,
            vec![element_with_tag(
                HtmlTag::new("ul"),
                vec![element_with_tag(HtmlTag::new("li").fresh(), vec![text("x")])]
            )]
        );
    }

    #[test]
    fn test_ignore_never_generates_children() {
        let mut called = false;
        let nodes = HtmlPath::Ignore.wrap(|| {
            called = true;
            vec![text("x")]
        });
        assert!(nodes.is_empty());
        assert!(!called);
    }

    #[test]
    fn test_empty_path_passes_children_through() {
        assert_eq!(HtmlPath::empty().wrap(|| vec![text("x")]), vec![text("x")]);
    }

    #[test]
    fn test_display() {
        let mut choice = HtmlTag::new("ul").with_attribute("class", "a b");
        choice.tag_names.push("ol".into());
        let mut pre = HtmlTag::new("pre").fresh();
        pre.separator = Some("\n".into());
        let path = HtmlPath::Elements(vec![choice, pre]);
        assert_eq!(path.to_string(), r"ul|ol.a.b > pre:fresh:separator('\n')");
        assert_eq!(HtmlPath::Ignore.to_string(), "!");
        assert_eq!(HtmlPath::empty().to_string(), "");
    }
}
