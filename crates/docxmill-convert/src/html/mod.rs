//! HTML tree produced by the converter before it is written out

mod simplify;

pub use simplify::simplify;

use crate::writers::Writer;

/// Tags written as `<tag />` when they have no children
const VOID_TAG_NAMES: [&str; 3] = ["br", "hr", "img"];

/// An element description shared by style-map paths and the HTML tree
///
/// A tag can carry several alternative names (`ul|ol`); the first one is
/// written, the others only matter when deciding whether two adjacent
/// elements can be collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub tag_names: Vec<String>,
    pub attributes: Vec<(String, String)>,
    /// A fresh element is never merged into a preceding one
    pub fresh: bool,
    /// Inserted between the children of collapsed elements
    pub separator: Option<String>,
}

impl HtmlTag {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_names: vec![tag_name.into()],
            attributes: Vec::new(),
            fresh: false,
            separator: None,
        }
    }

    /// Builder: mark the tag fresh
    pub fn fresh(mut self) -> Self {
        self.fresh = true;
        self
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: replace the attributes
    pub fn with_attributes(mut self, attributes: Vec<(String, String)>) -> Self {
        self.attributes = attributes;
        self
    }

    /// The name that gets written
    pub fn tag_name(&self) -> &str {
        self.tag_names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `other` could have been produced by this tag
    pub fn matches_element(&self, other: &HtmlTag) -> bool {
        self.tag_names.iter().any(|name| name == other.tag_name())
            && sorted(&self.attributes) == sorted(&other.attributes)
    }
}

fn sorted(attributes: &[(String, String)]) -> Vec<&(String, String)> {
    let mut sorted: Vec<_> = attributes.iter().collect();
    sorted.sort();
    sorted
}

/// A node of the HTML tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
    /// Keeps its parent from being removed as empty; writes nothing
    ForceWrite,
}

/// An element with children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    pub tag: HtmlTag,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    /// Void elements are written self-closed and survive simplification
    pub fn is_void(&self) -> bool {
        self.children.is_empty() && VOID_TAG_NAMES.contains(&self.tag.tag_name())
    }
}

/// Element node for a tag
pub fn element_with_tag(tag: HtmlTag, children: Vec<HtmlNode>) -> HtmlNode {
    HtmlNode::Element(HtmlElement { tag, children })
}

/// Fresh element node
pub fn fresh_element(tag_name: &str, attributes: Vec<(String, String)>, children: Vec<HtmlNode>) -> HtmlNode {
    element_with_tag(HtmlTag::new(tag_name).with_attributes(attributes).fresh(), children)
}

/// Non-fresh element node
pub fn non_fresh_element(
    tag_name: &str,
    attributes: Vec<(String, String)>,
    children: Vec<HtmlNode>,
) -> HtmlNode {
    element_with_tag(HtmlTag::new(tag_name).with_attributes(attributes), children)
}

/// Text node
pub fn text(value: impl Into<String>) -> HtmlNode {
    HtmlNode::Text(value.into())
}

/// Write nodes through a writer
pub fn write(writer: &mut dyn Writer, nodes: &[HtmlNode]) {
    for node in nodes {
        match node {
            HtmlNode::Element(element) if element.is_void() => {
                writer.self_closing(element.tag.tag_name(), &element.tag.attributes);
            }
            HtmlNode::Element(element) => {
                writer.open(element.tag.tag_name(), &element.tag.attributes);
                write(writer, &element.children);
                writer.close(element.tag.tag_name());
            }
            HtmlNode::Text(value) => writer.text(value),
            HtmlNode::ForceWrite => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_matches_element_ignores_attribute_order() {
        let a = HtmlTag::new("a").with_attributes(attrs(&[("href", "x"), ("id", "y")]));
        let b = HtmlTag::new("a").with_attributes(attrs(&[("id", "y"), ("href", "x")]));
        assert!(a.matches_element(&b));
        assert!(!a.matches_element(&HtmlTag::new("a")));
    }

    #[test]
    fn test_choice_tags_match_any_alternative() {
        let mut choice = HtmlTag::new("ul");
        choice.tag_names.push("ol".to_string());
        assert!(choice.matches_element(&HtmlTag::new("ol")));
        assert!(choice.matches_element(&HtmlTag::new("ul")));
        assert!(!HtmlTag::new("ol").matches_element(&choice));
    }

    #[test]
    fn test_void_elements() {
        let img = HtmlElement {
            tag: HtmlTag::new("img"),
            children: vec![],
        };
        let p = HtmlElement {
            tag: HtmlTag::new("p"),
            children: vec![],
        };
        assert!(img.is_void());
        assert!(!p.is_void());
    }
}
