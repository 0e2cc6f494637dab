//! A small XML tree for reading and rewriting OOXML parts
//!
//! Names are kept exactly as written (`w:p`, `Relationship`), attribute
//! order is preserved and text nodes are never trimmed, so a part that is
//! parsed and written back only differs in its declaration and in escaping.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};

/// Declaration written at the top of every serialized part
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Default delimiter for raw XML fragments embedded in text nodes
pub const DEFAULT_LITERAL_XML_DELIMITER: &str = "||";

/// A node in the tree: an element or a run of character data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// An element with attributes and children
    Element(XmlElement),
    /// Character data (unescaped)
    Text(String),
}

impl XmlNode {
    /// The element, if this node is one
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// Mutable access to the element, if this node is one
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

/// An XML element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Qualified name as written in the source (`w:t`)
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

static EMPTY_ELEMENT: XmlElement = XmlElement {
    name: String::new(),
    attributes: Vec::new(),
    children: Vec::new(),
};

impl XmlElement {
    /// Create an element without attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: append a child node
    pub fn with_child(mut self, child: impl Into<XmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Builder: append a text node
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Clone the element without its children
    pub fn shallow_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Look up an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First child element with the given name
    pub fn first(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// First child element with the given name, or an empty element
    pub fn first_or_empty(&self, name: &str) -> &XmlElement {
        self.first(name).unwrap_or(&EMPTY_ELEMENT)
    }

    /// All descendant elements with the given name, in document order
    pub fn elements_named(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        collect_named(self, name, &mut found);
        found
    }

    /// Concatenated character data of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize with the standard declaration
    pub fn to_xml(&self, options: &WriteOptions) -> String {
        let mut out = String::new();
        if options.declaration {
            out.push_str(XML_DECLARATION);
        }
        write_element(self, options, &mut out);
        out
    }
}

fn collect_named<'a>(element: &'a XmlElement, name: &str, found: &mut Vec<&'a XmlElement>) {
    for child in element.elements() {
        if child.name == name {
            found.push(child);
        }
        collect_named(child, name, found);
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
        }
    }
}

/// Parse a complete XML document into its root element
pub fn parse_xml(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()));
                for attr in e.attributes() {
                    let attr = attr?;
                    element.attributes.push((
                        String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                        attr.unescape_value()?.into_owned(),
                    ));
                }
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()));
                for attr in e.attributes() {
                    let attr = attr?;
                    element.attributes.push((
                        String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                        attr.unescape_value()?.into_owned(),
                    ));
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    OoxmlError::InvalidStructure("unbalanced closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(parent) = stack.last_mut() {
                    let data = e.into_inner();
                    push_text(parent, String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes are dropped
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(OoxmlError::InvalidStructure(format!(
            "unclosed element <{}>",
            stack[stack.len() - 1].name
        )));
    }
    root.ok_or_else(|| OoxmlError::InvalidStructure("document has no root element".to_string()))
}

/// Parse XML bytes, tolerating a UTF-8 byte order mark
pub fn parse_xml_bytes(bytes: &[u8]) -> Result<XmlElement> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    parse_xml(&String::from_utf8_lossy(bytes))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(OoxmlError::InvalidStructure(
                "more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn push_text(parent: &mut XmlElement, text: Cow<'_, str>) {
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(&text);
    } else {
        parent.children.push(XmlNode::Text(text.into_owned()));
    }
}

/// Serialization options
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Text between pairs of this delimiter is written without escaping
    pub literal_xml_delimiter: Option<String>,
    /// Emit the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            literal_xml_delimiter: Some(DEFAULT_LITERAL_XML_DELIMITER.to_string()),
            declaration: true,
        }
    }
}

impl WriteOptions {
    /// Plain serialization: everything escaped, declaration included
    pub fn plain() -> Self {
        Self {
            literal_xml_delimiter: None,
            declaration: true,
        }
    }

    /// Use a custom literal XML delimiter
    pub fn with_literal_xml_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.literal_xml_delimiter = Some(delimiter.into());
        self
    }
}

fn write_element(element: &XmlElement, options: &WriteOptions, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(e, options, out),
            XmlNode::Text(t) => write_text(t, options, out),
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_text(text: &str, options: &WriteOptions, out: &mut String) {
    match options.literal_xml_delimiter.as_deref() {
        Some(delimiter) if !delimiter.is_empty() && text.contains(delimiter) => {
            for (i, segment) in text.split(delimiter).enumerate() {
                if i % 2 == 1 {
                    out.push_str(segment);
                } else {
                    out.push_str(&escape_text(segment));
                }
            }
        }
        _ => out.push_str(&escape_text(text)),
    }
}

/// Escape character data
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value
pub fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
