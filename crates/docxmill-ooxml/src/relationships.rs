//! Relationships parsing and modification for OOXML packages
//!
//! OOXML uses relationship files (`_rels/*.rels`) to map IDs to targets.
//! Hyperlinks, images, embedded HTML chunks and the note/comment parts are
//! all reached through them.
//!
//! # Example
//!
//! ```
//! use docxmill_ooxml::Relationships;
//!
//! let mut rels = Relationships::new();
//! rels.add_with_id("img3", "media/template_document.xml_img3.png", Relationships::TYPE_IMAGE, None);
//! assert_eq!(rels.get("img3"), Some("media/template_document.xml_img3.png"));
//! assert!(rels.to_xml().contains(r#"Id="img3""#));
//! ```

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{OoxmlError, Result};
use crate::xml::escape_attribute;

/// OOXML namespace for relationships
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Common relationship type URIs
impl Relationships {
    /// Main document part (package-level `_rels/.rels`)
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Hyperlink relationship type
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    /// Image relationship type
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    /// Alternative format chunk (embedded HTML)
    pub const TYPE_AF_CHUNK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk";
    /// Styles relationship type
    pub const TYPE_STYLES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    /// Numbering relationship type
    pub const TYPE_NUMBERING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    /// Footnotes relationship type
    pub const TYPE_FOOTNOTES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";
    /// Endnotes relationship type
    pub const TYPE_ENDNOTES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/endnotes";
    /// Comments relationship type
    pub const TYPE_COMMENTS: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
}

/// Parsed relationships from a .rels file
///
/// Maintains insertion order for deterministic XML serialization.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Ordered list of relationship IDs (maintains insertion order)
    order: Vec<String>,
    /// Map of relationship ID to target (for fast lookups)
    map: HashMap<String, RelationshipTarget>,
    /// Counter for generating unique IDs (starts at 1)
    next_id_counter: u32,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1, // IDs start at rId1
        }
    }
}

/// A relationship target with its type and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTarget {
    /// The target URL or path
    pub target: String,
    /// The relationship type URI (e.g., hyperlink, image, styles)
    pub rel_type: String,
    /// Target mode: "External" for URLs, None for internal paths
    pub target_mode: Option<String>,
}

impl Relationships {
    /// Create an empty relationships map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse relationships from XML bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut rels = Relationships::new();
        let mut max_id: u32 = 0;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;
                        let mut rel_type = None;
                        let mut target_mode = None;

                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let value = attr.unescape_value().ok().map(|s| s.to_string());
                            match attr.key.as_ref() {
                                b"Id" => id = value,
                                b"Target" => target = value,
                                b"Type" => rel_type = value,
                                b"TargetMode" => target_mode = value,
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            // Track the maximum numeric ID for generating new IDs
                            if let Some(num) = extract_id_number(&id) {
                                max_id = max_id.max(num);
                            }
                            rels.insert(
                                id,
                                RelationshipTarget {
                                    target,
                                    rel_type: rel_type.unwrap_or_default(),
                                    target_mode,
                                },
                            );
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OoxmlError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        rels.next_id_counter = max_id + 1;
        Ok(rels)
    }

    /// Parse an optional .rels part; a missing part is an empty set
    pub fn parse_optional(xml: Option<&[u8]>) -> Result<Self> {
        match xml {
            Some(bytes) => Self::parse(bytes),
            None => Ok(Self::new()),
        }
    }

    /// Add a new relationship and return the generated `rIdN` ID
    pub fn add(&mut self, target: impl Into<String>, rel_type: impl Into<String>) -> String {
        let target = target.into();
        let rel_type = rel_type.into();
        let id = self.next_generated_id();

        let target_mode = if rel_type == Self::TYPE_HYPERLINK && target.contains("://") {
            Some("External".to_string())
        } else {
            None
        };

        self.insert(
            id.clone(),
            RelationshipTarget {
                target,
                rel_type,
                target_mode,
            },
        );
        id
    }

    /// Add a relationship under a caller-chosen ID
    ///
    /// An existing relationship with the same ID is replaced in place.
    pub fn add_with_id(
        &mut self,
        id: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
        target_mode: Option<&str>,
    ) {
        let id = id.into();
        if let Some(num) = extract_id_number(&id) {
            self.next_id_counter = self.next_id_counter.max(num + 1);
        }
        self.insert(
            id,
            RelationshipTarget {
                target: target.into(),
                rel_type: rel_type.into(),
                target_mode: target_mode.map(str::to_string),
            },
        );
    }

    fn insert(&mut self, id: String, target: RelationshipTarget) {
        if self.map.insert(id.clone(), target).is_none() {
            self.order.push(id);
        }
    }

    fn next_generated_id(&mut self) -> String {
        loop {
            let id = format!("rId{}", self.next_id_counter);
            self.next_id_counter += 1;
            if !self.map.contains_key(&id) {
                return id;
            }
        }
    }

    /// Serialize relationships to OOXML format
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, RELATIONSHIPS_NS));

        // Iterate in insertion order for deterministic output
        for (id, rel) in self.iter() {
            xml.push_str("<Relationship");
            xml.push_str(&format!(r#" Id="{}""#, escape_attribute(id)));
            xml.push_str(&format!(r#" Type="{}""#, escape_attribute(&rel.rel_type)));
            xml.push_str(&format!(r#" Target="{}""#, escape_attribute(&rel.target)));
            if let Some(mode) = &rel.target_mode {
                xml.push_str(&format!(r#" TargetMode="{}""#, escape_attribute(mode)));
            }
            xml.push_str("/>");
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Get the target for a relationship ID
    pub fn get(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// Get the full relationship target for an ID
    pub fn get_target(&self, id: &str) -> Option<&RelationshipTarget> {
        self.map.get(id)
    }

    /// Check if a relationship ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// Targets of every relationship with the given type, in order
    pub fn targets_of_type<'a>(&'a self, rel_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.iter()
            .filter(move |(_, rel)| rel.rel_type == rel_type)
            .map(|(_, rel)| rel.target.as_str())
    }

    /// Get the number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if there are no relationships
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over relationships in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipTarget)> {
        self.order
            .iter()
            .filter_map(|id| self.map.get(id).map(|rel| (id.as_str(), rel)))
    }
}

/// Extract the numeric portion from a relationship ID (e.g., "rId5" -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    id.strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))
        .and_then(|num_str| num_str.parse().ok())
}
