//! The package content-type manifest (`[Content_Types].xml`)

use tracing::debug;

use crate::archive::{OoxmlArchive, CONTENT_TYPES_PATH};
use crate::error::{OoxmlError, Result};
use crate::xml::{parse_xml, WriteOptions, XmlElement, XmlNode};

/// Namespace of the content-type manifest
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content types that mark the main WordprocessingML part
pub const MAIN_DOCUMENT_CONTENT_TYPES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
    "application/vnd.ms-word.document.macroEnabled.main+xml",
];

/// Parsed `[Content_Types].xml`, kept as a tree so unknown entries survive
#[derive(Debug, Clone)]
pub struct ContentTypes {
    root: XmlElement,
}

impl ContentTypes {
    /// Read the manifest from an archive
    pub fn read(archive: &OoxmlArchive) -> Result<Self> {
        Ok(Self {
            root: archive.require_xml(CONTENT_TYPES_PATH)?,
        })
    }

    /// Parse manifest XML
    pub fn parse(xml: &str) -> Result<Self> {
        Ok(Self {
            root: parse_xml(xml)?,
        })
    }

    /// Wrap an already parsed manifest
    pub fn from_element(root: XmlElement) -> Self {
        Self { root }
    }

    /// The underlying tree
    pub fn element(&self) -> &XmlElement {
        &self.root
    }

    /// Path of the main document relative to `word/` (usually `document.xml`)
    pub fn main_document_part(&self) -> Result<String> {
        self.root
            .elements()
            .filter(|e| {
                e.attribute("ContentType")
                    .is_some_and(|ct| MAIN_DOCUMENT_CONTENT_TYPES.contains(&ct))
            })
            .find_map(|e| e.attribute("PartName"))
            .map(|part| part.replacen("/word/", "", 1))
            .ok_or_else(|| {
                OoxmlError::InvalidStructure(format!(
                    "Could not find main document (e.g. document.xml) in {}",
                    CONTENT_TYPES_PATH
                ))
            })
    }

    /// Content type of a part: its override first, then the default for its extension
    pub fn find_content_type(&self, path: &str) -> Option<&str> {
        let part_name = format!("/{}", path.trim_start_matches('/'));
        let overridden = self.root.elements().find(|e| {
            e.local_name() == "Override" && e.attribute("PartName") == Some(part_name.as_str())
        });
        if let Some(content_type) = overridden.and_then(|e| e.attribute("ContentType")) {
            return Some(content_type);
        }

        let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
        self.root
            .elements()
            .find(|e| {
                e.local_name() == "Default"
                    && e.attribute("Extension")
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(&extension))
            })
            .and_then(|e| e.attribute("ContentType"))
    }

    /// Whether a `Default` entry exists for the extension
    pub fn has_default(&self, extension: &str) -> bool {
        self.root
            .elements()
            .any(|e| e.local_name() == "Default" && e.attribute("Extension") == Some(extension))
    }

    /// Add a `Default` entry unless the extension is already declared
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) -> bool {
        if self.has_default(extension) {
            return false;
        }
        debug!(extension, content_type, "adding default content type");
        self.root.children.push(XmlNode::Element(
            XmlElement::new("Default")
                .with_attribute("Extension", extension)
                .with_attribute("ContentType", content_type),
        ));
        true
    }

    /// Add or update the `Override` entry for a part
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        let existing = self.root.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(e)
                if e.local_name() == "Override" && e.attribute("PartName") == Some(part_name) =>
            {
                Some(e)
            }
            _ => None,
        });
        match existing {
            Some(e) => e.set_attribute("ContentType", content_type),
            None => self.root.children.push(XmlNode::Element(
                XmlElement::new("Override")
                    .with_attribute("PartName", part_name)
                    .with_attribute("ContentType", content_type),
            )),
        }
    }

    /// Write the manifest back into the archive
    pub fn write(&self, archive: &mut OoxmlArchive) {
        archive.set_xml(CONTENT_TYPES_PATH, &self.root, &WriteOptions::plain());
    }
}
