//! Reading a DOCX package into the document model

mod body;
mod comments;
mod notes;
pub mod numbering;
mod style_map;
pub mod styles;

use std::path::Path;

use docxmill_ooxml::paths::{join_path, rels_path_for, split_path};
use docxmill_ooxml::{ContentTypes, OoxmlArchive, Relationships, XmlElement};
use tracing::{debug, info};

pub use body::{BodyReader, PartContext};
pub use numbering::Numbering;
pub use style_map::{
    read_style_map, write_style_map, STYLE_MAP_CONTENT_TYPE, STYLE_MAP_PATH,
    STYLE_MAP_RELATIONSHIP_TYPE,
};
pub use styles::Styles;

use crate::document::{Document, NoteType};
use crate::error::{ConvertError, Result};
use crate::results::{ConversionResult, Message};

const RELATIONSHIP_TYPE_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";

/// Locations of the parts the reader cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPaths {
    pub main_document: String,
    pub comments: String,
    pub endnotes: String,
    pub footnotes: String,
    pub numbering: String,
    pub styles: String,
}

/// A DOCX package opened for conversion
#[derive(Debug, Clone)]
pub struct DocxFile {
    archive: OoxmlArchive,
}

impl DocxFile {
    /// Open a DOCX file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_archive(OoxmlArchive::open(path)?))
    }

    /// Open a DOCX held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_archive(OoxmlArchive::from_bytes(bytes)?))
    }

    pub fn from_archive(archive: OoxmlArchive) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> &OoxmlArchive {
        &self.archive
    }

    pub fn into_archive(self) -> OoxmlArchive {
        self.archive
    }

    /// Resolve part locations through the package and document relationships
    pub fn part_paths(&self) -> Result<PartPaths> {
        let package_relationships = Relationships::parse_optional(self.archive.get("_rels/.rels"))?;
        let main_document = self.find_part_path(
            &package_relationships,
            Relationships::TYPE_OFFICE_DOCUMENT,
            "",
            "word/document.xml",
        );
        if !self.archive.contains(&main_document) {
            return Err(ConvertError::InvalidDocument(
                "Could not find main document part. Are you sure this is a valid .docx file?"
                    .to_string(),
            ));
        }

        let document_relationships =
            Relationships::parse_optional(self.archive.get(&rels_path_for(&main_document)))?;
        let base_path = split_path(&main_document).dirname.to_string();
        let related = |name: &str| {
            self.find_part_path(
                &document_relationships,
                &format!("{}{}", RELATIONSHIP_TYPE_BASE, name),
                &base_path,
                &format!("word/{}.xml", name),
            )
        };

        Ok(PartPaths {
            comments: related("comments"),
            endnotes: related("endnotes"),
            footnotes: related("footnotes"),
            numbering: related("numbering"),
            styles: related("styles"),
            main_document,
        })
    }

    fn find_part_path(
        &self,
        relationships: &Relationships,
        relationship_type: &str,
        base_path: &str,
        fallback_path: &str,
    ) -> String {
        relationships
            .targets_of_type(relationship_type)
            .map(|target| {
                let joined = join_path(&[base_path, target]);
                joined.trim_start_matches('/').to_string()
            })
            .find(|path| self.archive.contains(path))
            .unwrap_or_else(|| fallback_path.to_string())
    }

    /// Read the whole document: body, notes and comments
    ///
    /// Messages are ordered footnotes, endnotes, comments, then body.
    pub fn read(&self) -> Result<ConversionResult<Document>> {
        let paths = self.part_paths()?;
        debug!(?paths, "resolved document parts");

        let content_types = match self.archive.get_xml(docxmill_ooxml::CONTENT_TYPES_PATH)? {
            Some(root) => ContentTypes::from_element(root),
            None => ContentTypes::from_element(XmlElement::new("Types")),
        };
        let styles = match self.archive.get_xml(&paths.styles)? {
            Some(root) => Styles::read(&root),
            None => Styles::default(),
        };
        let numbering = match self.archive.get_xml(&paths.numbering)? {
            Some(root) => Numbering::read(&root, &styles),
            None => Numbering::default(),
        };
        let context = PartContext {
            archive: &self.archive,
            content_types: &content_types,
            styles: &styles,
            numbering: &numbering,
        };

        let mut messages: Vec<Message> = Vec::new();
        let mut notes = Vec::new();
        for (path, note_type) in [
            (&paths.footnotes, NoteType::Footnote),
            (&paths.endnotes, NoteType::Endnote),
        ] {
            if let Some(root) = self.archive.get_xml(path)? {
                let relationships = self.part_relationships(path)?;
                let mut reader = BodyReader::new(context, &relationships, split_path(path).dirname);
                notes.extend(notes::read_notes(&root, note_type, &mut reader));
                messages.extend(reader.take_messages());
            }
        }

        let mut comments = Vec::new();
        if let Some(root) = self.archive.get_xml(&paths.comments)? {
            let relationships = self.part_relationships(&paths.comments)?;
            let mut reader =
                BodyReader::new(context, &relationships, split_path(&paths.comments).dirname);
            comments = comments::read_comments(&root, &mut reader);
            messages.extend(reader.take_messages());
        }

        let root = self.archive.require_xml(&paths.main_document)?;
        let body = root.first("w:body").ok_or_else(|| {
            ConvertError::InvalidDocument(
                "Could not find the body element: are you sure this is a docx file?".to_string(),
            )
        })?;
        let relationships = self.part_relationships(&paths.main_document)?;
        let mut reader = BodyReader::new(
            context,
            &relationships,
            split_path(&paths.main_document).dirname,
        );
        let children = reader.read_elements(&body.children);
        messages.extend(reader.take_messages());

        info!(
            blocks = children.len(),
            notes = notes.len(),
            comments = comments.len(),
            warnings = messages.len(),
            "read document"
        );
        Ok(ConversionResult::new(
            Document {
                children,
                notes,
                comments,
            },
            messages,
        ))
    }

    fn part_relationships(&self, part: &str) -> Result<Relationships> {
        Ok(Relationships::parse_optional(
            self.archive.get(&rels_path_for(part)),
        )?)
    }

    /// The style map stored in the package, if any
    pub fn embedded_style_map(&self) -> Option<String> {
        read_style_map(&self.archive)
    }

    /// Store a style map in the package
    pub fn embed_style_map(&mut self, style_map: &str) -> Result<()> {
        let main_document = self.part_paths()?.main_document;
        write_style_map(&mut self.archive, &main_document, style_map)
    }

    /// Zip the package back into bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.archive.to_bytes()?)
    }
}
