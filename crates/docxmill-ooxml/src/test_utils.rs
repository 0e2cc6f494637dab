//! Shared test fixtures
//!
//! DOCX packages are assembled in memory with `ZipWriter` so tests never
//! depend on binary files checked into the repository.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

use crate::archive::OoxmlArchive;

/// WordprocessingML main namespace
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
    r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006""#,
);

/// Builder for an in-memory DOCX package
///
/// # Example
/// ```ignore
/// use docxmill_ooxml::test_utils::DocxFixture;
/// let docx = DocxFixture::new()
///     .body("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocxFixture {
    body: String,
    parts: Vec<(String, Vec<u8>)>,
    document_rels: Vec<(String, String, String, Option<String>)>,
    overrides: Vec<(String, String)>,
    defaults: Vec<(String, String)>,
}

impl DocxFixture {
    /// Empty document body
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of `w:body`
    pub fn body(mut self, xml: impl Into<String>) -> Self {
        self.body = xml.into();
        self
    }

    /// Add an arbitrary part
    pub fn part(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.parts.push((path.into(), contents.into()));
        self
    }

    /// Add a part wrapped in the common namespace declarations
    ///
    /// `root` is the qualified root element name, e.g. `w:styles`.
    pub fn xml_part(self, path: &str, root: &str, inner: &str) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><{root} {NAMESPACES}>{inner}</{root}>"#
        );
        self.part(path, xml.into_bytes())
    }

    /// `word/styles.xml` with the given style definitions
    pub fn styles(self, inner: &str) -> Self {
        self.xml_part("word/styles.xml", "w:styles", inner)
            .document_rel("rIdStyles", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles", "styles.xml")
    }

    /// `word/numbering.xml` with the given numbering definitions
    pub fn numbering(self, inner: &str) -> Self {
        self.xml_part("word/numbering.xml", "w:numbering", inner)
            .document_rel("rIdNumbering", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering", "numbering.xml")
    }

    /// Add a relationship to `word/_rels/document.xml.rels`
    pub fn document_rel(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.document_rels
            .push((id.to_string(), rel_type.to_string(), target.to_string(), None));
        self
    }

    /// Add an external relationship (hyperlinks)
    pub fn external_rel(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.document_rels.push((
            id.to_string(),
            rel_type.to_string(),
            target.to_string(),
            Some("External".to_string()),
        ));
        self
    }

    /// Add a content-type override
    pub fn content_type_override(mut self, part_name: &str, content_type: &str) -> Self {
        self.overrides
            .push((part_name.to_string(), content_type.to_string()));
        self
    }

    /// Add a content-type default
    pub fn content_type_default(mut self, extension: &str, content_type: &str) -> Self {
        self.defaults
            .push((extension.to_string(), content_type.to_string()));
        self
    }

    /// Zip everything up
    pub fn build(self) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for (extension, content_type) in &self.defaults {
            types.push_str(&format!(
                r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#
            ));
        }
        types.push_str(r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
        for (part_name, content_type) in &self.overrides {
            types.push_str(&format!(
                r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#
            ));
        }
        types.push_str("</Types>");
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(types.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
        )
        .unwrap();

        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, rel_type, target, mode) in &self.document_rels {
            match mode {
                Some(mode) => rels.push_str(&format!(
                    r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}" TargetMode="{mode}"/>"#
                )),
                None => rels.push_str(&format!(
                    r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#
                )),
            }
        }
        rels.push_str("</Relationships>");
        zip.start_file("word/_rels/document.xml.rels", options)
            .unwrap();
        zip.write_all(rels.as_bytes()).unwrap();

        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NAMESPACES}><w:body>{}</w:body></w:document>"#,
                self.body
            )
            .as_bytes(),
        )
        .unwrap();

        for (path, contents) in &self.parts {
            zip.start_file(path.as_str(), options).unwrap();
            zip.write_all(contents).unwrap();
        }

        zip.finish().unwrap();
        buffer.into_inner()
    }
}

/// A document with a single paragraph of text
pub fn create_minimal_docx(text: &str) -> Vec<u8> {
    DocxFixture::new()
        .body(format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text))
        .build()
}

/// Extract document.xml content from a DOCX byte array
pub fn extract_document_xml(docx: &[u8]) -> String {
    extract_file(docx, "word/document.xml").unwrap()
}

/// Extract any file content from a DOCX byte array
pub fn extract_file(docx: &[u8], path: &str) -> Option<String> {
    let archive = OoxmlArchive::from_bytes(docx).unwrap();
    archive.get_string(path)
}
