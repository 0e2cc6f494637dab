//! # docxmill-convert
//!
//! Converts DOCX documents to HTML or Markdown. Word styles are mapped to
//! HTML through a small style-map language:
//!
//! ```text
//! p[style-name='Section Title'] => h1:fresh
//! p[style-name='Subsection Title'] => h2:fresh
//! r.Code => code
//! ```
//!
//! Custom mappings take precedence over a map embedded in the document,
//! which takes precedence over the built-in defaults.
//!
//! ## Example
//!
//! ```no_run
//! use docxmill_convert::{convert_to_html, ConvertOptions};
//!
//! let bytes = std::fs::read("report.docx")?;
//! let result = convert_to_html(&bytes, &ConvertOptions::default())?;
//! for message in &result.messages {
//!     eprintln!("{}", message);
//! }
//! println!("{}", result.value);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod convert;
pub mod document;
pub mod docx;
pub mod error;
pub mod html;
pub mod images;
pub mod options;
pub mod raw_text;
pub mod results;
pub mod styles;
pub mod transforms;
pub mod writers;

use tracing::info;

pub use convert::{convert_document, DocumentConverter};
pub use document::{Document, Element, ElementType};
pub use docx::DocxFile;
pub use error::{ConvertError, Result};
pub use images::{data_uri, img_element, ImageConverter};
pub use options::{ConvertOptions, OutputFormat, DEFAULT_STYLE_MAP};
pub use results::{ConversionResult, Message, MessageType};
pub use styles::{parse_style_map, read_style, StyleMapping};
pub use transforms::{descendants_of_type, transform_paragraphs, transform_runs};

/// Convert a DOCX to HTML
pub fn convert_to_html(docx: &[u8], options: &ConvertOptions) -> Result<ConversionResult<String>> {
    let options = options.clone().with_output_format(OutputFormat::Html);
    convert(docx, &options)
}

/// Convert a DOCX to Markdown
pub fn convert_to_markdown(docx: &[u8], options: &ConvertOptions) -> Result<ConversionResult<String>> {
    let options = options.clone().with_output_format(OutputFormat::Markdown);
    convert(docx, &options)
}

/// Convert a DOCX in the format chosen by `options.output_format`
///
/// Messages are ordered: document reading, style map parsing, conversion.
pub fn convert(docx: &[u8], options: &ConvertOptions) -> Result<ConversionResult<String>> {
    let file = DocxFile::from_bytes(docx)?;
    convert_docx_file(&file, options)
}

/// Convert an already opened package
pub fn convert_docx_file(file: &DocxFile, options: &ConvertOptions) -> Result<ConversionResult<String>> {
    let embedded = if options.include_embedded_style_map {
        file.embedded_style_map()
    } else {
        None
    };
    let mut document = file.read()?;
    if let Some(transform) = &options.transform_document {
        document = document.map(|d| transform(d));
    }

    let style_map = parse_style_map(&options.style_map_lines(embedded.as_deref()));
    info!(
        rules = style_map.value.len(),
        format = %options.output_format,
        "converting document"
    );

    Ok(document.flat_map(|document| {
        style_map.flat_map(|style_map| convert_document(&document, &style_map, options))
    }))
}

/// Text of the document without formatting; paragraphs end with a blank line
pub fn extract_raw_text(docx: &[u8]) -> Result<ConversionResult<String>> {
    let document = DocxFile::from_bytes(docx)?.read()?;
    Ok(document.map(|document| raw_text::document_to_raw_text(&document)))
}

/// Return a copy of the package with `style_map` embedded
pub fn embed_style_map(docx: &[u8], style_map: &str) -> Result<Vec<u8>> {
    let mut file = DocxFile::from_bytes(docx)?;
    file.embed_style_map(style_map)?;
    file.to_bytes()
}

/// The style map embedded in a package, if any
pub fn read_embedded_style_map(docx: &[u8]) -> Result<Option<String>> {
    Ok(DocxFile::from_bytes(docx)?.embedded_style_map())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
