//! # docxmill-ooxml
//!
//! OOXML package access for docxmill.
//!
//! This crate provides functionality to:
//! - Unpack and rewrite DOCX zip containers in memory
//! - Parse parts into a lossless XML tree and serialize them back
//! - Read and extend relationship sets and the content-type manifest
//! - Read document summary properties
//!
//! ## Example
//!
//! ```no_run
//! use docxmill_ooxml::{ContentTypes, OoxmlArchive};
//!
//! let archive = OoxmlArchive::open("report.docx")?;
//! let main = ContentTypes::read(&archive)?.main_document_part()?;
//! let document = archive.require_xml(&format!("word/{}", main))?;
//! println!("{} paragraphs", document.elements_named("w:p").len());
//! # Ok::<(), docxmill_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod content_types;
pub mod error;
pub mod metadata;
pub mod paths;
pub mod relationships;
pub mod xml;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::{OoxmlArchive, CONTENT_TYPES_PATH};
pub use content_types::ContentTypes;
pub use error::{OoxmlError, Result};
pub use metadata::{read_metadata, Metadata};
pub use relationships::Relationships;
pub use xml::{parse_xml, WriteOptions, XmlElement, XmlNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
