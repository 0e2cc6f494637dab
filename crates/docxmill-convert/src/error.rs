//! Error types for document conversion

use thiserror::Error;

/// Errors that stop a conversion
///
/// Anything recoverable (unknown styles, unsupported elements, style
/// mappings that could not be parsed) is reported as a [`Message`] instead.
///
/// [`Message`]: crate::results::Message
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The package could not be read or written
    #[error(transparent)]
    Ooxml(#[from] docxmill_ooxml::OoxmlError),

    /// The package is not a usable DOCX document
    #[error("{0}")]
    InvalidDocument(String),

    /// A caller-supplied image converter failed
    #[error("Image conversion failed: {0}")]
    Image(String),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
