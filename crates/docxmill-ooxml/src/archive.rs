//! Archive handling for DOCX files
//!
//! DOCX files are ZIP archives containing XML parts and binary resources.
//! The whole package is unpacked into memory so parts can be read and
//! rewritten in any order before the archive is zipped again.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{OoxmlError, Result};
use crate::xml::{parse_xml_bytes, WriteOptions, XmlElement};

/// Path of the package content-type manifest
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Represents an unpacked OOXML package
#[derive(Debug, Clone, Default)]
pub struct OoxmlArchive {
    /// All files in the archive, keyed by path
    files: HashMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and unpack a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Unpack a DOCX held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        debug!(entries = files.len(), "unpacked archive");
        Ok(Self { files })
    }

    /// Get a file's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a file's contents as a string
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(strip_bom(bytes)).into_owned())
    }

    /// Get a file's contents as a string, failing if it is absent
    pub fn require_string(&self, path: &str) -> Result<String> {
        self.get_string(path)
            .ok_or_else(|| OoxmlError::MissingFile(path.to_string()))
    }

    /// Parse an XML part, `None` if the part does not exist
    pub fn get_xml(&self, path: &str) -> Result<Option<XmlElement>> {
        match self.files.get(path) {
            Some(bytes) => Ok(Some(parse_xml_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    /// Parse an XML part that must be present
    pub fn require_xml(&self, path: &str) -> Result<XmlElement> {
        self.get_xml(path)?
            .ok_or_else(|| OoxmlError::MissingFile(path.to_string()))
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// List all files in the archive, sorted by path
    pub fn file_list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Set or update a file's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Set a file's contents from a string
    pub fn set_string(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    /// Serialize an XML tree into a part
    pub fn set_xml(&mut self, path: impl Into<String>, root: &XmlElement, options: &WriteOptions) {
        self.set_string(path, root.to_xml(options));
    }

    /// Remove a file from the archive
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Zip the archive into a byte buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        // Sort keys for deterministic output
        for path in self.file_list() {
            let contents = &self.files[path];
            zip.start_file(path, options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
