//! Conversion options

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::images::ImageConverter;
use crate::styles::read_style_map_lines;

/// Rewrites the document between reading and conversion
pub type DocumentTransform = Arc<dyn Fn(Document) -> Document + Send + Sync>;

/// Rules applied after custom and embedded mappings unless disabled
pub const DEFAULT_STYLE_MAP: &[&str] = &[
    "p.Heading1 => h1:fresh",
    "p.Heading2 => h2:fresh",
    "p.Heading3 => h3:fresh",
    "p.Heading4 => h4:fresh",
    "p.Heading5 => h5:fresh",
    "p.Heading6 => h6:fresh",
    "p[style-name='Heading 1'] => h1:fresh",
    "p[style-name='Heading 2'] => h2:fresh",
    "p[style-name='Heading 3'] => h3:fresh",
    "p[style-name='Heading 4'] => h4:fresh",
    "p[style-name='Heading 5'] => h5:fresh",
    "p[style-name='Heading 6'] => h6:fresh",
    "p[style-name='heading 1'] => h1:fresh",
    "p[style-name='heading 2'] => h2:fresh",
    "p[style-name='heading 3'] => h3:fresh",
    "p[style-name='heading 4'] => h4:fresh",
    "p[style-name='heading 5'] => h5:fresh",
    "p[style-name='heading 6'] => h6:fresh",
    "r[style-name='Strong'] => strong",
    "p[style-name='footnote text'] => p:fresh",
    "r[style-name='footnote reference'] =>",
    "p[style-name='endnote text'] => p:fresh",
    "r[style-name='endnote reference'] =>",
    "p[style-name='annotation text'] => p:fresh",
    "r[style-name='annotation reference'] =>",
    // LibreOffice
    "p[style-name='Footnote'] => p:fresh",
    "r[style-name='Footnote anchor'] =>",
    "p[style-name='Endnote'] => p:fresh",
    "r[style-name='Endnote anchor'] =>",
    "p:unordered-list(1) => ul > li:fresh",
    "p:unordered-list(2) => ul|ol > li > ul > li:fresh",
    "p:unordered-list(3) => ul|ol > li > ul|ol > li > ul > li:fresh",
    "p:unordered-list(4) => ul|ol > li > ul|ol > li > ul|ol > li > ul > li:fresh",
    "p:unordered-list(5) => ul|ol > li > ul|ol > li > ul|ol > li > ul|ol > li > ul > li:fresh",
    "p:ordered-list(1) => ol > li:fresh",
    "p:ordered-list(2) => ul|ol > li > ol > li:fresh",
    "p:ordered-list(3) => ul|ol > li > ul|ol > li > ol > li:fresh",
    "p:ordered-list(4) => ul|ol > li > ul|ol > li > ul|ol > li > ol > li:fresh",
    "p:ordered-list(5) => ul|ol > li > ul|ol > li > ul|ol > li > ul|ol > li > ol > li:fresh",
    "r[style-name='Hyperlink'] =>",
    "p[style-name='Normal'] => p:fresh",
];

/// Output format of a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Html => f.write_str("html"),
            OutputFormat::Markdown => f.write_str("markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Options for [`convert`](crate::convert)
#[derive(Clone)]
pub struct ConvertOptions {
    /// Custom style mappings, highest precedence
    pub style_map: Vec<String>,
    pub include_default_style_map: bool,
    pub include_embedded_style_map: bool,
    pub ignore_empty_paragraphs: bool,
    /// Prepended to every generated id
    pub id_prefix: String,
    pub output_format: OutputFormat,
    pub pretty_print: bool,
    /// Defaults to embedding images as data URIs
    pub convert_image: Option<ImageConverter>,
    pub transform_document: Option<DocumentTransform>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            style_map: Vec::new(),
            include_default_style_map: true,
            include_embedded_style_map: true,
            ignore_empty_paragraphs: true,
            id_prefix: String::new(),
            output_format: OutputFormat::Html,
            pretty_print: false,
            convert_image: None,
            transform_document: None,
        }
    }
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("style_map", &self.style_map)
            .field("include_default_style_map", &self.include_default_style_map)
            .field("include_embedded_style_map", &self.include_embedded_style_map)
            .field("ignore_empty_paragraphs", &self.ignore_empty_paragraphs)
            .field("id_prefix", &self.id_prefix)
            .field("output_format", &self.output_format)
            .field("pretty_print", &self.pretty_print)
            .field("convert_image", &self.convert_image.is_some())
            .field("transform_document", &self.transform_document.is_some())
            .finish()
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: style mappings given as style-map text (one rule per line)
    pub fn with_style_map(mut self, style_map: &str) -> Self {
        self.style_map = read_style_map_lines(style_map);
        self
    }

    /// Builder: style mappings given as separate rules
    pub fn with_style_map_lines<S: Into<String>>(mut self, lines: impl IntoIterator<Item = S>) -> Self {
        self.style_map = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_style_map(mut self, include: bool) -> Self {
        self.include_default_style_map = include;
        self
    }

    pub fn with_embedded_style_map(mut self, include: bool) -> Self {
        self.include_embedded_style_map = include;
        self
    }

    pub fn with_ignore_empty_paragraphs(mut self, ignore: bool) -> Self {
        self.ignore_empty_paragraphs = ignore;
        self
    }

    pub fn with_id_prefix(mut self, id_prefix: impl Into<String>) -> Self {
        self.id_prefix = id_prefix.into();
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    pub fn with_image_converter(mut self, converter: ImageConverter) -> Self {
        self.convert_image = Some(converter);
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.transform_document = Some(Arc::new(transform));
        self
    }

    /// All style-map rules in precedence order: custom, embedded, default
    pub fn style_map_lines(&self, embedded: Option<&str>) -> Vec<String> {
        let mut lines = self.style_map.clone();
        if self.include_embedded_style_map {
            if let Some(embedded) = embedded {
                lines.extend(read_style_map_lines(embedded));
            }
        }
        if self.include_default_style_map {
            lines.extend(DEFAULT_STYLE_MAP.iter().map(|line| line.to_string()));
        }
        lines
    }
}
