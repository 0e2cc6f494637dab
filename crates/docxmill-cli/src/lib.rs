//! docxmill CLI library
//!
//! Commands:
//! - convert: DOCX to HTML or Markdown
//! - raw-text: plain text of a DOCX
//! - embed-style-map: store a style map inside a DOCX
//! - report: fill a DOCX template with JSON data
//! - commands: list the commands of a template
//! - metadata: document properties as JSON
//!
//! # Library Usage
//!
//! ```ignore
//! use docxmill_cli::{convert_command, OutputFormat};
//!
//! convert_command(&input, OutputFormat::Html, None, Some(&output), None, true)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! docxmill convert report.docx --output-dir out/
//! docxmill report invoice.docx --data invoice.json --output invoice-filled.docx
//! docxmill commands invoice.docx --delimiter '{' --close-delimiter '}'
//! ```

pub mod app;

pub use app::{
    commands_command, convert_command, default_report_path, embed_style_map_command,
    metadata_command, metadata_json, raw_text_command, report_command,
};
pub use app::{run_cli, OutputFormat};
