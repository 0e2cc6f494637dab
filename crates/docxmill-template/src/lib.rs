//! # docxmill-template
//!
//! Generates DOCX reports from templates. A template is an ordinary Word
//! document whose text contains commands between delimiters (`+++` by
//! default):
//!
//! ```text
//! +++FOR person IN people+++
//! Name: +++INS person.name+++
//! +++END-FOR person+++
//! ```
//!
//! Commands are evaluated with [rhai](https://rhai.rs). Besides `INS` and
//! `FOR`, templates can use `IF`/`END-IF`, `EXEC` (run code, insert
//! nothing), `ALIAS`, `IMAGE`, `LINK`, `HTML` and a `QUERY` that is handed to
//! a data provider. The shorthands `=expr`, `!code` and `*alias` expand to
//! `INS`, `EXEC` and the aliased command.
//!
//! Headers, footers and other `word/*.xml` parts are filled with the same
//! data as the main document.
//!
//! ## Example
//!
//! ```no_run
//! use docxmill_template::{create_report, ReportOptions};
//! use serde_json::json;
//!
//! let template = std::fs::read("template.docx")?;
//! let options = ReportOptions::new(template).with_data(json!({ "name": "World" }));
//! let report = create_report(&options)?;
//! std::fs::write("report.docx", report)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod commands;
pub mod delimiters;
pub mod error;
pub mod evaluator;
pub mod inserts;
pub mod options;
pub mod preprocess;
pub mod processor;
pub mod report;

pub use commands::{CommandKind, CommandSummary, CMD_NODE};
pub use delimiters::{Delimiters, DEFAULT_DELIMITER};
pub use docxmill_ooxml::Metadata;
pub use error::{Result, TemplateError};
pub use evaluator::{is_truthy, rhai_factory, Evaluator, EvaluatorFactory, RhaiEvaluator};
pub use options::{ErrorHandler, QueryProvider, ReportData, ReportOptions, ReportOutput};
pub use report::{create_report, find_query, generate, get_metadata, list_commands};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
