//! Report generation options

use std::fmt;
use std::sync::Arc;

use docxmill_ooxml::xml::DEFAULT_LITERAL_XML_DELIMITER;
use rhai::Dynamic;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::delimiters::Delimiters;
use crate::error::{Result, TemplateError};
use crate::evaluator::{rhai_factory, EvaluatorFactory};

/// Substitutes a value for a command whose evaluation failed
///
/// Receives the error and the command code.
pub type ErrorHandler = Arc<dyn Fn(&TemplateError, &str) -> Dynamic + Send + Sync>;

/// Data provider called with the template's `QUERY` (if any) and the query variables
pub type QueryProvider = Arc<dyn Fn(Option<&str>, Option<&Value>) -> Result<Value> + Send + Sync>;

/// Where the report data comes from
#[derive(Clone)]
pub enum ReportData {
    /// Data known up front
    Value(Value),
    /// Data fetched with the query found in the template
    Query(QueryProvider),
}

impl Default for ReportData {
    fn default() -> Self {
        ReportData::Value(Value::Object(Map::new()))
    }
}

impl fmt::Debug for ReportData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportData::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ReportData::Query(_) => f.write_str("Query(..)"),
        }
    }
}

impl From<Value> for ReportData {
    fn from(value: Value) -> Self {
        ReportData::Value(value)
    }
}

/// What [`generate`](crate::report::generate) returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportOutput {
    /// The filled-in package
    #[default]
    Docx,
    /// Only the rewritten main document XML
    Xml,
}

/// Options for [`create_report`](crate::report::create_report)
#[derive(Clone)]
pub struct ReportOptions {
    /// The template package
    pub template: Vec<u8>,
    pub data: ReportData,
    /// Passed to a [`ReportData::Query`] provider
    pub query_vars: Option<Value>,
    pub delimiters: Delimiters,
    /// Text between pairs of this marker is written as raw XML
    pub literal_xml_delimiter: String,
    /// Turn `\n` in inserted text into line breaks
    pub process_line_breaks: bool,
    /// Extra variables visible to every command
    pub additional_context: Map<String, Value>,
    /// Stop at the first failing command
    pub fail_fast: bool,
    /// Treat commands that produce nothing as errors
    pub reject_nullish: bool,
    pub error_handler: Option<ErrorHandler>,
    /// Replace typographic quotes in commands before evaluating them
    pub fix_smart_quotes: bool,
    pub evaluator: EvaluatorFactory,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            template: Vec::new(),
            data: ReportData::default(),
            query_vars: None,
            delimiters: Delimiters::default(),
            literal_xml_delimiter: DEFAULT_LITERAL_XML_DELIMITER.to_string(),
            process_line_breaks: true,
            additional_context: Map::new(),
            fail_fast: true,
            reject_nullish: false,
            error_handler: None,
            fix_smart_quotes: false,
            evaluator: rhai_factory(),
        }
    }
}

impl fmt::Debug for ReportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportOptions")
            .field("template", &format_args!("{} bytes", self.template.len()))
            .field("data", &self.data)
            .field("query_vars", &self.query_vars)
            .field("delimiters", &self.delimiters)
            .field("literal_xml_delimiter", &self.literal_xml_delimiter)
            .field("process_line_breaks", &self.process_line_breaks)
            .field("additional_context", &self.additional_context)
            .field("fail_fast", &self.fail_fast)
            .field("reject_nullish", &self.reject_nullish)
            .field("error_handler", &self.error_handler.is_some())
            .field("fix_smart_quotes", &self.fix_smart_quotes)
            .finish_non_exhaustive()
    }
}

impl ReportOptions {
    /// Options for a template with the default settings
    pub fn new(template: impl Into<Vec<u8>>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<ReportData>) -> Self {
        self.data = data.into();
        self
    }

    /// Fetch the data with the template's `QUERY` command
    pub fn with_query<F>(mut self, provider: F) -> Self
    where
        F: Fn(Option<&str>, Option<&Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.data = ReportData::Query(Arc::new(provider));
        self
    }

    pub fn with_query_vars(mut self, vars: Value) -> Self {
        self.query_vars = Some(vars);
        self
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_literal_xml_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.literal_xml_delimiter = delimiter.into();
        self
    }

    pub fn with_process_line_breaks(mut self, enabled: bool) -> Self {
        self.process_line_breaks = enabled;
        self
    }

    /// Add a variable visible to every command
    pub fn with_context(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| TemplateError::InvalidOptions(e.to_string()))?;
        self.additional_context.insert(name.into(), value);
        Ok(self)
    }

    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn with_reject_nullish(mut self, enabled: bool) -> Self {
        self.reject_nullish = enabled;
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TemplateError, &str) -> Dynamic + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_fix_smart_quotes(mut self, enabled: bool) -> Self {
        self.fix_smart_quotes = enabled;
        self
    }

    /// Use a different expression evaluator
    pub fn with_evaluator(mut self, factory: EvaluatorFactory) -> Self {
        self.evaluator = factory;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.delimiters.validate()?;
        if self.literal_xml_delimiter.is_empty() {
            return Err(TemplateError::InvalidOptions(
                "the literal XML delimiter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ReportOptions::new(vec![1, 2, 3]);
        assert!(options.fail_fast);
        assert!(options.process_line_breaks);
        assert!(!options.reject_nullish);
        assert_eq!(options.literal_xml_delimiter, "||");
        assert_eq!(options.delimiters, Delimiters::default());
        assert!(format!("{:?}", options).contains("3 bytes"));
    }

    #[test]
    fn test_context_and_validation() {
        let options = ReportOptions::default()
            .with_context("year", 2024)
            .unwrap()
            .with_literal_xml_delimiter("");
        assert_eq!(options.additional_context["year"], json!(2024));
        assert!(options.validate().is_err());
    }
}
