//! Error types for report generation

use thiserror::Error;

/// Errors raised while parsing or filling a template
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The package could not be read or written
    #[error(transparent)]
    Ooxml(#[from] docxmill_ooxml::OoxmlError),

    /// A required part is missing or malformed
    #[error("{0}")]
    Parse(String),

    /// Report options that cannot be used
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A command that could not be understood
    #[error("{message}: {command}")]
    InvalidCommand { message: String, command: String },

    /// The expression evaluator rejected or failed on the code
    #[error("{0}")]
    Evaluation(String),

    /// Evaluating a command failed
    #[error("Error executing command '{command}': {message}")]
    CommandExecution { command: String, message: String },

    /// An INS command produced a map
    #[error("Result of command '{command}' is an object")]
    ObjectCommandResult { command: String },

    /// An INS command produced nothing while nullish results are rejected
    #[error("Result of command '{command}' is null or undefined and reject_nullish is set")]
    NullishCommandResult { command: String },

    /// A FOR without its END-FOR
    #[error("Unterminated FOR-loop ('FOR {0}')")]
    UnterminatedLoop(String),

    /// An IF without its END-IF
    #[error("Incomplete IF/END-IF statement. Make sure each IF-statement has a corresponding END-IF command.")]
    IncompleteConditional,

    /// IMAGE, LINK or HTML received a value of the wrong shape
    #[error("Invalid {kind} value for command '{command}': {message}")]
    InvalidInsertion {
        kind: &'static str,
        command: String,
        message: String,
    },

    /// The data provider failed
    #[error("Data query failed: {0}")]
    Query(String),

    /// Several command errors collected with `fail_fast` off
    #[error("{} errors occurred while processing the template:\n{}", .0.len(), format_errors(.0))]
    Multiple(Vec<TemplateError>),
}

fn format_errors(errors: &[TemplateError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl TemplateError {
    pub(crate) fn invalid_command(message: impl Into<String>, command: impl Into<String>) -> Self {
        TemplateError::InvalidCommand {
            message: message.into(),
            command: command.into(),
        }
    }

    /// The individual errors, flattening [`TemplateError::Multiple`]
    pub fn errors(&self) -> Vec<&TemplateError> {
        match self {
            TemplateError::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
