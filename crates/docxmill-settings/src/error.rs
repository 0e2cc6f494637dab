//! Error types for the settings store

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the settings store and its clients
#[derive(Error, Debug)]
pub enum SettingsError {
    /// An accessor was called before `init` completed
    #[error("Init the store first (method init) and wait until it has completed")]
    NotInitialized,

    /// Empty key name
    #[error("Enter a valid key name")]
    InvalidKey,

    /// The schema cannot be used
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Store options that cannot be used
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Settings rejected by the schema
    #[error("{0}")]
    Validation(String),

    /// The settings file exists but cannot be written
    #[error("No read or write permissions '{}'. Make sure the file isn't locked and that you have the right writing permissions.", .0.display())]
    Permission(PathBuf),

    /// The settings directory could not be created
    #[error("Cannot create folder '{}'. Make sure that you have the right writing permissions.", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse options: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A request could not be delivered or answered
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_message_names_the_file() {
        let err = SettingsError::Permission(PathBuf::from("/tmp/config.json"));
        assert!(err.to_string().starts_with("No read or write permissions '/tmp/config.json'"));
    }
}
