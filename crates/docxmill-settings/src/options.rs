//! Store options

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};

/// How and where the settings file is kept
///
/// Options can be read from a TOML table:
///
/// ```toml
/// dir = "/home/me/.config/docxmill"
/// file_name = "settings"
/// watch_file = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Directory of the settings file
    pub dir: PathBuf,
    pub file_name: String,
    pub file_extension: String,
    /// Indent the file with four spaces
    pub pretty_print: bool,
    /// Check the file against the schema when it is loaded
    pub validate_file: bool,
    /// Check values passed to `set`
    pub validate: bool,
    /// Replace invalid values with their defaults instead of failing
    pub default_on_fail_validation: bool,
    /// Reload the file when it changes on disk
    pub watch_file: bool,
    /// Write the settings when the store is dropped
    pub write_before_quit: bool,
    /// File events this long after an internal write are ignored
    pub watch_guard_ms: u64,
    /// Delay between a file event and reloading the file
    pub watch_debounce_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            file_name: "config".to_string(),
            file_extension: "json".to_string(),
            pretty_print: true,
            validate_file: true,
            validate: true,
            default_on_fail_validation: true,
            watch_file: false,
            write_before_quit: false,
            watch_guard_ms: 10_000,
            watch_debounce_ms: 1_000,
        }
    }
}

impl StoreOptions {
    /// Options for a settings file in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Parse options from TOML
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    pub fn with_pretty_print(mut self, enabled: bool) -> Self {
        self.pretty_print = enabled;
        self
    }

    pub fn with_validate_file(mut self, enabled: bool) -> Self {
        self.validate_file = enabled;
        self
    }

    pub fn with_validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    pub fn with_default_on_fail_validation(mut self, enabled: bool) -> Self {
        self.default_on_fail_validation = enabled;
        self
    }

    pub fn with_watch_file(mut self, enabled: bool) -> Self {
        self.watch_file = enabled;
        self
    }

    pub fn with_write_before_quit(mut self, enabled: bool) -> Self {
        self.write_before_quit = enabled;
        self
    }

    pub fn with_watch_guard(mut self, guard: Duration) -> Self {
        self.watch_guard_ms = guard.as_millis() as u64;
        self
    }

    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn watch_guard(&self) -> Duration {
        Duration::from_millis(self.watch_guard_ms)
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    /// Full path of the settings file
    pub fn file_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.file_name, self.file_extension))
    }

    pub(crate) fn validate_options(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(SettingsError::InvalidOptions(
                "a settings directory is required".to_string(),
            ));
        }
        if self.file_name.is_empty() {
            return Err(SettingsError::InvalidOptions("the file name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = StoreOptions::new("/tmp/app");
        assert_eq!(options.file_path(), PathBuf::from("/tmp/app/config.json"));
        assert!(options.validate_file);
        assert!(!options.watch_file);
        assert_eq!(options.watch_guard(), Duration::from_secs(10));
        assert_eq!(options.watch_debounce(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_toml() {
        let options = StoreOptions::from_toml_str(
            r#"
dir = "/etc/docxmill"
file_name = "settings"
watch_file = true
watch_debounce_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(options.file_path(), PathBuf::from("/etc/docxmill/settings.json"));
        assert!(options.watch_file);
        assert_eq!(options.watch_debounce(), Duration::from_millis(250));
        assert!(options.pretty_print);
    }

    #[test]
    fn test_directory_is_required() {
        assert!(StoreOptions::default().validate_options().is_err());
        assert!(StoreOptions::new("x").validate_options().is_ok());
    }
}
