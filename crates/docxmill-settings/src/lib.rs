//! # docxmill-settings
//!
//! A flat JSON settings object validated against a declarative schema,
//! cached in memory and persisted to disk.
//!
//! ```no_run
//! use docxmill_settings::{FieldRule, Schema, SettingsStore, StoreOptions};
//! use serde_json::json;
//!
//! let schema = Schema::new([
//!     ("size", FieldRule::number(25).with_min(10.0).with_max(40.0)),
//!     ("theme", FieldRule::string("light").with_values(["light", "dark"])),
//! ])?;
//! let store = SettingsStore::open(schema, StoreOptions::new("/tmp/docxmill"))?;
//!
//! let result = store.set("size", json!(50))?;
//! assert_eq!(result.errors, ["Default setting was applied"]);
//! store.write()?;
//! # Ok::<(), docxmill_settings::SettingsError>(())
//! ```
//!
//! Other parts of an application talk to the store through the typed
//! [`channel`] protocol, usually via a [`SettingsClient`].

pub mod channel;
pub mod client;
pub mod error;
pub mod options;
pub mod schema;
pub mod store;

pub use channel::{Request, Response};
pub use client::{LocalTransport, SettingsClient, Transport};
pub use error::{Result, SettingsError};
pub use options::StoreOptions;
pub use schema::{FieldError, FieldRule, FieldType, Schema};
pub use store::{OperationResult, Settings, SettingsStore, StoreState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
