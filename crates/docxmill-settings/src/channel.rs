//! Request/response protocol between a store and its clients
//!
//! Each request travels on a named channel. The names are stable strings so
//! that a transport crossing a process boundary can route them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{OperationResult, Settings, SettingsStore};

pub const GET_ALL: &str = "settings:get-all";
pub const GET_DEFAULTS: &str = "settings:get-defaults";
pub const GET_ALL_AND_DEFAULTS: &str = "settings:get-all-and-defaults";
pub const VALIDATE: &str = "settings:validate";
pub const SET: &str = "settings:set";
pub const SET_MANY: &str = "settings:set-many";
pub const SET_ALL: &str = "settings:set-all";
pub const SET_AND_WRITE: &str = "settings:set-and-write";
pub const WRITE: &str = "settings:write";
pub const UNSET: &str = "settings:unset";
pub const RESET: &str = "settings:reset";
pub const RESET_AND_WRITE: &str = "settings:reset-and-write";
pub const DISABLE_FILE_WATCHER: &str = "settings:disable-file-watcher";
/// Broadcast carrying the full settings after a change
pub const UPDATE: &str = "settings:update";

/// A request to the store, tagged by its channel name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload")]
pub enum Request {
    #[serde(rename = "settings:get-all")]
    GetAll,
    #[serde(rename = "settings:get-defaults")]
    GetDefaults,
    #[serde(rename = "settings:get-all-and-defaults")]
    GetAllAndDefaults,
    #[serde(rename = "settings:validate")]
    Validate { key: String, value: Value },
    #[serde(rename = "settings:set")]
    Set { key: String, value: Value },
    #[serde(rename = "settings:set-many")]
    SetMany { values: Settings },
    #[serde(rename = "settings:set-all")]
    SetAll { settings: Settings },
    #[serde(rename = "settings:set-and-write")]
    SetAndWrite { key: String, value: Value },
    #[serde(rename = "settings:write")]
    Write,
    #[serde(rename = "settings:unset")]
    Unset { key: String },
    #[serde(rename = "settings:reset")]
    Reset,
    #[serde(rename = "settings:reset-and-write")]
    ResetAndWrite,
    #[serde(rename = "settings:disable-file-watcher")]
    DisableFileWatcher,
}

impl Request {
    /// Channel name the request travels on
    pub fn channel(&self) -> &'static str {
        match self {
            Request::GetAll => GET_ALL,
            Request::GetDefaults => GET_DEFAULTS,
            Request::GetAllAndDefaults => GET_ALL_AND_DEFAULTS,
            Request::Validate { .. } => VALIDATE,
            Request::Set { .. } => SET,
            Request::SetMany { .. } => SET_MANY,
            Request::SetAll { .. } => SET_ALL,
            Request::SetAndWrite { .. } => SET_AND_WRITE,
            Request::Write => WRITE,
            Request::Unset { .. } => UNSET,
            Request::Reset => RESET,
            Request::ResetAndWrite => RESET_AND_WRITE,
            Request::DisableFileWatcher => DISABLE_FILE_WATCHER,
        }
    }
}

/// The store's answer to a [`Request`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Response {
    Settings(Settings),
    AllAndDefaults { settings: Settings, defaults: Settings },
    Operation(OperationResult),
    Done,
    Removed(bool),
    WatcherDisabled(bool),
    Error { message: String },
}

impl SettingsStore {
    /// Answer a request; failures become [`Response::Error`]
    pub fn handle(&self, request: Request) -> Response {
        debug!(channel = request.channel(), "settings request");
        let response = match request {
            Request::GetAll => self.get_all().map(Response::Settings),
            Request::GetDefaults => Ok(Response::Settings(self.defaults())),
            Request::GetAllAndDefaults => self.get_all().map(|settings| Response::AllAndDefaults {
                settings,
                defaults: self.defaults(),
            }),
            Request::Validate { key, value } => self.validate(&key, &value).map(Response::Operation),
            Request::Set { key, value } => self.set(&key, value).map(Response::Operation),
            Request::SetMany { values } => self.set_many(values).map(Response::Operation),
            Request::SetAll { settings } => self.set_all(settings).map(|()| Response::Done),
            Request::SetAndWrite { key, value } => {
                self.set_and_write(&key, value).map(Response::Operation)
            }
            Request::Write => self.write().map(|()| Response::Done),
            Request::Unset { key } => self.unset(&key).map(Response::Removed),
            Request::Reset => {
                self.reset();
                Ok(Response::Done)
            }
            Request::ResetAndWrite => self.reset_and_write().map(|()| Response::Done),
            Request::DisableFileWatcher => Ok(Response::WatcherDisabled(self.disable_file_watcher())),
        };
        response.unwrap_or_else(|err| Response::Error {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_is_tagged_with_channel() {
        let request = Request::Set {
            key: "size".to_string(),
            value: json!(12),
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["channel"], json!(SET));
        assert_eq!(encoded["payload"], json!({"key": "size", "value": 12}));
        assert_eq!(serde_json::from_value::<Request>(encoded).unwrap(), request);

        let encoded = serde_json::to_value(Request::Write).unwrap();
        assert_eq!(encoded["channel"], json!(Request::Write.channel()));
    }

    #[test]
    fn test_response_encoding() {
        let encoded = serde_json::to_value(Response::Removed(true)).unwrap();
        assert_eq!(encoded, json!({"kind": "removed", "value": true}));
        let encoded = serde_json::to_value(Response::Done).unwrap();
        assert_eq!(encoded, json!({"kind": "done"}));
    }
}
