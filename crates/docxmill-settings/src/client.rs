//! Client side of the settings channel
//!
//! A [`SettingsClient`] pulls the settings and defaults once, then keeps its
//! copy fresh from the store's update broadcasts. Mutations are forwarded to
//! the store through a [`Transport`].

use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::channel::{Request, Response};
use crate::error::{Result, SettingsError};
use crate::store::{OperationResult, Settings, SettingsStore};

/// Carries requests to a store and its update broadcasts back
pub trait Transport: Send + Sync {
    fn invoke(&self, request: Request) -> Result<Response>;

    /// Updates published on the `settings:update` channel
    fn subscribe(&self) -> Result<Receiver<Settings>>;
}

/// Transport to a store in the same process
#[derive(Debug, Clone)]
pub struct LocalTransport {
    store: SettingsStore,
}

impl LocalTransport {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }
}

impl Transport for LocalTransport {
    fn invoke(&self, request: Request) -> Result<Response> {
        Ok(self.store.handle(request))
    }

    fn subscribe(&self) -> Result<Receiver<Settings>> {
        Ok(self.store.subscribe())
    }
}

#[derive(Default)]
struct ClientState {
    initialized: bool,
    settings: Settings,
    defaults: Settings,
    updates: Option<Receiver<Settings>>,
}

impl ClientState {
    /// Apply pending broadcasts; true when something arrived
    fn refresh(&mut self) -> bool {
        let Some(updates) = &self.updates else {
            return false;
        };
        let latest = updates.try_iter().last();
        match latest {
            Some(settings) => {
                self.settings = settings;
                true
            }
            None => false,
        }
    }
}

/// A cached view of a remote store
pub struct SettingsClient<T: Transport = LocalTransport> {
    transport: T,
    state: Mutex<ClientState>,
}

impl<T: Transport> SettingsClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(ClientState::default()),
        }
    }

    /// Fetch settings and defaults and start listening for updates
    pub fn init(&self) -> Result<()> {
        // Listen before fetching so no change between the two is missed
        let updates = self.transport.subscribe()?;
        let (settings, defaults) = match self.transport.invoke(Request::GetAllAndDefaults)? {
            Response::AllAndDefaults { settings, defaults } => (settings, defaults),
            Response::Error { message } => return Err(SettingsError::Transport(message)),
            _ => return Err(SettingsError::Transport("Invalid settings received".to_string())),
        };

        let mut state = self.state();
        state.settings = settings;
        state.defaults = defaults;
        state.updates = Some(updates);
        state.initialized = true;
        // Broadcasts queued while fetching carry the same or newer settings
        state.refresh();
        debug!(keys = state.settings.len(), "settings client initialized");
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ready(&self, key: Option<&str>) -> Result<MutexGuard<'_, ClientState>> {
        let mut state = self.state();
        if !state.initialized {
            return Err(SettingsError::NotInitialized);
        }
        if key.is_some_and(str::is_empty) {
            return Err(SettingsError::InvalidKey);
        }
        state.refresh();
        Ok(state)
    }

    /// Apply broadcasts received since the last call
    pub fn refresh(&self) -> bool {
        self.state().refresh()
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let state = self.ready(Some(key))?;
        Ok(state
            .settings
            .get(key)
            .or_else(|| state.defaults.get(key))
            .cloned())
    }

    pub fn get_default(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.ready(Some(key))?.defaults.get(key).cloned())
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.ready(Some(key))?.settings.contains_key(key))
    }

    pub fn get_all(&self) -> Settings {
        let mut state = self.state();
        state.refresh();
        state.settings.clone()
    }

    pub fn defaults(&self) -> Settings {
        self.state().defaults.clone()
    }

    pub fn validate(&self, key: &str, value: Value) -> Result<OperationResult> {
        drop(self.ready(Some(key))?);
        operation(self.transport.invoke(Request::Validate {
            key: key.to_string(),
            value,
        })?)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<OperationResult> {
        drop(self.ready(Some(key))?);
        operation(self.transport.invoke(Request::Set {
            key: key.to_string(),
            value,
        })?)
    }

    pub fn set_many(&self, values: Settings) -> Result<OperationResult> {
        drop(self.ready(None)?);
        operation(self.transport.invoke(Request::SetMany { values })?)
    }

    pub fn set_all(&self, settings: Settings) -> Result<()> {
        drop(self.ready(None)?);
        done(self.transport.invoke(Request::SetAll { settings })?)
    }

    pub fn set_and_write(&self, key: &str, value: Value) -> Result<OperationResult> {
        drop(self.ready(Some(key))?);
        operation(self.transport.invoke(Request::SetAndWrite {
            key: key.to_string(),
            value,
        })?)
    }

    pub fn write(&self) -> Result<()> {
        done(self.transport.invoke(Request::Write)?)
    }

    /// Remove a key locally and in the store; false when it was not cached
    pub fn unset(&self, key: &str) -> Result<bool> {
        {
            let mut state = self.ready(Some(key))?;
            if state.settings.remove(key).is_none() {
                return Ok(false);
            }
        }
        match self.transport.invoke(Request::Unset { key: key.to_string() })? {
            Response::Removed(removed) => Ok(removed),
            other => Err(unexpected(other)),
        }
    }

    pub fn reset(&self) -> Result<()> {
        self.reset_local();
        done(self.transport.invoke(Request::Reset)?)
    }

    pub fn reset_and_write(&self) -> Result<()> {
        self.reset_local();
        done(self.transport.invoke(Request::ResetAndWrite)?)
    }

    fn reset_local(&self) {
        let mut state = self.state();
        state.settings = state.defaults.clone();
    }

    pub fn disable_file_watcher(&self) -> Result<bool> {
        match self.transport.invoke(Request::DisableFileWatcher)? {
            Response::WatcherDisabled(disabled) => Ok(disabled),
            other => Err(unexpected(other)),
        }
    }
}

fn operation(response: Response) -> Result<OperationResult> {
    match response {
        Response::Operation(result) => Ok(result),
        other => Err(unexpected(other)),
    }
}

fn done(response: Response) -> Result<()> {
    match response {
        Response::Done => Ok(()),
        other => Err(unexpected(other)),
    }
}

fn unexpected(response: Response) -> SettingsError {
    match response {
        Response::Error { message } => SettingsError::Transport(message),
        other => SettingsError::Transport(format!("unexpected response: {:?}", other)),
    }
}
