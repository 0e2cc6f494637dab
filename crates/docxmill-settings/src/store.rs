//! The settings store
//!
//! [`SettingsStore`] keeps the settings in memory, persists them as JSON and
//! tells subscribers about every change. Handles are cheap to clone and can
//! be shared between threads.
//!
//! Writes never overlap: a write requested while another one is running is
//! folded into a single follow-up write of the latest settings. While a
//! write runs the file watcher is paused, and file events arriving within
//! the guard window after a write are ignored so the store does not reload
//! its own output.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, SettingsError};
use crate::options::StoreOptions;
use crate::schema::{FieldError, Schema};

/// A flat settings object
pub type Settings = Map<String, Value>;

/// Lifecycle of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Uninitialized,
    Initializing,
    Initialized,
}

/// Outcome of validating or setting a value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: bool,
    /// Schema default of the key, if it has one
    pub default: Option<Value>,
    pub errors: Vec<String>,
}

impl OperationResult {
    fn ok(default: Option<Value>) -> Self {
        Self {
            status: true,
            default,
            errors: Vec::new(),
        }
    }

    fn failed(default: Option<Value>, errors: Vec<String>) -> Self {
        Self {
            status: false,
            default,
            errors,
        }
    }
}

struct State {
    phase: StoreState,
    cache: Settings,
    listeners: Vec<Sender<Settings>>,
    watcher: Option<RecommendedWatcher>,
    watch_enabled: bool,
    writing: bool,
    write_again: bool,
    last_write: Option<Instant>,
    reload_pending: bool,
}

struct Inner {
    schema: Schema,
    defaults: Settings,
    options: StoreOptions,
    path: PathBuf,
    state: Mutex<State>,
}

/// Schema-validated settings persisted to a JSON file
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// Create a store; call [`init`](Self::init) before reading settings
    pub fn new(schema: Schema, options: StoreOptions) -> Result<Self> {
        options.validate_options()?;
        let path = options.file_path();
        let defaults = schema.defaults();
        let state = State {
            phase: StoreState::Uninitialized,
            cache: Settings::new(),
            listeners: Vec::new(),
            watcher: None,
            watch_enabled: options.watch_file,
            writing: false,
            write_again: false,
            last_write: None,
            reload_pending: false,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                schema,
                defaults,
                options,
                path,
                state: Mutex::new(state),
            }),
        })
    }

    /// Create and initialize a store
    pub fn open(schema: Schema, options: StoreOptions) -> Result<Self> {
        let store = Self::new(schema, options)?;
        store.init()?;
        Ok(store)
    }

    /// Load the settings file, writing the defaults when there is none
    pub fn init(&self) -> Result<()> {
        {
            let mut state = self.inner.state();
            if state.phase == StoreState::Initialized {
                return Ok(());
            }
            state.phase = StoreState::Initializing;
        }
        info!(path = %self.inner.path.display(), "initializing settings store");

        match self.load() {
            Ok(()) => {
                self.inner.state().phase = StoreState::Initialized;
                start_watcher(&self.inner)
            }
            Err(err) => {
                self.inner.state().phase = StoreState::Uninitialized;
                Err(err)
            }
        }
    }

    fn load(&self) -> Result<()> {
        if !self.inner.ensure_dir_and_file()? {
            return self.write_defaults();
        }
        let text = fs::read_to_string(&self.inner.path)?;
        let mut settings = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(settings)) => settings,
            Ok(_) => {
                warn!("settings file does not hold an object");
                return self.write_defaults();
            }
            Err(err) => {
                warn!(error = %err, "Error parsing settings file");
                return self.write_defaults();
            }
        };

        if self.inner.options.validate_file {
            let errors = self.inner.schema.check(&mut settings);
            if let Some(first) = errors.first() {
                if !self.inner.options.default_on_fail_validation {
                    return Err(SettingsError::Validation(format!(
                        "Initial settings validation fail: '{}'",
                        first.message
                    )));
                }
                warn!(count = errors.len(), "invalid settings replaced by their defaults");
                self.inner.apply_defaults(&mut settings, &errors);
                self.inner.set_cache(settings);
                return write_settings(&self.inner);
            }
        }
        self.inner.set_cache(settings);
        Ok(())
    }

    fn write_defaults(&self) -> Result<()> {
        info!("defaults will be written");
        self.inner.set_cache(self.inner.defaults.clone());
        write_settings(&self.inner)
    }

    pub fn state(&self) -> StoreState {
        self.inner.state().phase
    }

    pub fn file_path(&self) -> &Path {
        &self.inner.path
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Cached value, falling back to the schema default
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        let state = self.inner.initialized()?;
        Ok(state
            .cache
            .get(key)
            .or_else(|| self.inner.defaults.get(key))
            .cloned())
    }

    pub fn get_default(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        self.inner.initialized()?;
        Ok(self.inner.defaults.get(key).cloned())
    }

    pub fn get_all(&self) -> Result<Settings> {
        Ok(self.inner.initialized()?.cache.clone())
    }

    pub fn defaults(&self) -> Settings {
        self.inner.defaults.clone()
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        Ok(self.inner.initialized()?.cache.contains_key(key))
    }

    /// Check a value against the key's rule without storing it
    pub fn validate(&self, key: &str, value: &Value) -> Result<OperationResult> {
        check_key(key)?;
        Ok(self.inner.validate(key, value))
    }

    /// Store one value
    ///
    /// A key missing from the cache but known to the schema gets its default.
    /// Invalid values are replaced by the default when
    /// `default_on_fail_validation` is set.
    pub fn set(&self, key: &str, value: Value) -> Result<OperationResult> {
        check_key(key)?;
        self.inner.initialized()?;
        Ok(self.inner.set_value(key, value))
    }

    /// Store several values; errors of all keys are collected
    pub fn set_many(&self, values: Settings) -> Result<OperationResult> {
        self.inner.initialized()?;
        let mut group = OperationResult::ok(None);
        for (key, value) in values {
            check_key(&key)?;
            let result = self.inner.set_value(&key, value);
            if !result.status {
                group.status = false;
                group.errors.extend(result.errors);
            }
        }
        Ok(group)
    }

    /// Replace all settings
    pub fn set_all(&self, settings: Settings) -> Result<()> {
        self.inner.initialized()?;
        if !self.inner.options.validate {
            self.inner.set_cache(settings);
            return Ok(());
        }
        let mut settings = settings;
        let errors = self.inner.schema.check(&mut settings);
        match errors.first() {
            None => self.inner.set_cache(settings),
            Some(_) if self.inner.options.default_on_fail_validation => {
                self.inner.set_cache(self.inner.defaults.clone())
            }
            Some(first) => {
                return Err(SettingsError::Validation(format!(
                    "Set All validation fail: '{}'",
                    first.message
                )))
            }
        }
        Ok(())
    }

    /// Remove a key from the cache; false when it was not there
    pub fn unset(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        let mut state = self.inner.state();
        if state.cache.remove(key).is_none() {
            return Ok(false);
        }
        broadcast(&mut state);
        Ok(true)
    }

    /// Replace all settings with the defaults
    pub fn reset(&self) {
        self.inner.set_cache(self.inner.defaults.clone());
    }

    /// Persist the cached settings
    pub fn write(&self) -> Result<()> {
        write_settings(&self.inner)
    }

    pub fn set_and_write(&self, key: &str, value: Value) -> Result<OperationResult> {
        let mut result = self.set(key, value)?;
        if !result.status {
            return Ok(result);
        }
        if let Err(err) = self.write() {
            result.status = false;
            result.errors = vec![format!("Write operation failed! {}", err)];
        }
        Ok(result)
    }

    pub fn reset_and_write(&self) -> Result<()> {
        self.reset();
        self.write()
    }

    /// Stop watching the settings file; false when it was not watched
    pub fn disable_file_watcher(&self) -> bool {
        let watcher = {
            let mut state = self.inner.state();
            if !state.watch_enabled || state.watcher.is_none() {
                return false;
            }
            state.watch_enabled = false;
            state.watcher.take()
        };
        drop(watcher);
        debug!("settings file watcher disabled");
        true
    }

    pub fn is_watching(&self) -> bool {
        self.inner.state().watcher.is_some()
    }

    /// Receive the full settings after every change
    pub fn subscribe(&self) -> Receiver<Settings> {
        let (tx, rx) = channel();
        self.inner.state().listeners.push(tx);
        rx
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initialized(&self) -> Result<MutexGuard<'_, State>> {
        let state = self.state();
        if state.phase != StoreState::Initialized {
            return Err(SettingsError::NotInitialized);
        }
        Ok(state)
    }

    fn validate(&self, key: &str, value: &Value) -> OperationResult {
        let default = self.defaults.get(key).cloned();
        let errors = self.schema.validate_value(key, value);
        if errors.is_empty() {
            OperationResult::ok(default)
        } else {
            OperationResult::failed(default, errors)
        }
    }

    fn set_value(&self, key: &str, value: Value) -> OperationResult {
        let default = self.defaults.get(key).cloned();
        if !self.state().cache.contains_key(key) {
            return match default {
                Some(default) => {
                    self.set_cache_key(key, default.clone());
                    OperationResult::ok(Some(default))
                }
                None => OperationResult::failed(None, vec!["Key not found in cached settings".to_string()]),
            };
        }
        if !self.options.validate {
            self.set_cache_key(key, value);
            return OperationResult::ok(default);
        }

        let result = self.validate(key, &value);
        if result.status {
            self.set_cache_key(key, value);
            return result;
        }
        if !self.options.default_on_fail_validation {
            return result;
        }
        if let Some(default) = &default {
            self.set_cache_key(key, default.clone());
        }
        OperationResult {
            status: true,
            default,
            errors: vec!["Default setting was applied".to_string()],
        }
    }

    fn set_cache(&self, settings: Settings) {
        let mut state = self.state();
        if state.cache == settings {
            return;
        }
        state.cache = settings;
        broadcast(&mut state);
    }

    fn set_cache_key(&self, key: &str, value: Value) {
        let mut state = self.state();
        if state.cache.get(key) == Some(&value) {
            return;
        }
        state.cache.insert(key.to_string(), value);
        broadcast(&mut state);
    }

    fn apply_defaults(&self, settings: &mut Settings, errors: &[FieldError]) {
        for error in errors {
            if let Some(default) = self.defaults.get(&error.field) {
                settings.insert(error.field.clone(), default.clone());
            }
        }
    }

    /// True when the file exists, false when it still has to be created
    fn ensure_dir_and_file(&self) -> Result<bool> {
        match fs::metadata(&self.path) {
            Ok(metadata) if metadata.permissions().readonly() => {
                Err(SettingsError::Permission(self.path.clone()))
            }
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.options.dir).map_err(|source| SettingsError::CreateDir {
                    path: self.options.dir.clone(),
                    source,
                })?;
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_json(&self, settings: &Settings) -> Result<()> {
        let mut buffer = Vec::new();
        if self.options.pretty_print {
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
            settings.serialize(&mut serializer)?;
        } else {
            serde_json::to_writer(&mut buffer, settings)?;
        }
        fs::write(&self.path, buffer)?;
        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.options.write_before_quit {
            return;
        }
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.phase != StoreState::Initialized || state.writing {
            return;
        }
        let settings = state.cache.clone();
        if let Err(err) = self.write_json(&settings) {
            warn!(error = %err, "could not write settings before quitting");
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(SettingsError::InvalidKey);
    }
    Ok(())
}

fn broadcast(state: &mut State) {
    let settings = state.cache.clone();
    state
        .listeners
        .retain(|listener| listener.send(settings.clone()).is_ok());
}

/// Write the cache, coalescing with a write that is already running
fn write_settings(inner: &Arc<Inner>) -> Result<()> {
    let paused = {
        let mut state = inner.state();
        if state.writing {
            debug!("write in progress, queueing another one");
            state.write_again = true;
            return Ok(());
        }
        state.writing = true;
        state.watcher.take()
    };
    drop(paused);

    loop {
        let settings = inner.state().cache.clone();
        let result = inner.write_json(&settings);
        let mut state = inner.state();
        state.last_write = Some(Instant::now());
        if let Err(err) = result {
            state.writing = false;
            state.write_again = false;
            drop(state);
            start_watcher(inner)?;
            return Err(err);
        }
        if state.write_again {
            state.write_again = false;
            continue;
        }
        state.writing = false;
        break;
    }
    debug!(path = %inner.path.display(), "settings written");
    start_watcher(inner)
}

/// Start the file watcher if watching is enabled and it is not running
fn start_watcher(inner: &Arc<Inner>) -> Result<()> {
    {
        let state = inner.state();
        if !state.watch_enabled || state.watcher.is_some() || state.writing {
            return Ok(());
        }
    }

    let weak = Arc::downgrade(inner);
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match res {
                Ok(event) => on_file_event(&inner, event),
                Err(err) => warn!(error = %err, "settings file watcher failed"),
            }
        },
        Config::default(),
    )?;
    watcher.watch(&inner.options.dir, RecursiveMode::NonRecursive)?;

    let mut state = inner.state();
    if state.watch_enabled && state.watcher.is_none() {
        state.watcher = Some(watcher);
    }
    Ok(())
}

fn on_file_event(inner: &Arc<Inner>, event: Event) {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return;
    }
    let file_name = inner.path.file_name();
    if !event.paths.iter().any(|path| path.file_name() == file_name) {
        return;
    }

    {
        let mut state = inner.state();
        if state.reload_pending || state.writing {
            return;
        }
        if state
            .last_write
            .is_some_and(|at| at.elapsed() < inner.options.watch_guard())
        {
            debug!("file change ignored right after an internal write");
            return;
        }
        state.reload_pending = true;
    }

    let weak = Arc::downgrade(inner);
    let debounce = inner.options.watch_debounce();
    thread::spawn(move || {
        thread::sleep(debounce);
        if let Some(inner) = weak.upgrade() {
            reload(&inner);
        }
    });
}

/// Reload the file after an external change
fn reload(inner: &Arc<Inner>) {
    inner.state().reload_pending = false;
    let text = match fs::read_to_string(&inner.path) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "could not read the changed settings file");
            return;
        }
    };
    let mut settings = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(settings)) => settings,
        Ok(_) => return,
        Err(err) => {
            debug!(error = %err, "Error parsing settings file");
            return;
        }
    };
    info!("settings file changed on disk, reloading");

    if !inner.options.validate_file {
        inner.set_cache(settings);
        return;
    }
    let errors = inner.schema.check(&mut settings);
    if errors.is_empty() {
        inner.set_cache(settings);
        return;
    }
    if !inner.options.default_on_fail_validation {
        info!("invalid settings ignored");
        return;
    }
    inner.apply_defaults(&mut settings, &errors);
    inner.set_cache(settings);
    if let Err(err) = write_settings(inner) {
        warn!(error = %err, "could not rewrite the settings file");
    }
}
