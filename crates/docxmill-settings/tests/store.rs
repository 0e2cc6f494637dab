//! Settings store integration tests
//!
//! Test Categories:
//! 1. Initialization and persistence
//! 2. Setting values
//! 3. Concurrent writes
//! 4. File watching
//! 5. Message channel and client

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use docxmill_settings::{FieldRule, Schema, SettingsStore, StoreOptions};
use serde_json::{json, Value};

fn schema() -> Schema {
    Schema::new([
        ("size", FieldRule::number(25).with_min(10.0).with_max(40.0)),
        ("theme", FieldRule::string("light").with_values(["light", "dark"])),
        ("spellcheck", FieldRule::boolean(true)),
    ])
    .unwrap()
}

fn read_file(store: &SettingsStore) -> Value {
    serde_json::from_str(&fs::read_to_string(store.file_path()).unwrap()).unwrap()
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

// =============================================================================
// PART 1: INITIALIZATION
// =============================================================================

mod init_tests {
    use super::*;
    use docxmill_settings::{SettingsError, StoreState};

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = SettingsStore::open(schema(), StoreOptions::new(&nested)).unwrap();

        assert_eq!(store.state(), StoreState::Initialized);
        assert_eq!(store.file_path(), nested.join("config.json"));
        assert_eq!(
            read_file(&store),
            json!({"size": 25, "theme": "light", "spellcheck": true})
        );
        assert_eq!(store.get("size").unwrap(), Some(json!(25)));
    }

    #[test]
    fn test_existing_file_is_loaded_and_completed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"size": 12, "custom": "x"}"#).unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();

        assert_eq!(store.get("size").unwrap(), Some(json!(12)));
        assert_eq!(store.get("theme").unwrap(), Some(json!("light")));
        assert_eq!(store.get("custom").unwrap(), Some(json!("x")));
        assert_eq!(store.get("unknown").unwrap(), None);
    }

    #[test]
    fn test_unparsable_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();
        assert_eq!(read_file(&store)["theme"], json!("light"));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"size": 99, "theme": "dark"}"#).unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();

        assert_eq!(store.get("size").unwrap(), Some(json!(25)));
        assert_eq!(store.get("theme").unwrap(), Some(json!("dark")));
        assert_eq!(read_file(&store)["size"], json!(25));
    }

    #[test]
    fn test_invalid_file_fails_without_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"size": 99}"#).unwrap();
        let options = StoreOptions::new(dir.path()).with_default_on_fail_validation(false);
        let store = SettingsStore::new(schema(), options).unwrap();

        let err = store.init().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Initial settings validation fail: 'The 'size' field must be less than or equal to 40.'"
        );
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(matches!(store.get_all(), Err(SettingsError::NotInitialized)));
    }

    #[test]
    fn test_custom_file_name_and_compact_output() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions::new(dir.path())
            .with_file_name("prefs")
            .with_file_extension("cfg")
            .with_pretty_print(false);
        let store = SettingsStore::open(schema(), options).unwrap();
        let text = fs::read_to_string(dir.path().join("prefs.cfg")).unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(store.file_path(), dir.path().join("prefs.cfg"));
    }

    #[test]
    fn test_write_before_quit() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions::new(dir.path()).with_write_before_quit(true);
        let store = SettingsStore::open(schema(), options).unwrap();
        store.set("size", json!(33)).unwrap();
        let path = store.file_path().to_path_buf();
        drop(store);

        let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["size"], json!(33));
    }
}

// =============================================================================
// PART 2: SETTING VALUES
// =============================================================================

mod set_tests {
    use super::*;
    use docxmill_settings::SettingsError;

    fn open(options: StoreOptions) -> SettingsStore {
        SettingsStore::open(schema(), options).unwrap()
    }

    #[test]
    fn test_valid_and_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(StoreOptions::new(dir.path()));

        let result = store.set("size", json!(30)).unwrap();
        assert!(result.status);
        assert_eq!(result.default, Some(json!(25)));
        assert!(result.errors.is_empty());

        let result = store.set("size", json!(50)).unwrap();
        assert!(result.status);
        assert_eq!(result.errors, vec!["Default setting was applied"]);
        assert_eq!(store.get("size").unwrap(), Some(json!(25)));
    }

    #[test]
    fn test_invalid_value_rejected_without_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions::new(dir.path()).with_default_on_fail_validation(false);
        let store = open(options);

        let result = store.set("theme", json!("blue")).unwrap();
        assert!(!result.status);
        assert_eq!(
            result.errors,
            vec!["The 'theme' field does not match any of the allowed values."]
        );
        assert_eq!(store.get("theme").unwrap(), Some(json!("light")));
    }

    #[test]
    fn test_unknown_and_unset_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(StoreOptions::new(dir.path()));

        let result = store.set("missing", json!(1)).unwrap();
        assert!(!result.status);
        assert_eq!(result.errors, vec!["Key not found in cached settings"]);

        assert!(store.unset("size").unwrap());
        assert!(!store.has("size").unwrap());
        assert!(!store.unset("size").unwrap());
        assert_eq!(store.get("size").unwrap(), Some(json!(25)));

        // A schema key that is no longer cached comes back with its default
        let result = store.set("size", json!(30)).unwrap();
        assert!(result.status);
        assert_eq!(store.get("size").unwrap(), Some(json!(25)));
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(StoreOptions::new(dir.path()).with_validate(false));
        assert!(store.set("size", json!(500)).unwrap().status);
        assert_eq!(store.get("size").unwrap(), Some(json!(500)));
    }

    #[test]
    fn test_set_many_collects_errors() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions::new(dir.path()).with_default_on_fail_validation(false);
        let store = open(options);

        let values = json!({"size": 5, "theme": "dark", "spellcheck": "yes"});
        let result = store.set_many(values.as_object().unwrap().clone()).unwrap();
        assert!(!result.status);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(store.get("theme").unwrap(), Some(json!("dark")));
    }

    #[test]
    fn test_set_all_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let options = StoreOptions::new(dir.path()).with_default_on_fail_validation(false);
        let store = open(options);

        let valid = json!({"size": 11, "theme": "dark", "spellcheck": false});
        store.set_all(valid.as_object().unwrap().clone()).unwrap();
        assert_eq!(store.get("size").unwrap(), Some(json!(11)));

        let invalid = json!({"size": 1});
        let err = store.set_all(invalid.as_object().unwrap().clone()).unwrap_err();
        assert!(matches!(err, SettingsError::Validation(_)));
        assert!(err.to_string().starts_with("Set All validation fail:"));

        store.reset_and_write().unwrap();
        assert_eq!(read_file(&store)["size"], json!(25));
    }

    #[test]
    fn test_set_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(StoreOptions::new(dir.path()));
        let result = store.set_and_write("theme", json!("dark")).unwrap();
        assert!(result.status);
        assert_eq!(read_file(&store)["theme"], json!("dark"));
    }
}

// =============================================================================
// PART 3: CONCURRENT WRITES
// =============================================================================

mod write_tests {
    use super::*;

    #[test]
    fn test_concurrent_writes_end_with_latest_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();

        let handles: Vec<_> = (10..30)
            .map(|size| {
                let store = store.clone();
                thread::spawn(move || {
                    store.set("size", json!(size)).unwrap();
                    store.write().unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // A queued write may still be finishing on another thread
        store.write().unwrap();

        let cached = store.get("size").unwrap().unwrap();
        assert!(wait_for(|| read_file(&store)["size"] == cached));
    }
}

// =============================================================================
// PART 4: FILE WATCHING
// =============================================================================

mod watch_tests {
    use super::*;

    fn watched(dir: &Path, guard: Duration) -> SettingsStore {
        let options = StoreOptions::new(dir)
            .with_watch_file(true)
            .with_watch_guard(guard)
            .with_watch_debounce(Duration::from_millis(100));
        SettingsStore::open(schema(), options).unwrap()
    }

    #[test]
    fn test_external_change_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = watched(dir.path(), Duration::ZERO);
        assert!(store.is_watching());
        let updates = store.subscribe();

        thread::sleep(Duration::from_millis(200));
        fs::write(store.file_path(), r#"{"size": 15, "theme": "dark", "spellcheck": true}"#).unwrap();

        assert!(wait_for(|| store.get("size").unwrap() == Some(json!(15))));
        assert_eq!(store.get("theme").unwrap(), Some(json!("dark")));
        assert!(updates.try_iter().any(|settings| settings["size"] == json!(15)));
    }

    #[test]
    fn test_changes_inside_guard_window_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = watched(dir.path(), Duration::from_secs(60));

        fs::write(store.file_path(), r#"{"size": 15}"#).unwrap();
        thread::sleep(Duration::from_millis(800));
        assert_eq!(store.get("size").unwrap(), Some(json!(25)));
    }

    #[test]
    fn test_disable_file_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let store = watched(dir.path(), Duration::ZERO);
        assert!(store.disable_file_watcher());
        assert!(!store.is_watching());
        assert!(!store.disable_file_watcher());

        // Writing no longer restarts the watcher
        store.write().unwrap();
        assert!(!store.is_watching());
    }
}

// =============================================================================
// PART 5: CHANNEL AND CLIENT
// =============================================================================

mod client_tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    use docxmill_settings::{
        LocalTransport, Request, Response, Settings, SettingsClient, SettingsError, Transport,
    };

    /// Changes a setting right after answering the initial fetch
    struct ChangeAfterFetch {
        store: SettingsStore,
    }

    impl Transport for ChangeAfterFetch {
        fn invoke(&self, request: Request) -> docxmill_settings::Result<Response> {
            let fetch = request == Request::GetAllAndDefaults;
            let response = self.store.handle(request);
            if fetch {
                self.store.set("size", json!(33))?;
            }
            Ok(response)
        }

        fn subscribe(&self) -> docxmill_settings::Result<Receiver<Settings>> {
            Ok(self.store.subscribe())
        }
    }

    #[test]
    fn test_handle_requests() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();

        match store.handle(Request::Validate {
            key: "size".to_string(),
            value: json!(100),
        }) {
            Response::Operation(result) => assert!(!result.status),
            other => panic!("unexpected response {:?}", other),
        }
        assert_eq!(
            store.handle(Request::Unset { key: "theme".to_string() }),
            Response::Removed(true)
        );
        assert_eq!(
            store.handle(Request::Set {
                key: String::new(),
                value: json!(1)
            }),
            Response::Error {
                message: "Enter a valid key name".to_string()
            }
        );
    }

    #[test]
    fn test_client_follows_store_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();
        let client = SettingsClient::new(LocalTransport::new(store.clone()));
        assert!(matches!(client.get("size"), Err(SettingsError::NotInitialized)));

        client.init().unwrap();
        assert_eq!(client.get("size").unwrap(), Some(json!(25)));
        assert_eq!(client.get_default("theme").unwrap(), Some(json!("light")));

        // Changes made directly on the store reach the client
        store.set("size", json!(20)).unwrap();
        assert_eq!(client.get("size").unwrap(), Some(json!(20)));

        // And changes made through the client reach the store
        let result = client.set("theme", json!("dark")).unwrap();
        assert!(result.status);
        assert_eq!(store.get("theme").unwrap(), Some(json!("dark")));
        assert_eq!(client.get("theme").unwrap(), Some(json!("dark")));

        client.set_and_write("spellcheck", json!(false)).unwrap();
        assert_eq!(read_file(&store)["spellcheck"], json!(false));

        assert!(client.unset("size").unwrap());
        assert!(!client.has("size").unwrap());
        assert!(!store.has("size").unwrap());

        client.reset().unwrap();
        assert_eq!(client.get_all(), store.defaults());
    }

    #[test]
    fn test_client_sees_change_made_during_init() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(schema(), StoreOptions::new(dir.path())).unwrap();
        let client = SettingsClient::new(ChangeAfterFetch { store: store.clone() });

        client.init().unwrap();

        assert_eq!(store.get("size").unwrap(), Some(json!(33)));
        assert_eq!(client.get_all()["size"], json!(33));
    }
}
