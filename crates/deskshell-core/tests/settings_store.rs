mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use common::{FakeHost, connect};
use deskshell_core::appearance::{AppearanceSink, DocumentAppearance};
use deskshell_core::bridge::{BridgeClient, OpenDialogResult, SaveDialogResult};
use deskshell_core::settings::{PerformanceSettings, PrivacySettings, Settings, Theme};
use deskshell_core::storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
use deskshell_core::store::{
    ImportOutcome, LoadSource, SETTINGS_KEY, SettingUpdate, SettingsStore, StoreError,
    StoreOptions,
};
use serde_json::json;
use tempfile::tempdir;

fn store_over(storage: &Arc<MemoryStorage>) -> SettingsStore {
    SettingsStore::new(
        Arc::clone(storage) as Arc<dyn KeyValueStorage>,
        StoreOptions::default(),
        None,
    )
}

fn persisted(storage: &MemoryStorage) -> Settings {
    let raw = storage.peek(SETTINGS_KEY).expect("settings were written");
    serde_json::from_str(&raw).expect("persisted settings parse")
}

#[test]
fn invalid_blob_loads_exact_defaults() {
    let blob = json!({ "theme": "dark", "fontSize": 50 }).to_string();
    let storage = Arc::new(MemoryStorage::with_value(SETTINGS_KEY, &blob));
    let store = store_over(&storage);

    let report = store.load();

    assert_eq!(report.source, LoadSource::Default);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].path, "fontSize");
    assert_eq!(store.settings(), Settings::default());
    assert!(!store.has_unsaved_changes());
    assert!(!store.is_loading());
}

#[test]
fn missing_top_level_key_takes_the_default_group() {
    let blob = json!({
        "theme": "auto",
        "fontSize": 18,
        "notifications": { "desktop": false, "sound": true, "autoHide": false },
        "performance": { "hardwareAcceleration": false, "backgroundProcessing": true, "memoryLimit": 2048 },
    })
    .to_string();
    let storage = Arc::new(MemoryStorage::with_value(SETTINGS_KEY, &blob));
    let store = store_over(&storage);

    let report = store.load();
    let settings = store.settings();

    assert_eq!(report.source, LoadSource::Stored);
    assert_eq!(settings.theme, Theme::Auto);
    assert_eq!(settings.font_size, 18);
    assert!(settings.notifications.sound);
    assert_eq!(settings.performance.memory_limit, 2048);
    assert_eq!(settings.privacy, PrivacySettings::default());
}

#[test]
fn empty_storage_loads_defaults() {
    let storage = Arc::new(MemoryStorage::new());
    let report = store_over(&storage).load();
    assert_eq!(report.source, LoadSource::Default);
    assert!(report.violations.is_empty());
    assert_eq!(report.error, None);
}

#[tokio::test]
async fn font_size_bounds_are_enforced_on_update() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);

    for (size, accepted) in [(11, false), (12, true), (20, true), (21, false)] {
        let before = store.settings();
        let outcome = store.update(SettingUpdate::FontSize(size));
        assert_eq!(outcome.is_ok(), accepted, "fontSize {size}");
        if accepted {
            assert_eq!(store.settings().font_size, size);
        } else {
            assert!(matches!(outcome, Err(StoreError::Invalid(_))));
            assert_eq!(store.settings(), before);
        }
    }
}

#[tokio::test]
async fn memory_limit_floor_is_enforced_on_nested_update() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);

    store
        .update_nested("performance", "memoryLimit", json!(256))
        .unwrap();
    assert_eq!(store.settings().performance.memory_limit, 256);

    let rejected = store.update_nested("performance", "memoryLimit", json!(255));
    assert!(matches!(rejected, Err(StoreError::Invalid(_))));
    assert_eq!(store.settings().performance.memory_limit, 256);

    let wrong_type = store.update_nested("privacy", "analytics", json!("yes"));
    assert!(matches!(wrong_type, Err(StoreError::Invalid(_))));
}

#[tokio::test(start_paused = true)]
async fn burst_of_mutations_writes_once_with_final_state() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);

    for size in 12..=20 {
        store.update(SettingUpdate::FontSize(size)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    store.update_field("theme", json!("dark")).unwrap();
    store
        .update(SettingUpdate::Performance(PerformanceSettings {
            memory_limit: 4096,
            ..PerformanceSettings::default()
        }))
        .unwrap();

    assert_eq!(storage.writes(), 0);
    assert!(store.has_unsaved_changes());
    assert!(store.autosave_pending());

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(storage.writes(), 1);
    let written = persisted(&storage);
    assert_eq!(written, store.settings());
    assert_eq!(written.font_size, 20);
    assert_eq!(written.theme, Theme::Dark);
    assert_eq!(written.performance.memory_limit, 4096);
    assert!(!store.has_unsaved_changes());
}

#[tokio::test(start_paused = true)]
async fn autosave_delay_comes_from_options() {
    let storage = Arc::new(MemoryStorage::new());
    let store = SettingsStore::new(
        Arc::clone(&storage) as Arc<dyn KeyValueStorage>,
        StoreOptions::default().with_autosave_delay(Duration::from_millis(2000)),
        None,
    );

    store.update(SettingUpdate::Theme(Theme::Dark)).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(storage.writes(), 0);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(storage.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_then_save_persists_exact_defaults() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);
    store.update(SettingUpdate::Theme(Theme::Dark)).unwrap();
    store.update(SettingUpdate::FontSize(19)).unwrap();

    store.reset();
    assert!(store.has_unsaved_changes());
    store.save().unwrap();

    assert_eq!(persisted(&storage), Settings::default());
    assert!(!store.has_unsaved_changes());
    assert!(!store.autosave_pending());

    // The explicit save superseded the pending autosave.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(storage.writes(), 1);
}

#[test]
fn failed_save_keeps_changes_unsaved() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);
    storage.set_fail_writes(true);

    // Without a runtime the autosave runs inline and fails quietly.
    store.update(SettingUpdate::FontSize(16)).unwrap();
    assert!(store.has_unsaved_changes());

    assert!(matches!(store.save(), Err(StoreError::Storage(_))));
    assert!(store.has_unsaved_changes());

    storage.set_fail_writes(false);
    store.save().unwrap();
    assert!(!store.has_unsaved_changes());
}

#[tokio::test]
async fn save_and_notify_reports_both_outcomes() {
    let host = FakeHost::new();
    let (_, client) = connect(&host);
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);

    assert!(store.save_and_notify(&client).await);
    storage.set_fail_writes(true);
    assert!(!store.save_and_notify(&client).await);

    assert_eq!(host.titles(), ["Settings Saved", "Save Failed"]);
}

#[test]
fn round_trip_through_file_storage_is_deep_equal() {
    let temp = tempdir().expect("tempdir");
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(temp.path()));
    let store = SettingsStore::new(Arc::clone(&storage), StoreOptions::default(), None);

    let blob = json!({
        "theme": "dark",
        "fontSize": 16,
        "notifications": { "desktop": false, "sound": true, "autoHide": true },
        "performance": { "hardwareAcceleration": false, "backgroundProcessing": true, "memoryLimit": 512 },
        "privacy": { "analytics": true, "crashReports": false },
    });
    store.import_json(&blob.to_string()).unwrap();
    store.save().unwrap();
    assert!(temp.path().join("app-settings.json").exists());

    let reopened = SettingsStore::new(storage, StoreOptions::default(), None);
    assert_eq!(reopened.load().source, LoadSource::Stored);
    assert_eq!(reopened.settings(), store.settings());
    assert_eq!(reopened.settings().to_value(), blob);
}

#[tokio::test]
async fn invalid_import_leaves_state_untouched() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);
    store.update(SettingUpdate::Theme(Theme::Dark)).unwrap();
    let before = store.settings();

    assert!(matches!(
        store.import_json("{\"theme\": \"neon\"}"),
        Err(StoreError::Invalid(_))
    ));
    assert!(matches!(store.import_json("not json"), Err(StoreError::Parse(_))));
    assert_eq!(store.settings(), before);

    store.import_json("{\"fontSize\": 13}").unwrap();
    assert_eq!(store.settings().font_size, 13);
    assert_eq!(store.settings().theme, Theme::Light);
}

#[tokio::test]
async fn theme_and_font_size_reach_the_document() {
    let document = Arc::new(DocumentAppearance::new(true));
    let storage = Arc::new(MemoryStorage::with_value(
        SETTINGS_KEY,
        &json!({ "theme": "auto", "fontSize": 17 }).to_string(),
    ));
    let store = SettingsStore::new(
        Arc::clone(&storage) as Arc<dyn KeyValueStorage>,
        StoreOptions::default(),
        Some(Arc::clone(&document) as Arc<dyn AppearanceSink>),
    );

    store.initialize();
    let root = document.snapshot();
    assert_eq!(root.classes, ["dark"]);
    assert_eq!(root.font_size.as_deref(), Some("17px"));

    store.update(SettingUpdate::Theme(Theme::Light)).unwrap();
    store.update_field("fontSize", json!(12)).unwrap();
    let root = document.snapshot();
    assert_eq!(root.classes, ["light"]);
    assert_eq!(root.font_size.as_deref(), Some("12px"));
}

#[tokio::test]
async fn export_writes_pretty_json_to_the_chosen_path() {
    let host = FakeHost::new();
    host.answer_save(SaveDialogResult::picked("/home/user/backup.json"));
    let (_, client) = connect(&host);
    let storage = Arc::new(MemoryStorage::new());
    let store = store_over(&storage);
    store.update(SettingUpdate::Theme(Theme::Dark)).unwrap();

    assert!(store.export_to_file(&client).await);

    let writes = host.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0.to_string_lossy(), "/home/user/backup.json");
    assert_eq!(writes[0].1, store.export_json().unwrap());

    let request = host.save_requests.lock().unwrap()[0].clone();
    assert_eq!(request.default_path.as_deref(), Some("app-settings.json"));
    assert_eq!(request.filters[0].name, "JSON Files");
    assert_eq!(request.filters[0].extensions, ["json"]);
    assert_eq!(host.titles(), ["Export Complete"]);
}

#[tokio::test]
async fn canceled_export_writes_nothing() {
    let host = FakeHost::new();
    host.answer_save(SaveDialogResult::canceled());
    let (_, client) = connect(&host);
    let store = store_over(&Arc::new(MemoryStorage::new()));

    assert!(!store.export_to_file(&client).await);
    assert!(host.writes().is_empty());
    assert!(host.titles().is_empty());
}

#[tokio::test]
async fn failed_export_write_is_reported() {
    let host = FakeHost::new();
    host.answer_save(SaveDialogResult::picked("/readonly/settings.json"));
    host.fail_writes.store(true, Ordering::SeqCst);
    let (_, client) = connect(&host);
    let store = store_over(&Arc::new(MemoryStorage::new()));

    assert!(!store.export_to_file(&client).await);
    assert_eq!(host.titles(), ["Export Failed"]);
    let message = host.message_boxes.lock().unwrap()[0].message.clone();
    assert!(message.contains("permission denied"), "{message}");
}

#[tokio::test]
async fn without_a_bridge_file_operations_fall_back() {
    let client = BridgeClient::detached();
    let store = store_over(&Arc::new(MemoryStorage::new()));

    assert!(!store.export_to_file(&client).await);
    assert_eq!(
        store.import_from_file(&client).await,
        ImportOutcome::BridgeUnavailable
    );
    assert!(store.save_and_notify(&client).await);
}

#[tokio::test]
async fn import_from_file_reports_the_pick_without_mutating() {
    let host = FakeHost::new();
    let (_, client) = connect(&host);
    let store = store_over(&Arc::new(MemoryStorage::new()));

    assert_eq!(store.import_from_file(&client).await, ImportOutcome::Canceled);

    host.answer_open(OpenDialogResult::picked(vec![
        "/home/user/settings.json".to_string(),
    ]));
    let outcome = store.import_from_file(&client).await;

    assert_eq!(
        outcome,
        ImportOutcome::ReadUnavailable {
            path: "/home/user/settings.json".to_string()
        }
    );
    assert_eq!(store.settings(), Settings::default());
    assert!(!store.has_unsaved_changes());
    assert_eq!(host.titles(), ["Import Unavailable"]);
}

/// Storage whose first write reports that it started, then waits to be released.
struct GatedStorage {
    values: MemoryStorage,
    gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
}

impl KeyValueStorage for GatedStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.values.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }
        self.values.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_save_is_not_overwritten_by_an_autosave_in_flight() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let storage = Arc::new(GatedStorage {
        values: MemoryStorage::new(),
        gate: Mutex::new(Some((entered_tx, release_rx))),
    });
    let store = SettingsStore::new(
        Arc::clone(&storage) as Arc<dyn KeyValueStorage>,
        StoreOptions::default().with_autosave_delay(Duration::from_millis(10)),
        None,
    );

    store.update(SettingUpdate::Theme(Theme::Dark)).unwrap();
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    // The autosave of the dark theme is now blocked inside `set`.
    store.update(SettingUpdate::Theme(Theme::Light)).unwrap();
    store.update(SettingUpdate::FontSize(18)).unwrap();
    let saver = store.clone();
    let save = tokio::task::spawn_blocking(move || saver.save());
    tokio::time::sleep(Duration::from_millis(50)).await;
    release_tx.send(()).unwrap();
    save.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let on_disk = persisted(&storage.values);
    assert_eq!(on_disk, store.settings());
    assert_eq!(on_disk.theme, Theme::Light);
    assert_eq!(on_disk.font_size, 18);
    assert!(!store.has_unsaved_changes());
}
