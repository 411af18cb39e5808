use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use gymbuddy_lib::{AppService, Config, ExerciseEntry, RemoteStore, SyncScheduler};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(2000);

/// In-memory remote that records every upsert it receives.
#[derive(Default)]
struct RecordingRemote {
    stored: Mutex<HashMap<String, Value>>,
    upserts: Mutex<Vec<(String, Value)>>,
    failing: bool,
}

impl RecordingRemote {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn with_document(self, key: &str, value: Value) -> Self {
        self.stored.lock().unwrap().insert(key.to_string(), value);
        self
    }

    fn upserts(&self) -> Vec<(String, Value)> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for RecordingRemote {
    async fn fetch_by_key(&self, key: &str) -> Result<Option<Value>> {
        if self.failing {
            bail!("remote unavailable");
        }
        Ok(self.stored.lock().unwrap().get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &Value) -> Result<()> {
        if self.failing {
            bail!("remote unavailable");
        }
        self.upserts
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.stored
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

fn service_with(remote: Arc<RecordingRemote>) -> Result<AppService> {
    let conn = rusqlite::Connection::open_in_memory()?;
    let mut service = AppService::with_connection(
        Config::default(),
        conn,
        ":memory:".into(),
        "test_config.toml".into(),
    )?;
    service.attach_sync(SyncScheduler::new(remote, DEBOUNCE));
    Ok(service)
}

#[tokio::test(start_paused = true)]
async fn test_debounce_sends_only_latest_value() {
    let remote = Arc::new(RecordingRemote::default());
    let scheduler = SyncScheduler::new(remote.clone(), DEBOUNCE);

    scheduler.schedule("gymbuddy_logs", json!({"v": 1}));
    settle(Duration::from_millis(500)).await;
    scheduler.schedule("gymbuddy_logs", json!({"v": 2}));
    settle(Duration::from_millis(1900)).await;

    // first write was replaced before its timer ran out
    assert!(remote.upserts().is_empty());
    assert_eq!(scheduler.pending_keys(), vec!["gymbuddy_logs".to_string()]);

    settle(Duration::from_millis(200)).await;
    assert_eq!(
        remote.upserts(),
        vec![("gymbuddy_logs".to_string(), json!({"v": 2}))]
    );
    assert!(scheduler.pending_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_keys_are_debounced_independently() {
    let remote = Arc::new(RecordingRemote::default());
    let scheduler = SyncScheduler::new(remote.clone(), DEBOUNCE);

    scheduler.schedule("gymbuddy_goals", json!({"daily": {}}));
    scheduler.schedule("gymbuddy_cardio", json!(["Rower"]));
    assert_eq!(
        scheduler.pending_keys(),
        vec!["gymbuddy_cardio".to_string(), "gymbuddy_goals".to_string()]
    );

    settle(DEBOUNCE + Duration::from_millis(10)).await;
    let mut keys: Vec<String> = remote.upserts().into_iter().map(|(k, _)| k).collect();
    keys.sort();
    assert_eq!(keys, vec!["gymbuddy_cardio", "gymbuddy_goals"]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_sends_pending_writes_once() {
    let remote = Arc::new(RecordingRemote::default());
    let scheduler = SyncScheduler::new(remote.clone(), DEBOUNCE);

    scheduler.schedule("gymbuddy_exercises", json!(["Pompki"]));
    scheduler.flush().await;
    assert_eq!(remote.upserts().len(), 1);
    assert!(scheduler.pending_keys().is_empty());

    settle(DEBOUNCE * 2).await;
    assert_eq!(remote.upserts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_swallowed() {
    let remote = Arc::new(RecordingRemote::failing());
    let scheduler = SyncScheduler::new(remote.clone(), DEBOUNCE);

    scheduler.schedule("gymbuddy_logs", json!({}));
    settle(DEBOUNCE + Duration::from_millis(10)).await;
    assert!(scheduler.pending_keys().is_empty());

    scheduler.schedule("gymbuddy_logs", json!({}));
    scheduler.flush().await;
    assert_eq!(scheduler.fetch("gymbuddy_logs").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_service_edits_are_uploaded_after_local_save() -> Result<()> {
    let remote = Arc::new(RecordingRemote::default());
    let mut service = service_with(remote.clone())?;
    let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

    service.set_weight(day, Some(80.0))?;
    service.set_exercise(day, "Pompki", ExerciseEntry::LegacyTotal(30.0))?;
    service.add_cardio("Pływanie")?;

    let local = gymbuddy_lib::store::load_document(&service.conn, gymbuddy_lib::DocumentKey::Logs)?;
    assert!(local.is_some());
    assert!(remote.upserts().is_empty());

    settle(DEBOUNCE + Duration::from_millis(10)).await;
    let upserts = remote.upserts();
    assert_eq!(upserts.len(), 2);
    let logs = upserts
        .iter()
        .find(|(k, _)| k == "gymbuddy_logs")
        .map(|(_, v)| v.clone())
        .unwrap();
    assert_eq!(logs["2024-03-05"]["weight"], json!(80.0));
    assert_eq!(logs["2024-03-05"]["exercises"]["Pompki"], json!(30.0));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_push_all_uploads_every_document() -> Result<()> {
    let remote = Arc::new(RecordingRemote::default());
    let service = service_with(remote.clone())?;

    assert_eq!(service.push_all().await?, 5);
    let mut keys: Vec<String> = remote.upserts().into_iter().map(|(k, _)| k).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "gymbuddy_cardio",
            "gymbuddy_exercise_groups",
            "gymbuddy_exercises",
            "gymbuddy_goals",
            "gymbuddy_logs"
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pull_remote_replaces_local_documents() -> Result<()> {
    let remote = Arc::new(
        RecordingRemote::default()
            .with_document("gymbuddy_cardio", json!(["Wioślarz"]))
            .with_document(
                "gymbuddy_logs",
                json!({"2024-03-01": {"weight": 77, "exercises": {"Plank": 4}}}),
            ),
    );
    let mut service = service_with(remote)?;

    assert_eq!(service.pull_remote().await?, 2);
    assert_eq!(service.catalogs().cardio, vec!["Wioślarz"]);
    assert_eq!(service.catalogs().exercises.len(), 3);
    let day = service
        .logs()
        .get(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        .unwrap();
    assert_eq!(day.weight, Some(77.0));

    let local = gymbuddy_lib::store::load_document(&service.conn, gymbuddy_lib::DocumentKey::Cardio)?;
    assert_eq!(local, Some(json!(["Wioślarz"])));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pull_remote_keeps_local_on_failure() -> Result<()> {
    let remote = Arc::new(RecordingRemote::failing());
    let mut service = service_with(remote)?;
    service.add_exercise("Wykroki", None)?;

    assert_eq!(service.pull_remote().await?, 0);
    assert!(service.catalogs().exercises.iter().any(|e| e == "Wykroki"));
    Ok(())
}

#[test]
fn test_edits_outside_a_runtime_wait_for_flush() -> Result<()> {
    let remote = Arc::new(RecordingRemote::default());
    let mut service = service_with(remote.clone())?;
    let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

    service.set_weight(day, Some(80.0))?;
    service.set_weight(day, Some(81.0))?;
    let local = gymbuddy_lib::store::load_document(&service.conn, gymbuddy_lib::DocumentKey::Logs)?;
    assert_eq!(local.unwrap()["2024-03-05"]["weight"], json!(81.0));
    assert_eq!(
        service.sync().unwrap().pending_keys(),
        vec!["gymbuddy_logs".to_string()]
    );

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(service.flush_sync());
    let upserts = remote.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].1["2024-03-05"]["weight"], json!(81.0));
    assert!(service.sync().unwrap().pending_keys().is_empty());
    Ok(())
}

#[test]
fn test_pull_without_sync_fails() -> Result<()> {
    let conn = rusqlite::Connection::open_in_memory()?;
    let mut service =
        AppService::with_connection(Config::default(), conn, ":memory:".into(), "test_config.toml".into())?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    assert!(runtime.block_on(service.pull_remote()).is_err());
    Ok(())
}
