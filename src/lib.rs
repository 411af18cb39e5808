// src/lib.rs
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

// --- Declare modules ---
mod config;
pub mod format;
pub mod model;
pub mod stats;
pub mod store;
pub mod sync_client;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    parse_color,
    save as save_config_util,
    Config,
    Error as ConfigError,
    StandardColor,
    SyncConfig,
    SyncSettings,
    Theme,
};
pub use format::{format_date_pl, format_day_month_pl, format_history, format_number, goal_total, total_reps};
pub use model::{
    CardioEntry, CardioField, CardioMetric, Catalogs, DailyLog, ExerciseEntry, GoalScope,
    GoalTarget, Goals, LogStore, SetEntry, AVAILABLE_GROUPS, DEFAULT_GROUP,
};
pub use stats::{
    DailyProgress, DateRange, HeatLevel, HeatmapDay, PersonalRecord, Progress, SeriesPoint,
    SummaryMode, SummaryStats, WeekStats, WeeklyProgress,
};
pub use store::{get_db_path as get_db_path_util, DocumentKey, StoreError};
pub use sync_client::{HttpRemoteStore, RemoteStore, SyncScheduler};

/// Everything the journal knows at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Journal {
    pub catalogs: Catalogs,
    pub goals: Goals,
    pub logs: LogStore,
}

impl Journal {
    /// Builds a journal from stored documents; missing ones fall back to defaults.
    pub fn from_documents<F>(mut fetch: F) -> Self
    where
        F: FnMut(DocumentKey) -> Option<Value>,
    {
        let defaults = Catalogs::default();
        let catalogs = Catalogs {
            exercises: fetch(DocumentKey::Exercises)
                .map_or(defaults.exercises, |v| model::name_list_from_json(&v)),
            cardio: fetch(DocumentKey::Cardio).map_or(defaults.cardio, |v| model::name_list_from_json(&v)),
            exercise_groups: fetch(DocumentKey::ExerciseGroups)
                .map_or(defaults.exercise_groups, |v| model::group_map_from_json(&v)),
        };
        Self {
            catalogs,
            goals: fetch(DocumentKey::Goals).map_or_else(Goals::default, |v| Goals::from_json(&v)),
            logs: fetch(DocumentKey::Logs).map_or_else(LogStore::new, |v| LogStore::from_json(&v)),
        }
    }

    /// Serializes one document of the journal.
    /// # Errors
    /// Returns `serde_json::Error` if serialization fails.
    pub fn document(&self, key: DocumentKey) -> Result<Value, serde_json::Error> {
        match key {
            DocumentKey::Exercises => serde_json::to_value(&self.catalogs.exercises),
            DocumentKey::ExerciseGroups => serde_json::to_value(&self.catalogs.exercise_groups),
            DocumentKey::Cardio => serde_json::to_value(&self.catalogs.cardio),
            DocumentKey::Goals => self.goals.to_json(),
            DocumentKey::Logs => self.logs.to_json(),
        }
    }
}

pub struct AppService {
    pub config: Config,
    pub conn: Connection,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    journal: Journal,
    sync: Option<SyncScheduler>,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;
        Self::open(config, config_path)
    }

    /// Opens the default database with an already loaded config.
    /// # Errors
    /// Returns `anyhow::Error` if the database can't be located, opened or read.
    pub fn open(config: Config, config_path: PathBuf) -> Result<Self> {
        let db_path = store::get_db_path().context("Failed to determine database path")?;
        let conn = store::open_db(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        Self::with_connection(config, conn, db_path, config_path)
    }

    /// Builds a service around an already open connection (e.g. in-memory).
    /// # Errors
    /// Returns `anyhow::Error` if the schema can't be created or documents can't be read.
    pub fn with_connection(
        config: Config,
        conn: Connection,
        db_path: PathBuf,
        config_path: PathBuf,
    ) -> Result<Self> {
        store::init_db(&conn).context("Failed to initialize database schema")?;
        let journal = load_journal(&conn);
        info!(
            "Loaded journal: {} day(s), {} exercise(s), {} cardio type(s)",
            journal.logs.len(),
            journal.catalogs.exercises.len(),
            journal.catalogs.cardio.len()
        );
        Ok(Self {
            config,
            conn,
            db_path,
            config_path,
            journal,
            sync: None,
        })
    }

    /// Connects remote sync as described by the config's `[sync]` section.
    /// Returns whether sync is now attached.
    /// # Errors
    /// Returns `ConfigError::SyncSettingMissing` if sync is enabled but incomplete.
    pub fn attach_sync_from_config(&mut self) -> Result<bool, ConfigError> {
        let Some(settings) = self.config.sync.settings()? else {
            return Ok(false);
        };
        let remote = HttpRemoteStore::new(
            settings.server_url,
            settings.api_key.to_string(),
            settings.access_token.to_string(),
            settings.user_id.to_string(),
        );
        let debounce = Duration::from_millis(self.config.sync.debounce_ms);
        self.attach_sync(SyncScheduler::new(Arc::new(remote), debounce));
        Ok(true)
    }

    pub fn attach_sync(&mut self, scheduler: SyncScheduler) {
        self.sync = Some(scheduler);
    }

    #[must_use]
    pub const fn sync(&self) -> Option<&SyncScheduler> {
        self.sync.as_ref()
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    #[must_use]
    pub const fn logs(&self) -> &LogStore {
        &self.journal.logs
    }

    #[must_use]
    pub const fn goals(&self) -> &Goals {
        &self.journal.goals
    }

    #[must_use]
    pub const fn catalogs(&self) -> &Catalogs {
        &self.journal.catalogs
    }

    // --- Config ---

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets how many days the chart shows by default.
    /// # Errors
    /// - `ConfigError::InvalidChartRange` if `days` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_chart_range_days(&mut self, days: u32) -> Result<(), ConfigError> {
        if days == 0 {
            return Err(ConfigError::InvalidChartRange);
        }
        self.config.chart_range_days = days;
        self.save_config()
    }

    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_default_summary_mode(&mut self, mode: SummaryMode) -> Result<(), ConfigError> {
        self.config.default_summary_mode = mode;
        self.save_config()
    }

    /// # Errors
    /// - `ConfigError::InvalidColor` if the name isn't a known color.
    /// - `ConfigError` variants if saving fails.
    pub fn set_header_color(&mut self, color: &str) -> Result<(), ConfigError> {
        let parsed = config::parse_color(color)?;
        self.config.theme.header_color = format!("{parsed:?}");
        self.save_config()
    }

    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.config.dark_mode = enabled;
        self.save_config()
    }

    // --- Persistence ---

    /// Saves `keys` of `next` locally in one transaction, then makes `next`
    /// the current journal and queues the keys for remote sync.
    /// On error nothing is written and the current journal is untouched.
    fn commit(&mut self, next: Journal, keys: &[DocumentKey]) -> Result<()> {
        let mut documents = Vec::with_capacity(keys.len());
        for &key in keys {
            let value = next
                .document(key)
                .with_context(|| format!("Failed to serialize '{}'", key.as_str()))?;
            documents.push((key, value));
        }
        write_documents(&self.conn, &documents)?;

        self.journal = next;
        if let Some(sync) = &self.sync {
            for (key, value) in documents {
                sync.schedule(key.as_str(), value);
            }
        }
        Ok(())
    }

    fn edit_day<F>(&mut self, date: NaiveDate, edit: F) -> Result<()>
    where
        F: FnOnce(&mut DailyLog),
    {
        let next = Journal {
            catalogs: self.journal.catalogs.clone(),
            goals: self.journal.goals.clone(),
            logs: self.journal.logs.with_day(date, edit),
        };
        self.commit(next, &[DocumentKey::Logs])
    }

    /// When a document was last written locally, if ever.
    /// # Errors
    /// Returns `anyhow::Error` if the store can't be read.
    pub fn last_saved(&self, key: DocumentKey) -> Result<Option<DateTime<Utc>>> {
        store::last_edited(&self.conn, key)
            .with_context(|| format!("Failed to read save time of '{}'", key.as_str()))
    }

    /// Replaces local documents with whatever the remote holds.
    /// Keys missing remotely (or failing to fetch) keep their local value.
    /// # Errors
    /// Returns `anyhow::Error` if sync isn't attached or a local write fails.
    pub async fn pull_remote(&mut self) -> Result<usize> {
        let Some(sync) = &self.sync else {
            bail!("Remote sync is not configured. Enable it in the [sync] section of the config.");
        };
        let mut fetched = Vec::new();
        for key in DocumentKey::iter() {
            if let Some(value) = sync.fetch(key.as_str()).await {
                fetched.push((key, value));
            }
        }
        write_documents(&self.conn, &fetched)?;
        self.journal = load_journal(&self.conn);
        info!("Pulled {} document(s) from remote", fetched.len());
        Ok(fetched.len())
    }

    /// Queues every document for upload and waits until they're sent.
    /// # Errors
    /// Returns `anyhow::Error` if sync isn't attached or serialization fails.
    pub async fn push_all(&self) -> Result<usize> {
        let Some(sync) = &self.sync else {
            bail!("Remote sync is not configured. Enable it in the [sync] section of the config.");
        };
        let mut count = 0;
        for key in DocumentKey::iter() {
            let value = self
                .journal
                .document(key)
                .with_context(|| format!("Failed to serialize '{}'", key.as_str()))?;
            sync.schedule(key.as_str(), value);
            count += 1;
        }
        sync.flush().await;
        Ok(count)
    }

    /// Sends any writes still waiting on their debounce.
    pub async fn flush_sync(&self) {
        if let Some(sync) = &self.sync {
            sync.flush().await;
        }
    }

    // --- Daily log edits ---

    /// Sets (or clears, with `None`) the body weight for a day.
    /// # Errors
    /// Returns `anyhow::Error` if saving fails.
    pub fn set_weight(&mut self, date: NaiveDate, weight: Option<f64>) -> Result<()> {
        let weight = weight.filter(|w| w.is_finite());
        self.edit_day(date, |day| day.weight = weight)
    }

    /// Sets (or clears) one body measurement in cm.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or saving fails.
    pub fn set_measurement(&mut self, date: NaiveDate, name: &str, value: Option<f64>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Measurement name cannot be empty.");
        }
        let value = value.filter(|v| v.is_finite());
        self.edit_day(date, |day| match value {
            Some(v) => {
                day.measurements.insert(name.to_string(), v);
            }
            None => {
                day.measurements.remove(name);
            }
        })
    }

    /// Stores an exercise result for a day, replacing any previous one.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or saving fails.
    pub fn set_exercise(&mut self, date: NaiveDate, name: &str, entry: ExerciseEntry) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        if !self.journal.catalogs.exercises.iter().any(|e| e == name) {
            warn!("Logging '{}', which is not in the exercise catalog", name);
        }
        let entry = entry.cleaned();
        debug!("Setting {} on {}: {}", name, date, format_history(Some(&entry)));
        self.edit_day(date, |day| {
            day.exercises.insert(name.to_string(), entry);
        })
    }

    /// Removes an exercise result from a day. Returns whether anything was removed.
    /// # Errors
    /// Returns `anyhow::Error` if saving fails.
    pub fn clear_exercise(&mut self, date: NaiveDate, name: &str) -> Result<bool> {
        let present = self
            .journal
            .logs
            .get(date)
            .is_some_and(|day| day.exercises.contains_key(name));
        if !present {
            return Ok(false);
        }
        self.edit_day(date, |day| {
            day.exercises.remove(name);
        })?;
        Ok(true)
    }

    /// Sets (or clears) one field of a cardio entry for a day.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or saving fails.
    pub fn set_cardio_field(
        &mut self,
        date: NaiveDate,
        name: &str,
        field: CardioField,
        value: Option<f64>,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Cardio name cannot be empty.");
        }
        let value = value.filter(|v| v.is_finite());
        self.edit_day(date, |day| {
            day.cardio.entry(name.to_string()).or_default().set(field, value);
        })
    }

    /// Copies exercises and cardio from the most recent earlier workout into `date`.
    /// Returns the date that was copied.
    /// # Errors
    /// Returns `anyhow::Error` if there's no earlier workout or saving fails.
    pub fn copy_last_workout(&mut self, date: NaiveDate) -> Result<NaiveDate> {
        let Some(source_date) = stats::last_workout_before(&self.journal.logs, date) else {
            bail!("No earlier workout found to copy.");
        };
        let Some(source) = self.journal.logs.get(source_date).cloned() else {
            bail!("Workout from {source_date} vanished before copying.");
        };
        self.edit_day(date, |day| {
            day.exercises = source.exercises;
            day.cardio = source.cardio;
        })?;
        info!("Copied workout from {} to {}", source_date, date);
        Ok(source_date)
    }

    // --- Catalog edits ---

    /// Adds an exercise to the catalog, with an optional muscle group.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or already present, or saving fails.
    pub fn add_exercise(&mut self, name: &str, group: Option<&str>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        if self.journal.catalogs.exercises.iter().any(|e| e == name) {
            bail!("Exercise '{name}' already exists.");
        }
        let group = match group.map(str::trim).filter(|g| !g.is_empty()) {
            Some(g) => known_group(g)?,
            None => DEFAULT_GROUP,
        };

        let mut next = self.journal.clone();
        next.catalogs.exercises.push(name.to_string());
        next.catalogs
            .exercise_groups
            .insert(name.to_string(), group.to_string());
        self.commit(next, &[DocumentKey::Exercises, DocumentKey::ExerciseGroups])
    }

    /// Removes an exercise from the catalog. Logged history is kept.
    /// # Errors
    /// Returns `anyhow::Error` if the exercise isn't cataloged or saving fails.
    pub fn remove_exercise(&mut self, name: &str) -> Result<()> {
        if !self.journal.catalogs.exercises.iter().any(|e| e == name) {
            bail!("Exercise '{name}' not found in catalog.");
        }
        let mut next = self.journal.clone();
        next.catalogs.exercises.retain(|e| e != name);
        self.commit(next, &[DocumentKey::Exercises])
    }

    /// Assigns a muscle group to an exercise.
    /// # Errors
    /// Returns `anyhow::Error` if the exercise isn't cataloged, the group is
    /// unknown, or saving fails.
    pub fn set_exercise_group(&mut self, name: &str, group: &str) -> Result<()> {
        if !self.journal.catalogs.exercises.iter().any(|e| e == name) {
            bail!("Exercise '{name}' not found in catalog.");
        }
        let group = group.trim();
        if group.is_empty() {
            bail!("Group name cannot be empty.");
        }
        let group = known_group(group)?;
        let mut next = self.journal.clone();
        next.catalogs
            .exercise_groups
            .insert(name.to_string(), group.to_string());
        self.commit(next, &[DocumentKey::ExerciseGroups])
    }

    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or already present, or saving fails.
    pub fn add_cardio(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Cardio name cannot be empty.");
        }
        if self.journal.catalogs.cardio.iter().any(|c| c == name) {
            bail!("Cardio '{name}' already exists.");
        }
        let mut next = self.journal.clone();
        next.catalogs.cardio.push(name.to_string());
        self.commit(next, &[DocumentKey::Cardio])
    }

    /// Removes a cardio activity from the catalog. Logged history is kept.
    /// # Errors
    /// Returns `anyhow::Error` if the activity isn't cataloged or saving fails.
    pub fn remove_cardio(&mut self, name: &str) -> Result<()> {
        if !self.journal.catalogs.cardio.iter().any(|c| c == name) {
            bail!("Cardio '{name}' not found in catalog.");
        }
        let mut next = self.journal.clone();
        next.catalogs.cardio.retain(|c| c != name);
        self.commit(next, &[DocumentKey::Cardio])
    }

    // --- Goal edits ---

    /// Sets (or clears, with `None`) an exercise goal.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or saving fails.
    pub fn set_goal(&mut self, scope: GoalScope, name: &str, target: Option<GoalTarget>) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Goal name cannot be empty.");
        }
        let mut next = self.journal.clone();
        let goals = next.goals.scope_mut(scope);
        match target {
            Some(t) => {
                goals.insert(name.to_string(), t);
            }
            None => {
                goals.remove(name);
            }
        }
        self.commit(next, &[DocumentKey::Goals])
    }

    /// Sets (or clears) a cardio km/time goal.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or saving fails.
    pub fn set_cardio_goal(
        &mut self,
        scope: GoalScope,
        cardio: &str,
        metric: CardioMetric,
        value: Option<f64>,
    ) -> Result<()> {
        let cardio = cardio.trim();
        if cardio.is_empty() {
            bail!("Cardio name cannot be empty.");
        }
        let key = model::cardio_goal_key(cardio, metric);
        self.set_goal(scope, &key, value.map(GoalTarget::Total))
    }

    /// Removes a goal. Returns whether one was set.
    /// # Errors
    /// Returns `anyhow::Error` if saving fails.
    pub fn clear_goal(&mut self, scope: GoalScope, name: &str) -> Result<bool> {
        let mut next = self.journal.clone();
        if next.goals.scope_mut(scope).remove(name).is_none() {
            return Ok(false);
        }
        self.commit(next, &[DocumentKey::Goals])?;
        Ok(true)
    }

    // --- Aggregations over the current snapshot ---

    #[must_use]
    pub fn week_stats(&self, date: NaiveDate) -> WeekStats {
        stats::week_stats(&self.journal.logs, date)
    }

    #[must_use]
    pub fn summary(&self, date: NaiveDate, mode: SummaryMode) -> SummaryStats {
        stats::summary_stats(&self.journal.logs, date, mode)
    }

    #[must_use]
    pub fn series(&self, start: NaiveDate, end: NaiveDate) -> Vec<SeriesPoint> {
        stats::build_series(&self.journal.logs, start, end)
    }

    #[must_use]
    pub fn history(&self, start: NaiveDate, end: NaiveDate) -> Vec<SeriesPoint> {
        stats::history(&self.journal.logs, &self.journal.catalogs.exercises, start, end)
    }

    #[must_use]
    pub fn personal_records(&self) -> BTreeMap<String, PersonalRecord> {
        stats::personal_records(&self.journal.logs, &self.journal.catalogs.exercises)
    }

    #[must_use]
    pub fn month_heatmap(&self, year: i32, month: u32) -> Vec<HeatmapDay> {
        stats::month_heatmap(&self.journal.logs, &self.journal.goals, year, month)
    }

    #[must_use]
    pub fn weekly_goal_progress(&self, date: NaiveDate) -> WeeklyProgress {
        stats::weekly_goal_progress(
            &self.journal.logs,
            &self.journal.goals,
            &self.journal.catalogs,
            date,
        )
    }

    #[must_use]
    pub fn daily_goal_progress(&self, date: NaiveDate) -> DailyProgress {
        stats::daily_goal_progress(
            &self.journal.logs,
            &self.journal.goals,
            &self.journal.catalogs,
            date,
        )
    }

    /// Default chart window: the configured number of days ending at `end`.
    #[must_use]
    pub fn default_chart_range(&self, end: NaiveDate) -> DateRange {
        let back = u64::from(self.config.chart_range_days.saturating_sub(1));
        let start = end.checked_sub_days(chrono::Days::new(back)).unwrap_or(end);
        DateRange::new(start, end)
    }
}

// --- Helper Functions ---

/// Writes documents in a single transaction: either all land or none do.
fn write_documents(conn: &Connection, documents: &[(DocumentKey, Value)]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start local write")?;
    for (key, value) in documents {
        store::save_document(&tx, *key, value)
            .with_context(|| format!("Failed to save '{}' locally", key.as_str()))?;
    }
    tx.commit().context("Failed to commit local write")
}

/// Resolves a muscle group name (any case) to its catalog spelling.
fn known_group(group: &str) -> Result<&'static str> {
    let Some(known) = model::canonical_group(group) else {
        bail!(
            "Unknown muscle group '{group}'. Choose one of: {}.",
            AVAILABLE_GROUPS.join(", ")
        );
    };
    Ok(known)
}

/// Reads every document from the local store. Unreadable documents are
/// logged and replaced by their defaults.
fn load_journal(conn: &Connection) -> Journal {
    Journal::from_documents(|key| match store::load_document(conn, key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring stored '{}': {}", key.as_str(), e);
            None
        }
    })
}
