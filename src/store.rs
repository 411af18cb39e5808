// src/store.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::debug;

/// The named JSON documents making up a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum DocumentKey {
    Exercises,
    ExerciseGroups,
    Cardio,
    Goals,
    Logs,
}

impl DocumentKey {
    /// Key under which the document is stored locally and remotely.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exercises => "gymbuddy_exercises",
            Self::ExerciseGroups => "gymbuddy_exercise_groups",
            Self::Cardio => "gymbuddy_cardio",
            Self::Goals => "gymbuddy_goals",
            Self::Logs => "gymbuddy_logs",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database write failed: {0}")]
    WriteFailed(rusqlite::Error),
    #[error("Stored document '{key}' is not valid JSON")]
    InvalidJson {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize document '{key}'")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

const DB_FILE_NAME: &str = "journal.sqlite";
const APP_DATA_DIR: &str = "gymbuddy";

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir().ok_or(StoreError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, StoreError> {
    Connection::open(path).map_err(StoreError::Connection)
}

/// Creates the document table if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,        -- JSON text
            last_edited TEXT NOT NULL   -- RFC3339
        )",
        [],
    )
    .map_err(StoreError::Connection)?;
    Ok(())
}

/// Loads a document. `Ok(None)` if it was never saved.
pub fn load_document(conn: &Connection, key: DocumentKey) -> Result<Option<Value>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM documents WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::QueryFailed)?;

    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| StoreError::InvalidJson {
            key: key.as_str(),
            source,
        })
    })
    .transpose()
}

/// Writes a document, replacing any previous version.
pub fn save_document(conn: &Connection, key: DocumentKey, value: &Value) -> Result<(), StoreError> {
    let text = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.as_str(),
        source,
    })?;
    conn.execute(
        "INSERT INTO documents (key, value, last_edited) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, last_edited = excluded.last_edited",
        params![key.as_str(), text, Utc::now().to_rfc3339()],
    )
    .map_err(StoreError::WriteFailed)?;
    debug!("Saved document '{}' ({} bytes)", key.as_str(), text.len());
    Ok(())
}

/// When a document was last written locally.
pub fn last_edited(conn: &Connection, key: DocumentKey) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT last_edited FROM documents WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::QueryFailed)?;
    Ok(raw
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| ts.with_timezone(&Utc)))
}
