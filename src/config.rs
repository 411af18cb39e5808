//src/config.rs
use crate::stats::SummaryMode;
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::warn;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "gymbuddy";
const CONFIG_ENV_VAR: &str = "GYMBUDDY_CONFIG_DIR"; // Environment variable name

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("Chart range must be at least one day.")]
    InvalidChartRange,
    #[error("Sync is enabled but '{0}' is not set in the [sync] section.")]
    SyncSettingMissing(&'static str),
}

// Define standard colors using strum for easy iteration/parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    DarkGrey,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    Grey,
}

// Helper to convert our enum to comfy_table::Color
impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Self::Black,
            StandardColor::Red => Self::Red,
            StandardColor::Green => Self::Green,
            StandardColor::Yellow => Self::Yellow,
            StandardColor::Blue => Self::Blue,
            StandardColor::Magenta => Self::Magenta,
            StandardColor::Cyan => Self::Cyan,
            StandardColor::White => Self::White,
            StandardColor::DarkGrey => Self::DarkGrey,
            StandardColor::DarkRed => Self::DarkRed,
            StandardColor::DarkGreen => Self::DarkGreen,
            StandardColor::DarkYellow => Self::DarkYellow,
            StandardColor::DarkBlue => Self::DarkBlue,
            StandardColor::DarkMagenta => Self::DarkMagenta,
            StandardColor::DarkCyan => Self::DarkCyan,
            StandardColor::Grey => Self::Grey,
        }
    }
}

impl StandardColor {
    /// Counterpart that stays readable on a dark terminal background.
    #[must_use]
    pub const fn for_dark_background(self) -> Self {
        match self {
            Self::Black | Self::DarkGrey => Self::Grey,
            Self::DarkRed => Self::Red,
            Self::DarkGreen => Self::Green,
            Self::DarkYellow => Self::Yellow,
            Self::DarkBlue => Self::Blue,
            Self::DarkMagenta => Self::Magenta,
            Self::DarkCyan => Self::Cyan,
            other => other,
        }
    }
}

/// Parses a color name (case-insensitive) into a `StandardColor`.
pub fn parse_color(color_str: &str) -> Result<StandardColor, Error> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str))
        .ok_or_else(|| Error::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Theme {
    pub header_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header_color: "Green".to_string(),
        }
    }
}

impl Theme {
    // Falls back to green on a bad name.
    fn header_standard(&self) -> StandardColor {
        parse_color(&self.header_color).unwrap_or_else(|e| {
            warn!("{}", e);
            StandardColor::Green
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: None,
            api_key: None,
            access_token: None,
            user_id: None,
            debounce_ms: 2000,
        }
    }
}

/// Connection settings for remote sync, all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings<'a> {
    pub server_url: &'a str,
    pub api_key: &'a str,
    pub access_token: &'a str,
    pub user_id: &'a str,
}

impl SyncConfig {
    /// Returns `Ok(None)` when sync is disabled.
    /// # Errors
    /// `Error::SyncSettingMissing` if sync is enabled but incomplete.
    pub fn settings(&self) -> Result<Option<SyncSettings<'_>>, Error> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(Some(SyncSettings {
            server_url: require(&self.server_url, "server_url")?,
            api_key: require(&self.api_key, "api_key")?,
            access_token: require(&self.access_token, "access_token")?,
            user_id: require(&self.user_id, "user_id")?,
        }))
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::SyncSettingMissing(name))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    pub dark_mode: bool,
    pub default_summary_mode: SummaryMode,
    pub chart_range_days: u32, // Default 7
    pub log_level: String,

    // Theming
    pub theme: Theme,

    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dark_mode: false,
            default_summary_mode: SummaryMode::Week,
            chart_range_days: 7,
            log_level: "warn".to_string(),
            theme: Theme::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Table header color with `dark_mode` applied.
    #[must_use]
    pub fn table_header_color(&self) -> Color {
        let color = self.theme.header_standard();
        if self.dark_mode {
            color.for_dark_background().into()
        } else {
            color.into()
        }
    }
}

/// Determines the path to the configuration file.
/// Exposed at crate root as `get_config_path_util`
pub fn get_config_path() -> Result<PathBuf, Error> {
    let config_dir_override = std::env::var(CONFIG_ENV_VAR).ok();

    let config_dir_path = if let Some(path_str) = config_dir_override {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            warn!(
                "Environment variable {} points to '{}', which is not a directory. Trying to create it.",
                CONFIG_ENV_VAR,
                path.display()
            );
            fs::create_dir_all(&path)?;
        }
        path
    } else {
        let base_config_dir = dirs::config_dir().ok_or(Error::CannotDetermineConfigDir)?;
        base_config_dir.join(APP_CONFIG_DIR)
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path.
/// Writes a default file first if none exists.
pub fn load(config_path: &Path) -> Result<Config, Error> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
pub fn save(config_path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
