//! Settings loading for the command-line front end.
//!
//! The scheduling core never reads files or the environment; this module
//! resolves a [`Settings`] value that callers then inject.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::srs::SchedulerParams;

// ==================== File Locations ====================

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "FLASHCARD_CONFIG";

/// Environment variable overriding the snapshot database path
pub const SNAPSHOT_DB_ENV: &str = "SNAPSHOT_DB_PATH";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Default SQLite file for stable due-count snapshots
pub const DEFAULT_SNAPSHOT_DB: &str = "data/snapshots.db";

// ==================== File Structure ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    scheduler: Option<SchedulerParams>,
    storage: Option<StorageConfig>,
}

#[derive(Debug, Deserialize)]
struct StorageConfig {
    snapshot_db: Option<String>,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub scheduler: SchedulerParams,
    pub snapshot_db: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerParams::default(),
            snapshot_db: PathBuf::from(DEFAULT_SNAPSHOT_DB),
        }
    }
}

/// Parse config.toml contents. `origin` is only used in error messages.
pub fn parse_settings(contents: &str, origin: &str) -> Result<Settings> {
    let config: AppConfig =
        toml::from_str(contents).map_err(|e| Error::Config(origin.to_string(), e.to_string()))?;

    let scheduler = config.scheduler.unwrap_or_default();
    scheduler.validate()?;

    let snapshot_db = config
        .storage
        .and_then(|s| s.snapshot_db)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DB));

    Ok(Settings {
        scheduler,
        snapshot_db,
    })
}

/// Load settings with priority: explicit path > FLASHCARD_CONFIG > ./config.toml > defaults.
///
/// `SNAPSHOT_DB_PATH` (also read from `.env`) overrides the snapshot database
/// location from any of those.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let required = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

    let mut settings = match required {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(path.display().to_string(), e.to_string()))?;
            tracing::info!("Using config from {}", path.display());
            parse_settings(&contents, &path.display().to_string())?
        }
        None => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(contents) => {
                tracing::info!("Using config from {}", DEFAULT_CONFIG_PATH);
                parse_settings(&contents, DEFAULT_CONFIG_PATH)?
            }
            Err(_) => {
                tracing::debug!("No {} found, using default settings", DEFAULT_CONFIG_PATH);
                Settings::default()
            }
        },
    };

    if let Ok(path) = std::env::var(SNAPSHOT_DB_ENV) {
        tracing::info!("Using snapshot database from {} env: {}", SNAPSHOT_DB_ENV, path);
        settings.snapshot_db = PathBuf::from(path);
    }

    Ok(settings)
}
