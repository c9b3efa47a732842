use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{ManagerError, ManagerResult};
use crate::core::http::build_http_client;

const APP_DIR_NAME: &str = "BepInExManager";
const SETTINGS_FILE: &str = "manager_settings.json";

pub const DEFAULT_RELEASE_FEED: &str =
    "https://api.github.com/repos/BepInEx/BepInEx/releases/latest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            max_polls: 120,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ManagerSettings {
    pub release_feed_url: String,
    /// Game directories added by hand; scanned after every launcher source.
    pub manual_games: Vec<PathBuf>,
    pub monitor: MonitorSettings,
    pub min_free_disk_mb: u64,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            release_feed_url: DEFAULT_RELEASE_FEED.to_string(),
            manual_games: Vec::new(),
            monitor: MonitorSettings::default(),
            min_free_disk_mb: 256,
        }
    }
}

impl ManagerSettings {
    pub fn min_free_disk_bytes(&self) -> u64 {
        self.min_free_disk_mb * 1024 * 1024
    }

    /// Register a manual game directory; returns false if it was already known.
    pub fn add_manual_game(&mut self, path: PathBuf) -> bool {
        if self.manual_games.contains(&path) {
            return false;
        }
        self.manual_games.push(path);
        true
    }
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub http_client: Client,
    pub settings: ManagerSettings,
}

impl AppState {
    pub fn new() -> ManagerResult<Self> {
        Self::with_data_dir(default_data_dir())
    }

    pub fn with_data_dir(data_dir: PathBuf) -> ManagerResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(|e| ManagerError::io(&data_dir, e))?;
        let settings = load_settings_from_disk(&data_dir).unwrap_or_default();
        let http_client = build_http_client()?;

        Ok(Self {
            data_dir,
            http_client,
            settings,
        })
    }

    /// Scratch space for downloads and extraction.
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("downloads")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn save_settings(&self) -> ManagerResult<()> {
        let path = self.settings_path();
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&path, json).map_err(|e| ManagerError::io(path, e))
    }
}

fn load_settings_from_disk(data_dir: &Path) -> Option<ManagerSettings> {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Ignoring corrupt settings at {:?}: {}", path, e);
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
