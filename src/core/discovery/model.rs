use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::binary::BinaryArch;

/// Launcher a game was found through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Steam,
    EpicGames,
    MicrosoftStore,
    Manual,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Steam => "Steam",
            SourceKind::EpicGames => "Epic Games",
            SourceKind::MicrosoftStore => "Microsoft Store",
            SourceKind::Manual => "Manual",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Bitness of a game's native player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86,
    X64,
    /// Confirmed Unity, bitness undetermined.
    UnityUnknown,
    Unknown,
}

impl From<BinaryArch> for Architecture {
    fn from(arch: BinaryArch) -> Self {
        match arch {
            BinaryArch::X86 => Architecture::X86,
            BinaryArch::X64 => Architecture::X64,
        }
    }
}

/// Which classification step produced the architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureEvidence {
    PlayerRuntime,
    EngineRuntime,
    Il2CppLayout,
    MonoLayout,
    Executable,
    DataMarker,
    None,
}

/// Human-readable platform string, e.g. `x64 (IL2CPP)`.
pub fn describe_architecture(arch: Architecture, evidence: ArchitectureEvidence) -> String {
    let base = match arch {
        Architecture::X86 => "x86",
        Architecture::X64 => "x64",
        Architecture::UnityUnknown => return "Unity (globalgamemanagers found)".to_string(),
        Architecture::Unknown => return "Unknown".to_string(),
    };
    match evidence {
        ArchitectureEvidence::Il2CppLayout => format!("{base} (IL2CPP)"),
        ArchitectureEvidence::MonoLayout => format!("{base} (Mono)"),
        ArchitectureEvidence::Executable => format!("{base} (from EXE)"),
        _ => base.to_string(),
    }
}

/// A directory a launcher source claims holds an installed game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCandidate {
    pub name: String,
    pub path: PathBuf,
}

impl GameCandidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// One discovered Unity game. Replaced, never mutated, on re-discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub name: String,
    pub install_path: PathBuf,
    pub architecture: Architecture,
    pub evidence: ArchitectureEvidence,
    pub source: SourceKind,
    pub framework_installed: bool,
}

impl GameRecord {
    pub fn platform_label(&self) -> String {
        describe_architecture(self.architecture, self.evidence)
    }
}

/// A per-entry problem swallowed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryWarning {
    pub source: SourceKind,
    pub path: PathBuf,
    pub reason: String,
}

impl DiscoveryWarning {
    pub fn new(source: SourceKind, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self {
            source,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.source, self.path.display(), self.reason)
    }
}

/// Result of one discovery pass, keyed by game name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCatalog {
    pub games: BTreeMap<String, GameRecord>,
    pub warnings: Vec<DiscoveryWarning>,
    pub scanned_at: DateTime<Utc>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self {
            games: BTreeMap::new(),
            warnings: Vec::new(),
            scanned_at: Utc::now(),
        }
    }

    /// Insert, replacing any earlier record of the same name.
    /// Returns the record that was replaced.
    pub fn insert(&mut self, record: GameRecord) -> Option<GameRecord> {
        self.games.insert(record.name.clone(), record)
    }

    pub fn get(&self, name: &str) -> Option<&GameRecord> {
        self.games.get(name)
    }

    /// Case-insensitive lookup by name, falling back to install path.
    pub fn find(&self, query: &str) -> Option<&GameRecord> {
        if let Some(record) = self.games.get(query) {
            return Some(record);
        }
        let lowered = query.to_lowercase();
        self.games
            .values()
            .find(|r| r.name.to_lowercase() == lowered)
            .or_else(|| {
                let path = Path::new(query);
                self.games.values().find(|r| r.install_path == path)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameRecord> {
        self.games.values()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self::new()
    }
}
