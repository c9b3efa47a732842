use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the manager core.
/// Every module returns `Result<T, ManagerError>`.
#[derive(Debug, Error)]
pub enum ManagerError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Binary inspection ───────────────────────────────
    #[error("Malformed binary {path:?}: {reason}")]
    MalformedBinary { path: PathBuf, reason: String },

    // ── Release feed ────────────────────────────────────
    #[error("Release resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("No release asset matches {os}_{arch}")]
    NoMatchingAsset { os: String, arch: String },

    // ── Network ─────────────────────────────────────────
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Digest mismatch for {path:?}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Archive / install ───────────────────────────────
    #[error("Corrupt archive {path:?}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("Install failed at {path:?}: {source}")]
    InstallIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not enough disk space at {path:?}: available={available} required={required}")]
    InsufficientDiskSpace {
        path: PathBuf,
        available: u64,
        required: u64,
    },

    #[error("Game is running from {0:?}, close it first")]
    GameRunning(PathBuf),

    // ── Plugins ─────────────────────────────────────────
    #[error("Invalid plugin package name: {0:?}")]
    InvalidPackageName(String),

    #[error("Plugin file not found: {0:?}")]
    PluginNotFound(PathBuf),

    #[error("Both {active:?} and {disabled:?} exist")]
    PluginCollision { active: PathBuf, disabled: PathBuf },

    // ── Launch ──────────────────────────────────────────
    #[error("Launch failed: {0}")]
    LaunchFailure(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type ManagerResult<T> = Result<T, ManagerError>;

impl ManagerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManagerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn install_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManagerError::InstallIo {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt_archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ManagerError::CorruptArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for ManagerError {
    fn from(source: std::io::Error) -> Self {
        ManagerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for IPC callers ───────────────────────
impl serde::Serialize for ManagerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
