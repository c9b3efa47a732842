// ─── Host platform ───
// Maps the running OS/CPU onto the naming used by BepInEx release assets
// (`BepInEx_<os>_<arch>_<version>.zip`).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::discovery::Architecture;
use crate::core::error::{ManagerError, ManagerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(platform_os(), platform_arch())
    }

    /// The host platform, narrowed to x86 when the game itself is 32-bit.
    pub fn for_game(architecture: Architecture) -> Self {
        let mut platform = Self::current();
        if architecture == Architecture::X86 {
            platform.arch = "x86".into();
        }
        platform
    }

    /// `win_x64`, the token asset names carry.
    pub fn token(&self) -> String {
        format!("{}_{}", self.os, self.arch)
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

pub fn platform_os() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win",
        "linux" => "linux",
        "macos" => "macos",
        other => other,
    }
}

pub fn platform_arch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "x64".to_string(),
        "x86" => "x86".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// Fail when the volume holding `path` has less than `minimum_bytes` free.
/// Unknown volumes pass.
pub fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> ManagerResult<()> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }

    match available {
        Some(bytes) if bytes < minimum_bytes => Err(ManagerError::InsufficientDiskSpace {
            path: path.to_path_buf(),
            available: bytes,
            required: minimum_bytes,
        }),
        _ => {
            debug!("Disk space check passed for {:?}", path);
            Ok(())
        }
    }
}

/// Fail when any running process was started from inside `game_dir`.
pub fn ensure_game_not_running(game_dir: &Path) -> ManagerResult<()> {
    let canonical = std::fs::canonicalize(game_dir).unwrap_or_else(|_| game_dir.to_path_buf());
    let mut system = sysinfo::System::new_all();
    system.refresh_all();
    let running = system
        .processes()
        .values()
        .filter_map(|process| process.exe())
        .find(|exe| exe.starts_with(&canonical));

    match running {
        Some(exe) => Err(ManagerError::GameRunning(exe.to_path_buf())),
        None => Ok(()),
    }
}
