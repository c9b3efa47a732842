// ─── Game process ───
// Finds the game's executable in its install root and starts it detached.
// The manager never waits on the game; a reaper thread collects its exit.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use tracing::{debug, info, warn};

use crate::core::error::{ManagerError, ManagerResult};

const CRASH_HANDLER_PREFIX: &str = "unitycrashhandler";

/// First top-level executable by name, skipping Unity's crash handler.
pub fn find_game_executable(game_dir: &Path) -> ManagerResult<PathBuf> {
    let entries = std::fs::read_dir(game_dir).map_err(|e| {
        ManagerError::LaunchFailure(format!("cannot read {}: {e}", game_dir.display()))
    })?;

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| Some((e.file_name().to_str()?.to_string(), e.path())))
        .collect();
    files.sort();

    let pick = |matches: fn(&str) -> bool| {
        files
            .iter()
            .find(|(name, _)| {
                let lower = name.to_ascii_lowercase();
                matches(&lower) && !lower.starts_with(CRASH_HANDLER_PREFIX)
            })
            .map(|(_, path)| path.clone())
    };

    pick(|n| n.ends_with(".exe"))
        .or_else(|| {
            if cfg!(target_os = "linux") {
                pick(|n| n.ends_with(".x86_64") || n.ends_with(".x86"))
            } else {
                None
            }
        })
        .ok_or_else(|| {
            ManagerError::LaunchFailure(format!("no executable in {}", game_dir.display()))
        })
}

/// Start `exe` with the game directory as its working directory.
/// Returns the child's pid.
pub fn launch_detached(exe: &Path) -> ManagerResult<u32> {
    let work_dir = exe.parent().unwrap_or_else(|| Path::new("."));

    let mut cmd = Command::new(exe);
    cmd.current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    configure_platform_spawn(&mut cmd);

    debug!("Command: {:?}", cmd);
    let mut child = cmd
        .spawn()
        .map_err(|e| ManagerError::LaunchFailure(format!("{}: {e}", exe.display())))?;
    let pid = child.id();
    info!("Launched {:?} (pid {})", exe, pid);

    std::thread::spawn(move || match child.wait() {
        Ok(status) => debug!("Game process {} exited: {}", pid, status),
        Err(e) => warn!("Failed waiting on game process {}: {}", pid, e),
    });

    Ok(pid)
}

/// Find and start the game in `game_dir`.
pub fn launch_game(game_dir: &Path) -> ManagerResult<u32> {
    let exe = find_game_executable(game_dir)?;
    launch_detached(&exe)
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = cmd;
    }
}
