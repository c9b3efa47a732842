// ─── Framework installer ───
// Merges an extracted framework archive into a game directory:
//   1. unpack into a scratch dir
//   2. copy loader files found at the archive root into the game root
//   3. replace `BepInEx/` wholesale if the archive carries one
// The scratch dir and the archive are removed afterwards either way.
// A failed copy is not rolled back.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::extract::{extract_zip, ScratchDir};
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::layout::{FrameworkLayout, LOADER_FILES, PAYLOAD_DIR};

/// What an install actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub loader_files: Vec<String>,
    pub payload_replaced: bool,
}

/// What an uninstall removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveInstaller;

impl ArchiveInstaller {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self))]
    pub fn install(&self, archive: &Path, game_dir: &Path) -> ManagerResult<InstallReport> {
        let result = self.install_inner(archive, game_dir);

        if let Err(e) = std::fs::remove_file(archive) {
            warn!("Failed to remove archive {:?}: {}", archive, e);
        }

        match &result {
            Ok(report) => info!(
                "Installed into {:?}: {} loader files, payload replaced: {}",
                game_dir,
                report.loader_files.len(),
                report.payload_replaced
            ),
            Err(e) => warn!("Install into {:?} failed: {}", game_dir, e),
        }
        result
    }

    /// `install` on the blocking pool.
    pub async fn install_async(
        &self,
        archive: PathBuf,
        game_dir: PathBuf,
    ) -> ManagerResult<InstallReport> {
        let installer = *self;
        tokio::task::spawn_blocking(move || installer.install(&archive, &game_dir))
            .await
            .map_err(|e| ManagerError::Other(format!("install task failed: {e}")))?
    }

    fn install_inner(&self, archive: &Path, game_dir: &Path) -> ManagerResult<InstallReport> {
        let scratch = ScratchDir::create("extract")?;
        extract_zip(archive, scratch.path())?;

        let layout = FrameworkLayout::new(game_dir);
        let mut report = InstallReport::default();

        for name in LOADER_FILES {
            let from = scratch.path().join(name);
            if !from.is_file() {
                continue;
            }
            let to = game_dir.join(name);
            std::fs::copy(&from, &to).map_err(|e| ManagerError::install_io(&to, e))?;
            debug!("Copied loader file {}", name);
            report.loader_files.push(name.to_string());
        }

        let payload = scratch.path().join(PAYLOAD_DIR);
        if payload.is_dir() {
            let target = layout.payload_dir();
            if target.exists() {
                std::fs::remove_dir_all(&target)
                    .map_err(|e| ManagerError::install_io(&target, e))?;
            }
            copy_tree(&payload, &target)?;
            report.payload_replaced = true;
        } else {
            debug!("Archive has no {} directory; existing payload kept", PAYLOAD_DIR);
        }

        Ok(report)
    }

    /// Remove `BepInEx/` and every loader file from the game root.
    #[instrument(skip(self))]
    pub fn uninstall(&self, game_dir: &Path) -> ManagerResult<UninstallReport> {
        let layout = FrameworkLayout::new(game_dir);
        let mut report = UninstallReport::default();

        let payload = layout.payload_dir();
        if payload.is_dir() {
            std::fs::remove_dir_all(&payload)
                .map_err(|e| ManagerError::install_io(&payload, e))?;
            report.removed.push(payload);
        }

        for file in layout.loader_files() {
            if file.is_file() {
                std::fs::remove_file(&file).map_err(|e| ManagerError::install_io(&file, e))?;
                report.removed.push(file);
            }
        }

        info!("Uninstalled from {:?}: {} entries removed", game_dir, report.removed.len());
        Ok(report)
    }
}

/// Recursive copy, overwriting files that already exist in `to`.
fn copy_tree(from: &Path, to: &Path) -> ManagerResult<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            ManagerError::install_io(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|e| ManagerError::install_io(&dest, e))?;
        } else {
            std::fs::copy(entry.path(), &dest).map_err(|e| ManagerError::install_io(&dest, e))?;
        }
    }
    Ok(())
}
