// ─── Plugin packages ───
// A package is a folder under `BepInEx/plugins`; its libraries are toggled by
// renaming to and from `.bak`. Nothing is cached, every call reads the disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use super::model::{
    is_library_name, toggled_file_name, PackageInstallReport, PluginFile, PluginListing,
    PluginPackage,
};
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::installer::{extract_zip, ScratchDir};
use crate::core::layout::FrameworkLayout;

pub struct PluginManager {
    plugins_dir: PathBuf,
}

impl PluginManager {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
        }
    }

    pub fn for_game(game_dir: &Path) -> Self {
        Self::new(FrameworkLayout::new(game_dir).plugins_dir())
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    // ── Listing ─────────────────────────────────────────

    pub fn list_packages(&self) -> ManagerResult<PluginListing> {
        if !self.plugins_dir.is_dir() {
            return Ok(PluginListing::Empty);
        }

        let mut packages = Vec::new();
        for entry in read_dir_sorted(&self.plugins_dir)? {
            if !entry.is_dir() {
                continue;
            }
            let Some(folder_name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let entries = match read_dir_sorted(&entry) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping unreadable package {:?}: {}", entry, e);
                    continue;
                }
            };
            let files = entries
                .iter()
                .filter(|p| p.is_file())
                .filter_map(|p| p.file_name()?.to_str().and_then(PluginFile::from_disk_name))
                .collect();
            packages.push(PluginPackage {
                folder_name: folder_name.to_string(),
                path: entry.clone(),
                files,
            });
        }

        if packages.is_empty() {
            Ok(PluginListing::Empty)
        } else {
            Ok(PluginListing::Packages(packages))
        }
    }

    // ── Install ─────────────────────────────────────────

    /// Add libraries to `<plugins>/<name>`, creating the folder if needed.
    /// Loose libraries are copied as-is; zip archives contribute every
    /// library inside them, flattened, with `stem_N.dll` on collision.
    #[instrument(skip(self, sources))]
    pub fn install_package(
        &self,
        name: &str,
        sources: &[PathBuf],
    ) -> ManagerResult<PackageInstallReport> {
        validate_package_name(name)?;
        let package_dir = self.plugins_dir.join(name);
        std::fs::create_dir_all(&package_dir).map_err(|e| ManagerError::io(&package_dir, e))?;

        let mut report = PackageInstallReport::default();
        for source in sources {
            let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
                report.warnings.push(format!("{}: not a file", source.display()));
                continue;
            };
            if !source.is_file() {
                report.warnings.push(format!("{}: not found", source.display()));
                continue;
            }

            if is_library_name(file_name) {
                let dest = direct_target(&package_dir, file_name);
                match std::fs::copy(source, &dest) {
                    Ok(_) => report.placed.push(dest),
                    Err(e) => {
                        warn!("Cannot copy {:?} to {:?}: {}", source, dest, e);
                        report.warnings.push(format!("{}: {e}", source.display()));
                    }
                }
            } else if is_zip_name(file_name) {
                let mut placed = Vec::new();
                let result = self.install_from_zip(source, &package_dir, &mut placed);
                if let Err(e) = result {
                    warn!("Skipping archive {:?}: {}", source, e);
                    report.warnings.push(format!("{}: {e}", source.display()));
                } else if placed.is_empty() {
                    warn!("No libraries in {:?}", source);
                    report
                        .warnings
                        .push(format!("{}: no .dll files in archive", source.display()));
                }
                report.placed.extend(placed);
            } else {
                report
                    .warnings
                    .push(format!("{}: unsupported file type", source.display()));
            }
        }

        info!(
            "Package {}: {} files placed, {} warnings",
            name,
            report.placed.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Libraries copied before a failure are still pushed to `placed`.
    fn install_from_zip(
        &self,
        archive: &Path,
        package_dir: &Path,
        placed: &mut Vec<PathBuf>,
    ) -> ManagerResult<()> {
        let scratch = ScratchDir::create("plugin")?;
        extract_zip(archive, scratch.path())?;

        let mut libraries: Vec<PathBuf> = WalkDir::new(scratch.path())
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_str().map(is_library_name).unwrap_or(false))
            .map(|e| e.into_path())
            .collect();
        libraries.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));

        for library in libraries {
            let Some(file_name) = library.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let dest = unique_target(package_dir, file_name);
            std::fs::copy(&library, &dest).map_err(|e| ManagerError::io(&dest, e))?;
            debug!("Placed {:?}", dest);
            placed.push(dest);
        }
        Ok(())
    }

    // ── Enable / disable ────────────────────────────────

    /// Rename `file` inside `package` to match `enabled`. `file` may be given
    /// with or without the `.bak` suffix. Already in that state: no-op.
    #[instrument(skip(self))]
    pub fn set_enabled(&self, package: &str, file: &str, enabled: bool) -> ManagerResult<PluginFile> {
        validate_package_name(package)?;
        validate_file_name(file)?;
        let package_dir = self.plugins_dir.join(package);
        let logical = toggled_file_name(file, true);

        let active = package_dir.join(&logical);
        let disabled = package_dir.join(toggled_file_name(&logical, false));

        let current_enabled = match (active.is_file(), disabled.is_file()) {
            (true, true) => {
                return Err(ManagerError::PluginCollision { active, disabled });
            }
            (true, false) => true,
            (false, true) => false,
            (false, false) => return Err(ManagerError::PluginNotFound(active)),
        };

        if current_enabled != enabled {
            let (from, to) = if enabled {
                (&disabled, &active)
            } else {
                (&active, &disabled)
            };
            std::fs::rename(from, to).map_err(|e| ManagerError::io(from, e))?;
            info!("{} {}/{}", if enabled { "Enabled" } else { "Disabled" }, package, logical);
        } else {
            debug!("{}/{} already in requested state", package, logical);
        }

        Ok(PluginFile {
            file_name: logical,
            enabled,
        })
    }
}

fn validate_package_name(name: &str) -> ManagerResult<()> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed != name
        || name.contains(['/', '\\', ':']);
    if invalid {
        return Err(ManagerError::InvalidPackageName(name.to_string()));
    }
    Ok(())
}

/// A plugin file is addressed by a bare name inside its package.
fn validate_file_name(name: &str) -> ManagerResult<()> {
    let single = Path::new(name)
        .file_name()
        .map(|n| n == std::ffi::OsStr::new(name))
        .unwrap_or(false);
    if !single || name.contains(['/', '\\', ':']) {
        return Err(ManagerError::PluginNotFound(PathBuf::from(name)));
    }
    Ok(())
}

fn is_zip_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".zip")
}

/// Where a loose library lands: over the active copy, or over the disabled
/// copy when only that exists, so a file never has both forms.
fn direct_target(dir: &Path, file_name: &str) -> PathBuf {
    let disabled = dir.join(toggled_file_name(file_name, false));
    if !dir.join(file_name).exists() && disabled.exists() {
        return disabled;
    }
    dir.join(file_name)
}

/// First free name among `name`, `stem_1.ext`, `stem_2.ext`... A name counts
/// as taken when either its active or disabled form exists.
fn unique_target(dir: &Path, file_name: &str) -> PathBuf {
    let taken = |name: &str| {
        dir.join(name).exists() || dir.join(toggled_file_name(name, false)).exists()
    };
    if !taken(file_name) {
        return dir.join(file_name);
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };
    let mut counter = 1u32;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if !taken(&candidate) {
            return dir.join(candidate);
        }
        counter += 1;
    }
}

fn read_dir_sorted(dir: &Path) -> ManagerResult<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ManagerError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}
