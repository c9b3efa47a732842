use std::path::{Path, PathBuf};

use tracing::debug;

use super::{GameSource, SourceScan};
use crate::core::discovery::model::{GameCandidate, SourceKind};

const XBOX_PACKAGE_PREFIX: &str = "Microsoft.XboxApp";

/// Microsoft Store / Xbox packages. `WindowsApps` entries are named by the
/// package folder up to its first underscore; Xbox `Packages` entries keep the
/// full folder name.
#[derive(Debug, Clone)]
pub struct MsStoreSource {
    windows_apps: Option<PathBuf>,
    packages: Option<PathBuf>,
}

impl MsStoreSource {
    pub fn new(windows_apps: Option<PathBuf>, packages: Option<PathBuf>) -> Self {
        Self {
            windows_apps,
            packages,
        }
    }

    pub fn locate() -> Self {
        if !cfg!(target_os = "windows") {
            return Self::new(None, None);
        }
        let windows_apps = std::env::var_os("PROGRAMFILES")
            .map(|p| PathBuf::from(p).join("WindowsApps"));
        let packages = dirs::data_local_dir().map(|p| p.join("Packages"));
        Self::new(windows_apps, packages)
    }

    fn scan_dir(
        &self,
        dir: &Path,
        filter: impl Fn(&str) -> bool,
        display_name: impl Fn(&str) -> &str,
        scan: &mut SourceScan,
    ) {
        if !dir.is_dir() {
            debug!("No package folder at {:?}", dir);
            return;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                // WindowsApps is ACL-protected for most users.
                scan.warn(SourceKind::MicrosoftStore, dir, e);
                return;
            }
        };

        let mut folders: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                filter(&name).then(|| (name, entry.path()))
            })
            .collect();
        folders.sort();

        for (folder, path) in folders {
            scan.push(GameCandidate::new(display_name(&folder), path));
        }
    }
}

impl GameSource for MsStoreSource {
    fn kind(&self) -> SourceKind {
        SourceKind::MicrosoftStore
    }

    fn scan(&self) -> SourceScan {
        let mut scan = SourceScan::empty();
        if let Some(dir) = &self.windows_apps {
            self.scan_dir(dir, |_| true, package_display_name, &mut scan);
        }
        if let Some(dir) = &self.packages {
            self.scan_dir(
                dir,
                |name| name.starts_with(XBOX_PACKAGE_PREFIX),
                |name| name,
                &mut scan,
            );
        }
        scan
    }
}

/// `Publisher.Game_1.0.0.0_x64__8wekyb3d8bbwe` -> `Publisher.Game`
pub fn package_display_name(folder: &str) -> &str {
    folder.split('_').next().unwrap_or(folder)
}
