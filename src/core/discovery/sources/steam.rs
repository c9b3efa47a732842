use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::{GameSource, SourceScan};
use crate::core::discovery::model::{GameCandidate, SourceKind};
use crate::core::discovery::registry;

const WINDOWS_FALLBACK: &str = r"C:\Program Files (x86)\Steam";

fn library_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""path"\s+"([^"]+)""#).expect("valid regex"))
}

fn app_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""name"\s+"([^"]+)""#).expect("valid regex"))
}

fn install_dir_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""installdir"\s+"([^"]+)""#).expect("valid regex"))
}

/// Steam libraries: `steamapps/appmanifest_*.acf` in every library folder.
#[derive(Debug, Clone)]
pub struct SteamSource {
    root: Option<PathBuf>,
}

impl SteamSource {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Steam's install directory for this host.
    pub fn locate() -> Self {
        Self::new(locate_steam_root())
    }

    fn library_folders(&self, steamapps: &Path, scan: &mut SourceScan) -> Vec<PathBuf> {
        let mut libraries = vec![steamapps.to_path_buf()];
        let vdf_path = steamapps.join("libraryfolders.vdf");
        if !vdf_path.exists() {
            return libraries;
        }

        match std::fs::read_to_string(&vdf_path) {
            Ok(content) => {
                for path in parse_library_paths(&content) {
                    let library = path.join("steamapps");
                    if library.is_dir() && !libraries.contains(&library) {
                        libraries.push(library);
                    }
                }
            }
            Err(e) => scan.warn(SourceKind::Steam, &vdf_path, e),
        }
        libraries
    }

    fn scan_library(&self, library: &Path, scan: &mut SourceScan) {
        let entries = match std::fs::read_dir(library) {
            Ok(entries) => entries,
            Err(e) => {
                scan.warn(SourceKind::Steam, library, e);
                return;
            }
        };

        let mut manifests: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("appmanifest_") && n.ends_with(".acf"))
                    .unwrap_or(false)
            })
            .collect();
        manifests.sort();

        for manifest in manifests {
            let content = match std::fs::read_to_string(&manifest) {
                Ok(content) => content,
                Err(e) => {
                    scan.warn(SourceKind::Steam, &manifest, e);
                    continue;
                }
            };

            let Some((name, install_dir)) = parse_app_manifest(&content) else {
                scan.warn(SourceKind::Steam, &manifest, "missing name or installdir");
                continue;
            };

            let game_path = library.join("common").join(install_dir);
            if game_path.is_dir() {
                scan.push(GameCandidate::new(name, game_path));
            } else {
                debug!("Steam app {} has no install dir at {:?}", name, game_path);
            }
        }
    }
}

impl GameSource for SteamSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Steam
    }

    fn scan(&self) -> SourceScan {
        let mut scan = SourceScan::empty();
        let Some(root) = &self.root else {
            debug!("Steam not installed");
            return scan;
        };

        let steamapps = root.join("steamapps");
        if !steamapps.is_dir() {
            debug!("No steamapps folder under {:?}", root);
            return scan;
        }

        for library in self.library_folders(&steamapps, &mut scan) {
            self.scan_library(&library, &mut scan);
        }
        scan
    }
}

/// Library roots listed in `libraryfolders.vdf`. VDF escapes backslashes.
pub fn parse_library_paths(vdf: &str) -> Vec<PathBuf> {
    library_path_re()
        .captures_iter(vdf)
        .map(|caps| PathBuf::from(caps[1].replace(r"\\", r"\")))
        .collect()
}

/// `(name, installdir)` from an `appmanifest_*.acf`.
pub fn parse_app_manifest(acf: &str) -> Option<(String, String)> {
    let name = app_name_re().captures(acf)?[1].to_string();
    let install_dir = install_dir_re().captures(acf)?[1].to_string();
    Some((name, install_dir))
}

fn locate_steam_root() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        let path = registry::query_value(registry::STEAM_KEY, "InstallPath")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(WINDOWS_FALLBACK));
        return Some(path);
    }

    let home = dirs::home_dir()?;
    if cfg!(target_os = "macos") {
        return Some(home.join("Library/Application Support/Steam"));
    }

    [home.join(".local/share/Steam"), home.join(".steam/steam")]
        .into_iter()
        .find(|p| p.is_dir())
}
