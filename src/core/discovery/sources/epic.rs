use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{GameSource, SourceScan};
use crate::core::discovery::model::{GameCandidate, SourceKind};
use crate::core::discovery::registry;

/// The subset of an Epic `.item` manifest that locates a game.
#[derive(Debug, Deserialize)]
struct EpicManifest {
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
    #[serde(rename = "InstallLocation")]
    install_location: Option<String>,
}

/// Epic Games Launcher: JSON `.item` files under `<AppDataPath>/Manifests`.
#[derive(Debug, Clone)]
pub struct EpicSource {
    manifests_dir: Option<PathBuf>,
}

impl EpicSource {
    pub fn new(manifests_dir: Option<PathBuf>) -> Self {
        Self { manifests_dir }
    }

    pub fn locate() -> Self {
        Self::new(locate_manifests_dir())
    }

    fn read_manifest(path: &Path) -> Result<GameCandidate, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let manifest: EpicManifest =
            serde_json::from_str(&content).map_err(|e| format!("invalid manifest: {e}"))?;

        match (manifest.display_name, manifest.install_location) {
            (Some(name), Some(location)) if !name.is_empty() && !location.is_empty() => {
                Ok(GameCandidate::new(name, location))
            }
            _ => Err("missing DisplayName or InstallLocation".to_string()),
        }
    }
}

impl GameSource for EpicSource {
    fn kind(&self) -> SourceKind {
        SourceKind::EpicGames
    }

    fn scan(&self) -> SourceScan {
        let mut scan = SourceScan::empty();
        let Some(dir) = &self.manifests_dir else {
            debug!("Epic Games Launcher not installed");
            return scan;
        };
        if !dir.is_dir() {
            debug!("No Epic manifests folder at {:?}", dir);
            return scan;
        }

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                scan.warn(SourceKind::EpicGames, dir, e);
                return scan;
            }
        };

        let mut items: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("item"))
            .collect();
        items.sort();

        for item in items {
            match Self::read_manifest(&item) {
                Ok(candidate) if candidate.path.is_dir() => scan.push(candidate),
                Ok(candidate) => {
                    debug!("Epic game {} missing at {:?}", candidate.name, candidate.path)
                }
                Err(reason) => scan.warn(SourceKind::EpicGames, &item, reason),
            }
        }
        scan
    }
}

fn locate_manifests_dir() -> Option<PathBuf> {
    if !cfg!(target_os = "windows") {
        return None;
    }

    let app_data = registry::query_value(registry::EPIC_KEY, "AppDataPath")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("PROGRAMDATA")
                .map(|p| PathBuf::from(p).join("Epic").join("EpicGamesLauncher").join("Data"))
        })?;
    Some(app_data.join("Manifests"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_item_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        let manifests = tmp.path().join("Manifests");
        let game = tmp.path().join("Games/Hollow");
        fs::create_dir_all(&manifests).unwrap();
        fs::create_dir_all(&game).unwrap();

        let body = serde_json::json!({
            "DisplayName": "Hollow",
            "InstallLocation": game,
            "AppName": "abc123",
        });
        fs::write(manifests.join("A.item"), body.to_string()).unwrap();
        fs::write(manifests.join("notes.txt"), "ignored").unwrap();

        let scan = EpicSource::new(Some(manifests)).scan();
        assert_eq!(scan.candidates, vec![GameCandidate::new("Hollow", game)]);
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn bad_json_is_a_warning_not_a_failure() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("broken.item"), "{ not json").unwrap();
        fs::write(tmp.path().join("partial.item"), r#"{"DisplayName":"X"}"#).unwrap();

        let scan = EpicSource::new(Some(tmp.path().to_path_buf())).scan();
        assert!(scan.candidates.is_empty());
        assert_eq!(scan.warnings.len(), 2);
        assert!(scan
            .warnings
            .iter()
            .all(|w| w.source == SourceKind::EpicGames));
    }

    #[test]
    fn absent_launcher_yields_nothing() {
        let scan = EpicSource::new(None).scan();
        assert!(scan.candidates.is_empty());
        assert!(scan.warnings.is_empty());
    }
}
