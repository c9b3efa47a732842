// ─── Game discovery ───
// Runs every launcher source in a fixed order, keeps Unity candidates, and
// classifies each one. Later sources overwrite earlier records of the same
// name. Nothing here aborts the pass; per-entry problems become warnings.

use std::path::Path;

use tracing::{debug, info, instrument};

use super::model::{GameCandidate, GameCatalog, GameRecord, SourceKind};
use super::sources::{EpicSource, GameSource, ManualSource, MsStoreSource, SteamSource};
use super::unity::GameTreeIndex;
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::layout::FrameworkLayout;
use crate::core::state::ManagerSettings;

pub struct GameDiscovery {
    sources: Vec<Box<dyn GameSource>>,
}

impl GameDiscovery {
    /// Sources are scanned in the given order; later wins on name collision.
    pub fn new(sources: Vec<Box<dyn GameSource>>) -> Self {
        Self { sources }
    }

    /// Steam, Epic Games, Microsoft Store, then manual entries from settings.
    pub fn for_host(settings: &ManagerSettings) -> Self {
        Self::new(vec![
            Box::new(SteamSource::locate()),
            Box::new(EpicSource::locate()),
            Box::new(MsStoreSource::locate()),
            Box::new(ManualSource::new(settings.manual_games.clone())),
        ])
    }

    #[instrument(skip(self))]
    pub fn discover(&self) -> GameCatalog {
        let mut catalog = GameCatalog::new();

        for source in &self.sources {
            let kind = source.kind();
            let scan = source.scan();
            debug!(
                "{}: {} candidates, {} warnings",
                kind,
                scan.candidates.len(),
                scan.warnings.len()
            );
            catalog.warnings.extend(scan.warnings);

            for candidate in scan.candidates {
                let Some(record) = classify_candidate(
                    &candidate,
                    kind,
                    source.requires_engine_marker(),
                ) else {
                    continue;
                };

                if let Some(previous) = catalog.insert(record) {
                    debug!(
                        "{} from {} replaced by {} entry",
                        previous.name, previous.source, kind
                    );
                }
            }
        }

        info!(
            "Discovery finished: {} games, {} warnings",
            catalog.len(),
            catalog.warnings.len()
        );
        catalog
    }

    /// `discover` on the blocking pool; every source walks the filesystem.
    pub async fn discover_async(self) -> ManagerResult<GameCatalog> {
        tokio::task::spawn_blocking(move || self.discover())
            .await
            .map_err(|e| ManagerError::Other(format!("discovery task failed: {e}")))
    }
}

/// Build a record for one candidate, or `None` when it is not a Unity game.
pub fn classify_candidate(
    candidate: &GameCandidate,
    source: SourceKind,
    require_engine_marker: bool,
) -> Option<GameRecord> {
    let index = GameTreeIndex::scan(&candidate.path);
    if require_engine_marker && !index.is_unity_game() {
        debug!("{} at {:?} is not a Unity game", candidate.name, candidate.path);
        return None;
    }

    let (architecture, evidence) = index.classify();
    Some(GameRecord {
        name: candidate.name.clone(),
        install_path: candidate.path.clone(),
        architecture,
        evidence,
        source,
        framework_installed: FrameworkLayout::new(&candidate.path).is_installed(),
    })
}

/// Classify a single directory the user points at, as the manual source would.
pub fn inspect_directory(path: &Path) -> ManagerResult<GameRecord> {
    if !path.is_dir() {
        return Err(ManagerError::Other(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let candidate = GameCandidate::new(name, path);
    classify_candidate(&candidate, SourceKind::Manual, false)
        .ok_or_else(|| ManagerError::Other("directory could not be classified".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::binary::pe::fake_pe;
    use crate::core::discovery::model::{Architecture, DiscoveryWarning};
    use crate::core::discovery::sources::SourceScan;
    use std::fs;
    use std::path::PathBuf;

    struct FixedSource {
        kind: SourceKind,
        candidates: Vec<GameCandidate>,
        warnings: Vec<DiscoveryWarning>,
    }

    impl GameSource for FixedSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn scan(&self) -> SourceScan {
            SourceScan {
                candidates: self.candidates.clone(),
                warnings: self.warnings.clone(),
            }
        }
    }

    fn unity_dir(root: &Path, name: &str, machine: u16) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("Game_Data/Managed")).unwrap();
        fs::write(dir.join("Game_Data/Managed/UnityEngine.dll"), b"stub").unwrap();
        fs::write(dir.join("UnityPlayer.dll"), fake_pe(machine)).unwrap();
        dir
    }

    #[test]
    fn later_source_wins_on_name_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let steam_copy = unity_dir(tmp.path(), "steam", 0x8664);
        let epic_copy = unity_dir(tmp.path(), "epic", 0x014c);

        let discovery = GameDiscovery::new(vec![
            Box::new(FixedSource {
                kind: SourceKind::Steam,
                candidates: vec![GameCandidate::new("Shared", steam_copy)],
                warnings: vec![],
            }),
            Box::new(FixedSource {
                kind: SourceKind::EpicGames,
                candidates: vec![GameCandidate::new("Shared", epic_copy.clone())],
                warnings: vec![],
            }),
        ]);

        let catalog = discovery.discover();
        assert_eq!(catalog.len(), 1);
        let record = catalog.get("Shared").unwrap();
        assert_eq!(record.source, SourceKind::EpicGames);
        assert_eq!(record.install_path, epic_copy);
        assert_eq!(record.architecture, Architecture::X86);
    }

    #[test]
    fn non_unity_candidates_are_dropped_and_warnings_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let unity = unity_dir(tmp.path(), "unity", 0x8664);
        let other = tmp.path().join("other");
        fs::create_dir_all(&other).unwrap();

        let discovery = GameDiscovery::new(vec![Box::new(FixedSource {
            kind: SourceKind::Steam,
            candidates: vec![
                GameCandidate::new("Unity", unity),
                GameCandidate::new("Other", other),
            ],
            warnings: vec![DiscoveryWarning::new(
                SourceKind::Steam,
                "/bad/appmanifest_1.acf",
                "unreadable",
            )],
        })]);

        let catalog = discovery.discover();
        assert!(catalog.get("Unity").is_some());
        assert!(catalog.get("Other").is_none());
        assert_eq!(catalog.warnings.len(), 1);
    }

    #[test]
    fn manual_directories_skip_the_engine_check() {
        let tmp = tempfile::tempdir().unwrap();
        let plain = tmp.path().join("Plain Game");
        fs::create_dir_all(plain.join("BepInEx")).unwrap();

        let discovery =
            GameDiscovery::new(vec![Box::new(ManualSource::new(vec![plain.clone()]))]);
        let catalog = discovery.discover();
        let record = catalog.get("Plain Game").unwrap();
        assert_eq!(record.source, SourceKind::Manual);
        assert_eq!(record.architecture, Architecture::Unknown);
        assert!(record.framework_installed);
    }

    #[test]
    fn steam_fixture_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let steamapps = tmp.path().join("steamapps");
        fs::create_dir_all(&steamapps).unwrap();
        fs::write(
            steamapps.join("appmanifest_42.acf"),
            "\"AppState\" { \"name\" \"Forty Two\" \"installdir\" \"FortyTwo\" }",
        )
        .unwrap();
        unity_dir(&steamapps.join("common"), "FortyTwo", 0x8664);

        let discovery = GameDiscovery::new(vec![Box::new(SteamSource::new(Some(
            tmp.path().to_path_buf(),
        )))]);
        let catalog = discovery.discover();
        let record = catalog.get("Forty Two").unwrap();
        assert_eq!(record.architecture, Architecture::X64);
        assert!(!record.framework_installed);
    }

    #[tokio::test]
    async fn async_discovery_runs_on_blocking_pool() {
        let catalog = GameDiscovery::new(vec![]).discover_async().await.unwrap();
        assert!(catalog.is_empty());
    }
}
