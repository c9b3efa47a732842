use std::path::PathBuf;

use super::{GameSource, SourceScan};
use crate::core::discovery::model::{GameCandidate, SourceKind};

/// Directories the user added by hand. Scanned last, so they win any name
/// collision, and kept even without the Unity engine marker.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    paths: Vec<PathBuf>,
}

impl ManualSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl GameSource for ManualSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Manual
    }

    fn scan(&self) -> SourceScan {
        let mut scan = SourceScan::empty();
        for path in &self.paths {
            if !path.is_dir() {
                scan.warn(SourceKind::Manual, path, "directory no longer exists");
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            scan.push(GameCandidate::new(name, path.clone()));
        }
        scan
    }

    fn requires_engine_marker(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_come_from_folder_and_missing_paths_warn() {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("My Game");
        std::fs::create_dir_all(&game).unwrap();

        let source = ManualSource::new(vec![game.clone(), tmp.path().join("gone")]);
        let scan = source.scan();
        assert_eq!(scan.candidates, vec![GameCandidate::new("My Game", game)]);
        assert_eq!(scan.warnings.len(), 1);
        assert!(!source.requires_engine_marker());
    }
}
