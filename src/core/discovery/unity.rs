// ─── Unity detection ───
// A single tree walk per candidate collects every marker the classification
// steps need. Symlinks are not followed, so link cycles cannot trap the walk.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::model::{Architecture, ArchitectureEvidence};
use crate::core::binary;

const ENGINE_MARKER: &str = "UnityEngine.dll";
const PLAYER_RUNTIME: &str = "UnityPlayer.dll";
const ENGINE_RUNTIMES: [&str; 3] = ["GameAssembly.dll", "mono.dll", "UnityEngine.dll"];
const DATA_MARKER: &str = "globalgamemanagers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutHint {
    Il2Cpp,
    Mono(Architecture),
}

/// Markers found below one game directory.
#[derive(Debug, Default)]
pub struct GameTreeIndex {
    engine_marker: bool,
    player_runtime: Option<PathBuf>,
    engine_runtime: Option<PathBuf>,
    layout: Option<LayoutHint>,
    first_executable: Option<PathBuf>,
    data_marker: bool,
}

impl GameTreeIndex {
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            if entry.file_type().is_dir() {
                if index.layout.is_none() {
                    index.layout = layout_hint(entry.path(), name);
                }
                continue;
            }

            if name == ENGINE_MARKER {
                index.engine_marker = true;
            }
            if name == PLAYER_RUNTIME && index.player_runtime.is_none() {
                index.player_runtime = Some(entry.path().to_path_buf());
            }
            if ENGINE_RUNTIMES.contains(&name) && index.engine_runtime.is_none() {
                index.engine_runtime = Some(entry.path().to_path_buf());
            }
            if name == DATA_MARKER {
                index.data_marker = true;
            }
            if index.first_executable.is_none() && is_exe(name) {
                index.first_executable = Some(entry.path().to_path_buf());
            }
        }

        index
    }

    pub fn is_unity_game(&self) -> bool {
        self.engine_marker
    }

    /// Run the classification steps in order, stopping at the first success.
    pub fn classify(&self) -> (Architecture, ArchitectureEvidence) {
        if let Some(arch) = self.player_runtime.as_deref().and_then(sniff) {
            return (arch, ArchitectureEvidence::PlayerRuntime);
        }

        if let Some(arch) = self.engine_runtime.as_deref().and_then(sniff) {
            return (arch, ArchitectureEvidence::EngineRuntime);
        }

        match self.layout {
            Some(LayoutHint::Il2Cpp) => {
                return (Architecture::X64, ArchitectureEvidence::Il2CppLayout)
            }
            Some(LayoutHint::Mono(arch)) => return (arch, ArchitectureEvidence::MonoLayout),
            None => {}
        }

        if let Some(arch) = self.first_executable.as_deref().and_then(sniff) {
            return (arch, ArchitectureEvidence::Executable);
        }

        if self.data_marker {
            return (Architecture::UnityUnknown, ArchitectureEvidence::DataMarker);
        }

        (Architecture::Unknown, ArchitectureEvidence::None)
    }
}

fn sniff(path: &Path) -> Option<Architecture> {
    match binary::inspect(path) {
        Ok(arch) => Some(arch.into()),
        Err(e) => {
            debug!("Architecture probe failed: {}", e);
            None
        }
    }
}

fn layout_hint(dir: &Path, name: &str) -> Option<LayoutHint> {
    if name == "il2cpp_data" {
        let parent = dir.parent()?.file_name()?.to_str()?;
        if parent == "Data" || parent.ends_with("_Data") {
            return Some(LayoutHint::Il2Cpp);
        }
        return None;
    }

    if name == "Mono" {
        if dir.join("x86_64").is_dir() {
            return Some(LayoutHint::Mono(Architecture::X64));
        }
        if dir.join("x86").is_dir() {
            return Some(LayoutHint::Mono(Architecture::X86));
        }
    }

    None
}

fn is_exe(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".exe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::binary::pe::fake_pe;
    use std::fs;

    fn touch(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn engine_marker_anywhere_qualifies() {
        let tmp = tempfile::tempdir().unwrap();
        touch(
            &tmp.path().join("Game_Data/Managed/UnityEngine.dll"),
            b"stub",
        );
        assert!(GameTreeIndex::scan(tmp.path()).is_unity_game());
    }

    #[test]
    fn missing_marker_does_not_qualify() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("Game.exe"), &fake_pe(0x8664));
        assert!(!GameTreeIndex::scan(tmp.path()).is_unity_game());
    }

    #[test]
    fn player_runtime_wins_over_executable() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("UnityPlayer.dll"), &fake_pe(0x8664));
        touch(&tmp.path().join("Game.exe"), &fake_pe(0x014c));

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::X64, ArchitectureEvidence::PlayerRuntime)
        );
    }

    #[test]
    fn malformed_player_falls_through_to_engine_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("UnityPlayer.dll"), b"garbage");
        touch(&tmp.path().join("GameAssembly.dll"), &fake_pe(0x014c));

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::X86, ArchitectureEvidence::EngineRuntime)
        );
    }

    #[test]
    fn il2cpp_layout_implies_x64() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("Game_Data/il2cpp_data")).unwrap();

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::X64, ArchitectureEvidence::Il2CppLayout)
        );
    }

    #[test]
    fn mono_layout_reads_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("Mono/x86")).unwrap();

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::X86, ArchitectureEvidence::MonoLayout)
        );
    }

    #[test]
    fn executable_is_sniffed_before_data_marker() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("Game.EXE"), &fake_pe(0x8664));
        touch(&tmp.path().join("Game_Data/globalgamemanagers"), b"");

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::X64, ArchitectureEvidence::Executable)
        );
    }

    #[test]
    fn data_marker_is_last_resort() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("Game_Data/globalgamemanagers"), b"");
        touch(&tmp.path().join("Game.exe"), b"not a pe");

        let index = GameTreeIndex::scan(tmp.path());
        assert_eq!(
            index.classify(),
            (Architecture::UnityUnknown, ArchitectureEvidence::DataMarker)
        );
    }

    #[test]
    fn nothing_found_is_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            GameTreeIndex::scan(tmp.path()).classify(),
            (Architecture::Unknown, ArchitectureEvidence::None)
        );
    }
}
