// ─── Framework config files ───
// `BepInEx/config/*.cfg` are handed around as opaque text; nothing here
// parses or validates their contents.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::core::error::{ManagerError, ManagerResult};
use crate::core::layout::FrameworkLayout;

const CONFIG_EXT: &str = "cfg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigFile {
    pub name: String,
    pub path: PathBuf,
}

pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    pub fn for_game(game_dir: &Path) -> Self {
        Self {
            config_dir: FrameworkLayout::new(game_dir).config_dir(),
        }
    }

    /// Sorted `.cfg` files; an absent config folder lists nothing.
    pub fn list(&self) -> ManagerResult<Vec<ConfigFile>> {
        if !self.config_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<ConfigFile> = std::fs::read_dir(&self.config_dir)
            .map_err(|e| ManagerError::io(&self.config_dir, e))?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(CONFIG_EXT))
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(ConfigFile { name, path })
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn read(&self, name: &str) -> ManagerResult<String> {
        let path = self.resolve(name)?;
        std::fs::read_to_string(&path).map_err(|e| ManagerError::io(path, e))
    }

    /// Overwrite (or create) a config file with `contents`.
    pub fn write(&self, name: &str, contents: &str) -> ManagerResult<()> {
        let path = self.resolve(name)?;
        std::fs::create_dir_all(&self.config_dir)
            .map_err(|e| ManagerError::io(&self.config_dir, e))?;
        std::fs::write(&path, contents).map_err(|e| ManagerError::io(&path, e))?;
        info!("Saved config {:?}", path);
        Ok(())
    }

    fn resolve(&self, name: &str) -> ManagerResult<PathBuf> {
        let candidate = Path::new(name);
        let is_plain_name = candidate.file_name().and_then(|n| n.to_str()) == Some(name);
        let is_cfg = candidate.extension().and_then(|e| e.to_str()) == Some(CONFIG_EXT);
        if !is_plain_name || !is_cfg {
            return Err(ManagerError::Other(format!("not a config file name: {name:?}")));
        }
        Ok(self.config_dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_reads_and_writes_cfg_files() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("BepInEx/config");
        fs::create_dir_all(&config).unwrap();
        fs::write(config.join("BepInEx.cfg"), "[Logging]\nEnabled = true\n").unwrap();
        fs::write(config.join("notes.txt"), "x").unwrap();

        let store = ConfigStore::for_game(tmp.path());
        let names: Vec<_> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["BepInEx.cfg"]);

        store.write("BepInEx.cfg", "edited").unwrap();
        assert_eq!(store.read("BepInEx.cfg").unwrap(), "edited");
    }

    #[test]
    fn rejects_paths_and_other_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::for_game(tmp.path());
        assert!(store.read("../secret.cfg").is_err());
        assert!(store.write("notes.txt", "x").is_err());
        assert!(store.list().unwrap().is_empty());
    }
}
