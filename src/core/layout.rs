use std::path::{Path, PathBuf};

/// Top-level payload directory the framework lives in.
pub const PAYLOAD_DIR: &str = "BepInEx";

/// Loader files copied from an archive root into the game root.
pub const LOADER_FILES: [&str; 6] = [
    ".doorstop_version",
    "doorstop_config.ini",
    "winhttp.dll",
    "run_bepinex.sh",
    "libdoorstop.so",
    "libdoorstop.dylib",
];

/// Subdirectories BepInEx creates on first start.
pub const FIRST_RUN_DIRS: [&str; 4] = ["cache", "config", "patchers", "plugins"];

/// Paths of a BepInEx installation inside one game directory.
#[derive(Debug, Clone)]
pub struct FrameworkLayout {
    game_dir: PathBuf,
}

impl FrameworkLayout {
    pub fn new(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_dir: game_dir.into(),
        }
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    pub fn payload_dir(&self) -> PathBuf {
        self.game_dir.join(PAYLOAD_DIR)
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.payload_dir().join("plugins")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.payload_dir().join("config")
    }

    pub fn loader_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        LOADER_FILES.iter().map(|name| self.game_dir.join(name))
    }

    /// The four directories whose joint presence proves BepInEx has run.
    pub fn first_run_dirs(&self) -> Vec<PathBuf> {
        let payload = self.payload_dir();
        FIRST_RUN_DIRS.iter().map(|d| payload.join(d)).collect()
    }

    pub fn is_installed(&self) -> bool {
        self.payload_dir().is_dir()
    }

    pub fn first_run_complete(&self) -> bool {
        self.first_run_dirs().iter().all(|d| d.is_dir())
    }
}
