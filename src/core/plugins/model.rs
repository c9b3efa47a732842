use std::path::PathBuf;

use serde::Serialize;

pub const LIBRARY_EXT: &str = "dll";
pub const DISABLED_SUFFIX: &str = ".bak";

/// One loadable library inside a package. `file_name` is the logical name
/// (`Foo.dll`); a disabled file sits on disk as `Foo.dll.bak`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFile {
    pub file_name: String,
    pub enabled: bool,
}

impl PluginFile {
    /// Classify an on-disk file name. Anything that is not a library or a
    /// disabled library is not a plugin file.
    pub fn from_disk_name(name: &str) -> Option<Self> {
        if let Some(logical) = name.strip_suffix(DISABLED_SUFFIX) {
            if is_library_name(logical) {
                return Some(Self {
                    file_name: logical.to_string(),
                    enabled: false,
                });
            }
            return None;
        }
        is_library_name(name).then(|| Self {
            file_name: name.to_string(),
            enabled: true,
        })
    }

    pub fn disk_name(&self) -> String {
        if self.enabled {
            self.file_name.clone()
        } else {
            format!("{}{}", self.file_name, DISABLED_SUFFIX)
        }
    }
}

/// A named folder under `BepInEx/plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginPackage {
    pub folder_name: String,
    pub path: PathBuf,
    pub files: Vec<PluginFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "packages", rename_all = "snake_case")]
pub enum PluginListing {
    Empty,
    Packages(Vec<PluginPackage>),
}

impl PluginListing {
    pub fn packages(&self) -> &[PluginPackage] {
        match self {
            PluginListing::Empty => &[],
            PluginListing::Packages(packages) => packages,
        }
    }
}

/// Result of adding files to a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageInstallReport {
    pub placed: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn is_library_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(LIBRARY_EXT))
        .unwrap_or(false)
}

/// The on-disk name `name` takes in the requested state.
pub fn toggled_file_name(name: &str, enabled: bool) -> String {
    match (enabled, name.strip_suffix(DISABLED_SUFFIX)) {
        (true, Some(active)) => active.to_string(),
        (true, None) => name.to_string(),
        (false, Some(_)) => name.to_string(),
        (false, None) => format!("{name}{DISABLED_SUFFIX}"),
    }
}
