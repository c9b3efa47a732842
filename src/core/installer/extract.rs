// ─── Archive extraction ───
// Zip archives are always unpacked into a private scratch directory first;
// nothing is written into a game directory straight from the archive.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{ManagerError, ManagerResult};

const SCRATCH_ROOT: &str = "BepInExManager";

/// A uniquely named temp directory removed (best effort) on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(purpose: &str) -> ManagerResult<Self> {
        let path = std::env::temp_dir()
            .join(SCRATCH_ROOT)
            .join(format!("{purpose}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(|e| ManagerError::io(&path, e))?;
        debug!("Created scratch dir {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to remove scratch dir {:?}: {}", self.path, e);
        }
    }
}

/// Unpack every entry of `zip_path` below `dest`. Entries whose names would
/// escape `dest` are rejected as corruption.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> ManagerResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| ManagerError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)
        .map_err(|e| ManagerError::corrupt_archive(zip_path, e))?;

    for index in 0..archive.len() {
        let mut zipped = archive
            .by_index(index)
            .map_err(|e| ManagerError::corrupt_archive(zip_path, e))?;

        let rel_path = zipped.enclosed_name().ok_or_else(|| {
            ManagerError::corrupt_archive(zip_path, format!("unsafe entry path {:?}", zipped.name()))
        })?;
        let out_path = dest.join(rel_path);

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| ManagerError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ManagerError::io(parent, e))?;
        }

        let mut out =
            std::fs::File::create(&out_path).map_err(|e| ManagerError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| {
            // A short or undecodable entry surfaces as an io error from the reader.
            if e.kind() == std::io::ErrorKind::InvalidData
                || e.kind() == std::io::ErrorKind::UnexpectedEof
            {
                ManagerError::corrupt_archive(zip_path, e)
            } else {
                ManagerError::io(&out_path, e)
            }
        })?;
    }

    debug!("Extracted {} entries from {:?}", archive.len(), zip_path);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_zip {
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;

    /// Write a zip containing `(name, bytes)` entries. Names ending in `/`
    /// become directory entries.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap();
    }
}
