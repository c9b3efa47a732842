pub mod archive;
pub mod extract;

pub use archive::{ArchiveInstaller, InstallReport, UninstallReport};
pub use extract::{extract_zip, ScratchDir};
