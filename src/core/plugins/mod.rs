pub mod manager;
pub mod model;

pub use manager::PluginManager;
pub use model::{
    toggled_file_name, PackageInstallReport, PluginFile, PluginListing, PluginPackage,
};
