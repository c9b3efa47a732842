pub mod monitor;
pub mod process;

pub use monitor::{InstallationMonitor, InstallationState, MonitorOutcome};
pub use process::{find_game_executable, launch_detached, launch_game};
