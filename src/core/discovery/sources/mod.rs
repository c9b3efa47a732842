pub mod epic;
pub mod manual;
pub mod ms_store;
pub mod steam;

pub use epic::EpicSource;
pub use manual::ManualSource;
pub use ms_store::MsStoreSource;
pub use steam::SteamSource;

use std::path::Path;

use super::model::{DiscoveryWarning, GameCandidate, SourceKind};

/// What one launcher source yielded during a scan.
#[derive(Debug, Default)]
pub struct SourceScan {
    pub candidates: Vec<GameCandidate>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl SourceScan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: GameCandidate) {
        self.candidates.push(candidate);
    }

    pub fn warn(&mut self, source: SourceKind, path: &Path, reason: impl ToString) {
        self.warnings.push(DiscoveryWarning::new(source, path, reason));
    }
}

/// A game launcher whose installed-game metadata can be enumerated.
pub trait GameSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Enumerate candidate install directories. Per-entry failures go into
    /// the returned warnings; a launcher that is simply not installed yields
    /// an empty scan with no warnings.
    fn scan(&self) -> SourceScan;

    /// Whether candidates must contain the Unity engine marker to be kept.
    fn requires_engine_marker(&self) -> bool {
        true
    }
}
