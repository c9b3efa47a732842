pub mod engine;
pub mod model;
pub mod registry;
pub mod sources;
pub mod unity;

pub use engine::{classify_candidate, inspect_directory, GameDiscovery};
pub use model::{
    describe_architecture, Architecture, ArchitectureEvidence, DiscoveryWarning, GameCandidate,
    GameCatalog, GameRecord, SourceKind,
};
