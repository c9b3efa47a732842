// ─── BepInEx Manager Core ───
// Finds Unity games, installs BepInEx into them and manages plugin packages.
//
// Architecture:
//   core/
//     binary/       — PE header sniffing (x86 / x64)
//     discovery/    — Steam, Epic, MS Store and manual sources + Unity checks
//     release/      — Release feed + platform asset selection
//     downloader/   — Streaming asset download with progress and digest
//     installer/    — Zip extraction + merge into a game directory
//     plugins/      — Plugin packages, enable/disable by rename
//     launch/       — Game process + first-run monitor
//     setup         — Resolve → download → install pipeline
//     config_files  — Opaque access to BepInEx/config/*.cfg
//     state/        — Settings + shared HTTP client

pub mod binary;
pub mod cancel;
pub mod config_files;
pub mod discovery;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod launch;
pub mod layout;
pub mod platform;
pub mod plugins;
pub mod release;
pub mod setup;
pub mod state;
