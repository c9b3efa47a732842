pub mod client;

pub use client::{AssetDownloader, DownloadOutcome};
