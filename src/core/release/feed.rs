// ─── Release Feed ───
// Fetches the latest framework release description. The GitHub releases API
// shape is the only wire format; other feeds implement `ReleaseFeed`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{ManagerError, ManagerResult};

/// The latest published release as returned by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    /// `sha256:<hex>` when the feed publishes one.
    #[serde(default)]
    pub digest: Option<String>,
}

impl ReleaseAsset {
    /// Loose match: the name carries `{os}_{arch}` and is a zip.
    pub fn matches_platform(&self, os: &str, arch: &str) -> bool {
        self.name.contains(&format!("{os}_{arch}")) && self.name.ends_with(".zip")
    }

    /// Expected SHA-256 in lowercase hex, if the digest is a sha256 one.
    pub fn sha256(&self) -> Option<String> {
        self.digest
            .as_deref()
            .and_then(|d| d.strip_prefix("sha256:"))
            .map(|hex| hex.to_ascii_lowercase())
    }
}

#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest(&self) -> ManagerResult<Release>;
}

/// GitHub `releases/latest` endpoint.
pub struct GithubReleaseFeed {
    client: Client,
    url: String,
}

impl GithubReleaseFeed {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseFeed {
    async fn latest(&self) -> ManagerResult<Release> {
        info!("Fetching latest release from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::DownloadFailed {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let release: Release = response.json().await?;
        info!(
            "Latest release {} has {} assets",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }
}
