use tracing::{debug, info, instrument};

use super::feed::{GithubReleaseFeed, Release, ReleaseAsset, ReleaseFeed};
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::platform::HostPlatform;
use crate::core::state::AppState;

/// Picks the framework asset for a platform from the latest release.
pub struct ReleaseResolver {
    feed: Box<dyn ReleaseFeed>,
}

impl ReleaseResolver {
    pub fn new(feed: Box<dyn ReleaseFeed>) -> Self {
        Self { feed }
    }

    /// GitHub feed at the URL configured in settings.
    pub fn from_state(state: &AppState) -> Self {
        Self::new(Box::new(GithubReleaseFeed::new(
            state.http_client.clone(),
            state.settings.release_feed_url.clone(),
        )))
    }

    #[instrument(skip_all, fields(platform = %platform))]
    pub async fn resolve(&self, platform: &HostPlatform) -> ManagerResult<ReleaseAsset> {
        let release = self.feed.latest().await.map_err(|e| match e {
            ManagerError::ResolutionFailed(_) => e,
            other => ManagerError::ResolutionFailed(other.to_string()),
        })?;

        let asset = select_asset(&release, platform)?;
        info!("Selected release asset {}", asset.name);
        Ok(asset)
    }
}

/// `v5.4.23.2` -> `5.4.23.2`. Everything before the first digit is dropped.
pub fn version_from_tag(tag: &str) -> &str {
    tag.find(|c: char| c.is_ascii_digit())
        .map(|idx| &tag[idx..])
        .unwrap_or("")
}

/// `BepInEx_{os}_{arch}_{version}.zip`
pub fn canonical_asset_name(platform: &HostPlatform, version: &str) -> String {
    format!("BepInEx_{}_{}_{}.zip", platform.os, platform.arch, version)
}

/// Exact canonical name first, anywhere in the list; otherwise the first
/// asset in feed order that loosely matches the platform.
pub fn select_asset(release: &Release, platform: &HostPlatform) -> ManagerResult<ReleaseAsset> {
    let version = version_from_tag(&release.tag_name);
    let canonical = canonical_asset_name(platform, version);

    if let Some(asset) = release.assets.iter().find(|a| a.name == canonical) {
        return Ok(asset.clone());
    }
    debug!("No asset named {}, trying loose match", canonical);

    release
        .assets
        .iter()
        .find(|a| a.matches_platform(&platform.os, &platform.arch))
        .cloned()
        .ok_or_else(|| ManagerError::NoMatchingAsset {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        })
}
