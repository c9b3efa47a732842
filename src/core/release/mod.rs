pub mod feed;
pub mod resolver;

pub use feed::{GithubReleaseFeed, Release, ReleaseAsset, ReleaseFeed};
pub use resolver::{select_asset, version_from_tag, ReleaseResolver};
