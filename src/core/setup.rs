// ─── Framework setup ───
// The install pipeline for one game: guards, resolve, download, install.
// Download and extraction are strictly sequenced.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::core::cancel::CancelSignal;
use crate::core::discovery::Architecture;
use crate::core::downloader::{AssetDownloader, DownloadOutcome};
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::installer::{ArchiveInstaller, InstallReport, UninstallReport};
use crate::core::platform::{ensure_game_not_running, ensure_min_disk_space, HostPlatform};
use crate::core::release::{ReleaseAsset, ReleaseResolver};
use crate::core::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SetupOutcome {
    Installed {
        asset: ReleaseAsset,
        report: InstallReport,
    },
    Cancelled,
}

pub struct FrameworkSetup {
    resolver: ReleaseResolver,
    downloader: AssetDownloader,
    installer: ArchiveInstaller,
    downloads_dir: PathBuf,
    min_free_disk_bytes: u64,
}

impl FrameworkSetup {
    pub fn new(
        resolver: ReleaseResolver,
        downloader: AssetDownloader,
        downloads_dir: PathBuf,
        min_free_disk_bytes: u64,
    ) -> Self {
        Self {
            resolver,
            downloader,
            installer: ArchiveInstaller::new(),
            downloads_dir,
            min_free_disk_bytes,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            ReleaseResolver::from_state(state),
            AssetDownloader::new(state.http_client.clone()),
            state.downloads_dir(),
            state.settings.min_free_disk_bytes(),
        )
    }

    /// Install the latest framework release into `game_dir`. An x86 game gets
    /// the x86 build regardless of the host.
    #[instrument(skip(self, cancel, on_progress))]
    pub async fn install<F>(
        &self,
        game_dir: &Path,
        architecture: Architecture,
        cancel: &CancelSignal,
        on_progress: F,
    ) -> ManagerResult<SetupOutcome>
    where
        F: FnMut(u8) + Send,
    {
        if !game_dir.is_dir() {
            return Err(ManagerError::Other(format!(
                "game directory {} does not exist",
                game_dir.display()
            )));
        }
        ensure_game_not_running(game_dir)?;
        ensure_min_disk_space(game_dir, self.min_free_disk_bytes)?;

        let platform = HostPlatform::for_game(architecture);
        let asset = self.resolver.resolve(&platform).await?;

        let dest = self.downloads_dir.join(&asset.name);
        let archive = match self
            .downloader
            .download(&asset, &dest, cancel, on_progress)
            .await?
        {
            DownloadOutcome::Completed { path, .. } => path,
            DownloadOutcome::Cancelled => {
                info!("Setup cancelled during download");
                return Ok(SetupOutcome::Cancelled);
            }
        };

        let report = self
            .installer
            .install_async(archive, game_dir.to_path_buf())
            .await?;
        Ok(SetupOutcome::Installed { asset, report })
    }

    /// Remove the framework, refusing while the game is running.
    pub async fn uninstall(&self, game_dir: &Path) -> ManagerResult<UninstallReport> {
        ensure_game_not_running(game_dir)?;
        let installer = self.installer;
        let game_dir = game_dir.to_path_buf();
        tokio::task::spawn_blocking(move || installer.uninstall(&game_dir))
            .await
            .map_err(|e| ManagerError::Other(format!("uninstall task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_loopback_client;
    use crate::core::installer::extract::test_zip::write_zip;
    use crate::core::platform::platform_os;
    use crate::core::release::{Release, ReleaseFeed};
    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct OneAssetFeed(Release);

    #[async_trait]
    impl ReleaseFeed for OneAssetFeed {
        async fn latest(&self) -> ManagerResult<Release> {
            Ok(self.0.clone())
        }
    }

    async fn serve_bytes(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/asset.zip")
    }

    #[tokio::test]
    async fn installs_x86_build_for_x86_game() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_path = tmp.path().join("fixture.zip");
        write_zip(
            &zip_path,
            &[("winhttp.dll", b"proxy"), ("BepInEx/core/BepInEx.dll", b"core")],
        );
        let url = serve_bytes(std::fs::read(&zip_path).unwrap()).await;

        let os = platform_os();
        let x86_name = format!("BepInEx_{os}_x86_5.4.23.2.zip");
        let release = Release {
            tag_name: "v5.4.23.2".into(),
            assets: vec![
                ReleaseAsset {
                    name: format!("BepInEx_{os}_x64_5.4.23.2.zip"),
                    download_url: "http://127.0.0.1:9/wrong".into(),
                    size: None,
                    digest: None,
                },
                ReleaseAsset {
                    name: x86_name.clone(),
                    download_url: url,
                    size: None,
                    digest: None,
                },
            ],
        };

        let game = tmp.path().join("game");
        std::fs::create_dir_all(&game).unwrap();
        let setup = FrameworkSetup::new(
            ReleaseResolver::new(Box::new(OneAssetFeed(release))),
            AssetDownloader::new(build_loopback_client()),
            tmp.path().join("downloads"),
            0,
        );

        let outcome = setup
            .install(&game, Architecture::X86, &CancelSignal::never(), |_| {})
            .await
            .unwrap();

        match outcome {
            SetupOutcome::Installed { asset, report } => {
                assert_eq!(asset.name, x86_name);
                assert!(report.payload_replaced);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(game.join("BepInEx/core/BepInEx.dll").is_file());
        assert!(game.join("winhttp.dll").is_file());
        // Archive is consumed by the install.
        assert!(!tmp.path().join("downloads").join(&x86_name).exists());

        let removed = setup.uninstall(&game).await.unwrap();
        assert_eq!(removed.removed.len(), 2);
        assert!(!game.join("BepInEx").exists());
    }

    #[tokio::test]
    async fn missing_game_dir_is_rejected_before_network() {
        let tmp = tempfile::tempdir().unwrap();
        let setup = FrameworkSetup::new(
            ReleaseResolver::new(Box::new(OneAssetFeed(Release {
                tag_name: "v1".into(),
                assets: vec![],
            }))),
            AssetDownloader::new(build_loopback_client()),
            tmp.path().join("downloads"),
            0,
        );
        let err = setup
            .install(
                &tmp.path().join("nope"),
                Architecture::X64,
                &CancelSignal::never(),
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Other(_)));
    }
}
