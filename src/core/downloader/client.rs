use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::core::cancel::CancelSignal;
use crate::core::error::{ManagerError, ManagerResult};
use crate::core::release::ReleaseAsset;

/// How a download ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { path: PathBuf, bytes: u64 },
    Cancelled,
}

/// Streams a release asset to disk, chunk by chunk.
pub struct AssetDownloader {
    client: Client,
}

impl AssetDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `asset` to `dest`, reporting whole-percent progress after each
    /// chunk when the server sent a length. Failures and cancellation leave
    /// whatever was written in place; there is no retry.
    #[instrument(skip_all, fields(asset = %asset.name, dest = ?dest))]
    pub async fn download<F>(
        &self,
        asset: &ReleaseAsset,
        dest: &Path,
        cancel: &CancelSignal,
        mut on_progress: F,
    ) -> ManagerResult<DownloadOutcome>
    where
        F: FnMut(u8) + Send,
    {
        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ManagerError::io(parent, e))?;
        }

        let url = &asset.download_url;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().filter(|len| *len > 0);
        info!("Downloading {} ({:?} bytes)", url, total_bytes);

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        // Scoped so the handle is closed before verification and return.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| ManagerError::io(dest, e))?;

            loop {
                if cancel.is_cancelled() {
                    file.flush().await.map_err(|e| ManagerError::io(dest, e))?;
                    info!("Download of {} cancelled after {} bytes", url, downloaded);
                    return Ok(DownloadOutcome::Cancelled);
                }

                let Some(chunk) = stream.next().await else {
                    break;
                };
                let chunk = chunk?;

                file.write_all(&chunk)
                    .await
                    .map_err(|e| ManagerError::io(dest, e))?;
                hasher.update(&chunk);
                downloaded += chunk.len() as u64;

                if let Some(total) = total_bytes {
                    on_progress(percent(downloaded, total));
                }
            }

            file.flush().await.map_err(|e| ManagerError::io(dest, e))?;
        }

        if let Some(expected) = asset.sha256() {
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                warn!("Digest mismatch for {:?}", dest);
                return Err(ManagerError::DigestMismatch {
                    path: dest.to_path_buf(),
                    expected,
                    actual,
                });
            }
            debug!("Digest verified for {:?}", dest);
        }

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(DownloadOutcome::Completed {
            path: dest.to_path_buf(),
            bytes: downloaded,
        })
    }
}

fn percent(done: u64, total: u64) -> u8 {
    (done.saturating_mul(100) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::cancel_pair;
    use crate::core::http::build_loopback_client;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response to the first connection.
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/BepInEx_win_x64_5.4.zip")
    }

    fn asset(url: String, digest: Option<String>) -> ReleaseAsset {
        ReleaseAsset {
            name: "BepInEx_win_x64_5.4.zip".into(),
            download_url: url,
            size: None,
            digest,
        }
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(300, 200), 100);
    }

    #[tokio::test]
    async fn downloads_with_progress_and_digest() {
        let body = vec![7u8; 2048];
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(&body)));
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("bepinex.zip");
        let downloader = AssetDownloader::new(build_loopback_client());

        let mut seen = Vec::new();
        let outcome = downloader
            .download(&asset(url, Some(digest)), &dest, &CancelSignal::never(), |p| {
                seen.push(p)
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Completed {
                path: dest.clone(),
                bytes: 2048
            }
        );
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn no_length_means_no_progress() {
        let head = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, b"payload".to_vec()).await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a.zip");
        let downloader = AssetDownloader::new(build_loopback_client());

        let mut calls = 0;
        let outcome = downloader
            .download(&asset(url, None), &dest, &CancelSignal::never(), |_| calls += 1)
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Completed { bytes: 7, .. }));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn http_error_status_fails() {
        let head =
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, Vec::new()).await;

        let tmp = tempfile::tempdir().unwrap();
        let downloader = AssetDownloader::new(build_loopback_client());
        let err = downloader
            .download(
                &asset(url, None),
                &tmp.path().join("a.zip"),
                &CancelSignal::never(),
                |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::DownloadFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn digest_mismatch_is_reported() {
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\n".to_string();
        let url = serve_once(head, b"abc".to_vec()).await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a.zip");
        let downloader = AssetDownloader::new(build_loopback_client());
        let err = downloader
            .download(
                &asset(url, Some("sha256:00".into())),
                &dest,
                &CancelSignal::never(),
                |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::DigestMismatch { .. }));
        // Left in place for inspection.
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn cancel_between_chunks_keeps_partial_file() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&[1u8; 1024]).await.unwrap();
            socket.flush().await.unwrap();
            // Stall with the rest of the body unsent.
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });
        let url = format!("http://{addr}/BepInEx_win_x64_5.4.zip");

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a.zip");
        let downloader = AssetDownloader::new(build_loopback_client());
        let (handle, signal) = cancel_pair();

        let mut seen = Vec::new();
        let outcome = downloader
            .download(&asset(url, None), &dest, &signal, |p| {
                seen.push(p);
                handle.cancel();
            })
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert_eq!(seen.len(), 1);
        assert!(seen[0] < 100);
        let written = std::fs::metadata(&dest).unwrap().len();
        assert!(written > 0 && written < 4096);
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_nothing() {
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("a.zip");
        let downloader = AssetDownloader::new(build_loopback_client());
        let outcome = downloader
            .download(
                &asset("http://127.0.0.1:9/never".into(), None),
                &dest,
                &signal,
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert!(!dest.exists());
    }
}
