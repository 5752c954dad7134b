//! Scratch-file downloads.
//!
//! Storage-hosted files are streamed straight to disk; external platform
//! links go through yt-dlp. Every download lands in a [`ScratchFile`] that
//! owns its path and removes it on drop, so the cleanup contract holds on
//! all exit paths of the calling analyzer.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::source::ResolvedSource;

/// Maximum video resolution requested from external platforms.
const MAX_PLATFORM_HEIGHT: u32 = 480;

/// A downloaded file owned by exactly one analyzer invocation.
///
/// The file is deleted when the guard is dropped. Prefer the explicit
/// [`ScratchFile::cleanup`] on the happy path; `Drop` is the backstop for
/// error and panic paths.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    cleaned: bool,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleaned: false,
        }
    }

    /// Path of the downloaded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the downloaded file in bytes.
    pub async fn len(&self) -> MediaResult<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Delete the file now instead of waiting for drop.
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file");
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.cleaned {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file on drop");
                }
            }
        }
    }
}

/// Downloads an external platform URL to a local file.
///
/// Narrow seam so the concrete tool (yt-dlp) is swappable and mockable in
/// tests without spawning real processes.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait::async_trait]
pub trait ExternalDownloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> MediaResult<()>;
}

/// yt-dlp subprocess downloader.
#[derive(Debug, Clone)]
pub struct YtDlp {
    socket_timeout: Duration,
}

impl YtDlp {
    pub fn new(socket_timeout: Duration) -> Self {
        Self { socket_timeout }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl ExternalDownloader for YtDlp {
    async fn download(&self, url: &str, dest: &Path) -> MediaResult<()> {
        which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

        let format = format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]",
            h = MAX_PLATFORM_HEIGHT
        );
        let socket_timeout = self.socket_timeout.as_secs().to_string();
        let dest_str = dest.to_string_lossy();

        info!(url = %url, dest = %dest.display(), "Downloading platform video with yt-dlp");

        let output = Command::new("yt-dlp")
            .args([
                "--no-playlist",
                "--socket-timeout",
                &socket_timeout,
                "--merge-output-format",
                "mp4",
                "-f",
                &format,
                "-o",
                &dest_str,
                url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                stderr.lines().last().unwrap_or("Unknown error")
            )));
        }

        // A zero-byte or missing output is a failed download, never a
        // silent fallback to metadata-only analysis.
        match tokio::fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            Ok(_) => Err(MediaError::download_failed("yt-dlp produced an empty file")),
            Err(_) => Err(MediaError::download_failed("yt-dlp output file not created")),
        }
    }
}

/// Fetches media bytes and scratch files for the analyzers.
pub struct MediaFetcher {
    client: reqwest::Client,
    downloader: std::sync::Arc<dyn ExternalDownloader>,
    scratch_dir: PathBuf,
    request_timeout: Duration,
}

impl MediaFetcher {
    /// Create a fetcher writing scratch files under `scratch_dir`.
    pub fn new(
        downloader: std::sync::Arc<dyn ExternalDownloader>,
        scratch_dir: impl Into<PathBuf>,
        request_timeout: Duration,
    ) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            downloader,
            scratch_dir: scratch_dir.into(),
            request_timeout,
        })
    }

    /// Surface request timeouts under their own variant instead of a
    /// generic HTTP error.
    fn http_error(&self, e: reqwest::Error) -> MediaError {
        if e.is_timeout() {
            MediaError::Timeout(self.request_timeout.as_secs())
        } else {
            MediaError::Http(e)
        }
    }

    /// Fetch a storage-hosted image into memory, returning bytes and MIME
    /// type (from the response header, falling back to the URL extension).
    pub async fn fetch_bytes(&self, url: &str) -> MediaResult<(Vec<u8>, String)> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
            .unwrap_or_else(|| mime_from_extension(url));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.http_error(e))?
            .to_vec();
        if bytes.is_empty() {
            return Err(MediaError::download_failed(format!("GET {} returned an empty body", url)));
        }
        Ok((bytes, mime))
    }

    /// Download a resolved source to a scratch file.
    pub async fn download_to_scratch(&self, source: &ResolvedSource) -> MediaResult<ScratchFile> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let dest = self.scratch_dir.join(format!("{}.mp4", Uuid::new_v4()));
        let scratch = ScratchFile::new(dest);

        match source {
            ResolvedSource::Direct(url) => {
                self.stream_to_file(url, scratch.path()).await?;
            }
            ResolvedSource::Platform(url) => {
                self.downloader.download(url, scratch.path()).await?;
            }
        }

        let size = scratch.len().await?;
        if size == 0 {
            return Err(MediaError::download_failed("downloaded file is empty"));
        }
        info!(
            path = %scratch.path().display(),
            size_mb = size as f64 / 1_048_576.0,
            "Downloaded source to scratch"
        );
        Ok(scratch)
    }

    /// Streamed GET straight to disk, never buffering the whole body.
    async fn stream_to_file(&self, url: &str, dest: &Path) -> MediaResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        if !response.status().is_success() {
            return Err(MediaError::download_failed(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.http_error(e))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

fn mime_from_extension(url: &str) -> String {
    let ext = url
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "image/jpeg",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_with(downloader: Arc<dyn ExternalDownloader>, dir: &Path) -> MediaFetcher {
        MediaFetcher::new(downloader, dir, Duration::from_secs(5)).unwrap()
    }

    fn no_downloader() -> Arc<dyn ExternalDownloader> {
        let mut mock = MockExternalDownloader::new();
        mock.expect_download().times(0);
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("scratch.mp4");
        tokio::fs::write(&file_path, b"data").await.unwrap();

        let scratch = ScratchFile::new(file_path.clone());
        assert!(file_path.exists());
        drop(scratch);
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn test_scratch_file_explicit_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("scratch.mp4");
        tokio::fs::write(&file_path, b"data").await.unwrap();

        let scratch = ScratchFile::new(file_path.clone());
        scratch.cleanup().await;
        assert!(!file_path.exists());
    }

    #[tokio::test]
    async fn test_direct_download_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake video bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_with(no_downloader(), dir.path());
        let source = ResolvedSource::Direct(format!("{}/video.mp4", server.uri()));

        let scratch = fetcher.download_to_scratch(&source).await.unwrap();
        let contents = tokio::fs::read(scratch.path()).await.unwrap();
        assert_eq!(contents, b"fake video bytes");
        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_direct_download_http_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_with(no_downloader(), dir.path());
        let source = ResolvedSource::Direct(format!("{}/missing.mp4", server.uri()));

        let err = fetcher.download_to_scratch(&source).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_platform_download_is_failure() {
        // Downloader "succeeds" but writes nothing: must surface as failure.
        let mut mock = MockExternalDownloader::new();
        mock.expect_download().returning(|_, dest| {
            std::fs::write(dest, b"").unwrap();
            Ok(())
        });

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_with(Arc::new(mock), dir.path());
        let source = ResolvedSource::Platform("https://www.youtube.com/watch?v=abc".into());

        let err = fetcher.download_to_scratch(&source).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_platform_download_uses_external_downloader() {
        let mut mock = MockExternalDownloader::new();
        mock.expect_download().times(1).returning(|_, dest| {
            std::fs::write(dest, b"platform bytes").unwrap();
            Ok(())
        });

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_with(Arc::new(mock), dir.path());
        let source = ResolvedSource::Platform("https://vimeo.com/12345".into());

        let scratch = fetcher.download_to_scratch(&source).await.unwrap();
        assert_eq!(scratch.len().await.unwrap(), 14);
        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_fetch_bytes_uses_content_type_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"png data".to_vec())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_with(no_downloader(), dir.path());
        let (bytes, mime) = fetcher
            .fetch_bytes(&format!("{}/photo", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"png data");
        assert_eq!(mime, "image/png");
    }

    #[tokio::test]
    async fn test_slow_response_surfaces_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            MediaFetcher::new(no_downloader(), dir.path(), Duration::from_millis(100)).unwrap();

        let err = fetcher
            .fetch_bytes(&format!("{}/slow.jpg", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(_)));
    }

    #[test]
    fn test_mime_from_extension_fallback() {
        assert_eq!(mime_from_extension("https://x/a.png"), "image/png");
        assert_eq!(mime_from_extension("https://x/a.jpg"), "image/jpeg");
        assert_eq!(mime_from_extension("https://x/a"), "image/jpeg");
    }
}
