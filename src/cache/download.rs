use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::events::{SharedEventSink, ViewModelEvent};
use crate::http::HttpClient;

use super::store::DownloadGuard;

/// Outcome of a completed cache download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub bytes_downloaded: u64,
    /// Hex SHA-256 of the body, prefixed with `sha256:`
    pub content_hash: String,
}

/// Download the media claimed by `guard` into the cache
///
/// Streams the response body to the guard's `.partial` path and renames it
/// to the final cache path once the body is complete, so a cache path only
/// ever holds complete files. The partial file is removed on failure.
pub async fn download_to_cache<C: HttpClient>(
    client: &C,
    guard: &DownloadGuard,
    sink: &SharedEventSink,
) -> Result<DownloadResult, CacheError> {
    let partial_path = guard.partial_path();
    let result = stream_to_file(client, guard, sink).await;

    match result {
        Ok(result) => {
            tokio::fs::rename(&partial_path, guard.path())
                .await
                .map_err(|e| CacheError::FinalizeFailed {
                    from: partial_path.clone(),
                    to: guard.path().to_path_buf(),
                    source: e,
                })?;

            info!(
                "Cached {} ({} bytes, {})",
                guard.url(),
                result.bytes_downloaded,
                result.content_hash
            );
            sink.emit(ViewModelEvent::DownloadCompleted {
                url: guard.url().to_string(),
                bytes_downloaded: result.bytes_downloaded,
                content_hash: result.content_hash.clone(),
            });
            Ok(result)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial_path).await;
            Err(e)
        }
    }
}

async fn stream_to_file<C: HttpClient>(
    client: &C,
    guard: &DownloadGuard,
    sink: &SharedEventSink,
) -> Result<DownloadResult, CacheError> {
    let url = guard.url();
    let output_path = guard.partial_path();

    let response = client
        .get_stream(url)
        .await
        .map_err(|e| CacheError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(CacheError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    debug!("Downloading {} to {}", url, output_path.display());
    sink.emit(ViewModelEvent::DownloadStarting {
        url: url.to_string(),
        content_length: response.content_length,
    });

    let mut file =
        File::create(&output_path)
            .await
            .map_err(|e| CacheError::FileCreateFailed {
                path: output_path.clone(),
                source: e,
            })?;

    let mut hasher = Sha256::new();
    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| CacheError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| CacheError::FileWriteFailed {
                path: output_path.clone(),
                source: e,
            })?;

        hasher.update(&chunk);
        bytes_downloaded += chunk.len() as u64;

        sink.emit(ViewModelEvent::DownloadProgress {
            url: url.to_string(),
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| CacheError::FileWriteFailed {
            path: output_path.clone(),
            source: e,
        })?;

    Ok(DownloadResult {
        bytes_downloaded,
        content_hash: format!("sha256:{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MediaCache;
    use crate::events::NoopSink;
    use crate::events::tests::RecordingSink;
    use crate::http::{BufferedResponse, ByteStream, HttpResponse};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Serves the same media body for every streamed URL and counts requests
    #[derive(Clone)]
    pub(crate) struct MockMediaClient {
        pub response_data: Vec<u8>,
        pub status: u16,
        pub stream_requests: Arc<AtomicUsize>,
    }

    impl MockMediaClient {
        pub fn new(data: &[u8]) -> Self {
            Self {
                response_data: data.to_vec(),
                status: 200,
                stream_requests: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn stream_requests(&self) -> usize {
            self.stream_requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpClient for MockMediaClient {
        async fn get(&self, _url: &str) -> Result<BufferedResponse, reqwest::Error> {
            Ok(BufferedResponse {
                status: self.status,
                body: Bytes::from(self.response_data.clone()),
            })
        }

        async fn post_json(
            &self,
            url: &str,
            _body: Bytes,
        ) -> Result<BufferedResponse, reqwest::Error> {
            self.get(url).await
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.stream_requests.fetch_add(1, Ordering::SeqCst);

            let data = self.response_data.clone();
            let len = data.len() as u64;
            let half = data.len() / 2;
            let (first, second) = (data[..half].to_vec(), data[half..].to_vec());

            let stream: ByteStream = Box::pin(futures::stream::iter(vec![
                Ok(Bytes::from(first)),
                Ok(Bytes::from(second)),
            ]));

            Ok(HttpResponse {
                status: self.status,
                content_length: Some(len),
                body: stream,
            })
        }
    }

    const URL: &str = "https://media.example.com/dotnetrocks_1850.mp3";

    #[tokio::test]
    async fn download_writes_file_into_cache() {
        let dir = tempdir().unwrap();
        let cache = MediaCache::open(dir.path()).unwrap();
        let client = MockMediaClient::new(b"test audio content");
        let sink: SharedEventSink = NoopSink::shared();

        let guard = cache.begin_download(URL).unwrap();
        let result = download_to_cache(&client, &guard, &sink).await.unwrap();

        assert_eq!(result.bytes_downloaded, 18);
        assert!(result.content_hash.starts_with("sha256:"));
        assert_eq!(result.content_hash.len(), "sha256:".len() + 64);

        let content = std::fs::read(guard.path()).unwrap();
        assert_eq!(content, b"test audio content");
        assert!(!guard.partial_path().exists());
    }

    #[tokio::test]
    async fn download_reports_progress_events() {
        let dir = tempdir().unwrap();
        let cache = MediaCache::open(dir.path()).unwrap();
        let client = MockMediaClient::new(b"abcdef");
        let recorder = RecordingSink::new();
        let sink: SharedEventSink = recorder.clone();

        let guard = cache.begin_download(URL).unwrap();
        download_to_cache(&client, &guard, &sink).await.unwrap();

        let events = recorder.events();
        assert_eq!(
            events.first(),
            Some(&ViewModelEvent::DownloadStarting {
                url: URL.to_string(),
                content_length: Some(6),
            })
        );
        assert!(events.contains(&ViewModelEvent::DownloadProgress {
            url: URL.to_string(),
            bytes_downloaded: 3,
            total_bytes: Some(6),
        }));
        assert!(matches!(
            events.last(),
            Some(ViewModelEvent::DownloadCompleted {
                bytes_downloaded: 6,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn download_fails_on_http_error_and_leaves_no_file() {
        let dir = tempdir().unwrap();
        let cache = MediaCache::open(dir.path()).unwrap();
        let client = MockMediaClient {
            status: 404,
            ..MockMediaClient::new(b"Not Found")
        };
        let sink: SharedEventSink = NoopSink::shared();

        let guard = cache.begin_download(URL).unwrap();
        let result = download_to_cache(&client, &guard, &sink).await;

        match result.unwrap_err() {
            CacheError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
        assert!(!guard.path().exists());
        assert!(!guard.partial_path().exists());
    }
}
