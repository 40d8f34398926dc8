use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::CacheError;

use super::filename::cache_file_name;

/// Suffix of files that are still being downloaded
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Local store of downloaded media files, one file per media URL
#[derive(Debug, Clone)]
pub struct MediaCache {
    cache_dir: PathBuf,
    /// Cache paths with a download currently running
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Exclusive claim on downloading one cache path.
///
/// The claim is released when the guard is dropped.
#[derive(Debug)]
pub struct DownloadGuard {
    url: String,
    path: PathBuf,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl DownloadGuard {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Final location of the cached file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location the download is written to before it is moved into place
    pub fn partial_path(&self) -> PathBuf {
        partial_path(&self.path)
    }
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        lock_in_flight(&self.in_flight).remove(&self.path);
    }
}

fn lock_in_flight(in_flight: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

impl MediaCache {
    /// Open the cache rooted at `cache_dir`, creating it if needed.
    ///
    /// Leftover `.partial` files from interrupted downloads are removed.
    pub fn open(cache_dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir).map_err(|e| {
                CacheError::CreateDirectoryFailed {
                    path: cache_dir.clone(),
                    source: e,
                }
            })?;
            info!("Created cache directory: {}", cache_dir.display());
        } else {
            let cleaned = clean_partial_files(&cache_dir)?;
            if cleaned > 0 {
                info!(
                    "Removed {} partial downloads from {}",
                    cleaned,
                    cache_dir.display()
                );
            }
        }

        Ok(Self {
            cache_dir,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path the media at `url` is cached under
    pub fn path_for(&self, url: &str) -> Result<PathBuf, CacheError> {
        Ok(self.cache_dir.join(cache_file_name(url)?))
    }

    /// Whether a cached file exists for `url`
    pub async fn is_cached(&self, url: &str) -> Result<bool, CacheError> {
        let path = self.path_for(url)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CacheError::LookupFailed {
                path: path.clone(),
                source: e,
            })?;
        debug!("Cache lookup for {} -> {}", url, exists);
        Ok(exists)
    }

    /// Whether a download for `url` is currently running
    pub fn is_downloading(&self, url: &str) -> bool {
        let Ok(path) = self.path_for(url) else {
            return false;
        };
        lock_in_flight(&self.in_flight).contains(&path)
    }

    /// Claim the download of `url`.
    ///
    /// Fails with [`CacheError::DownloadInProgress`] while another guard for
    /// the same cache path is alive.
    pub fn begin_download(&self, url: &str) -> Result<DownloadGuard, CacheError> {
        let path = self.path_for(url)?;

        if !lock_in_flight(&self.in_flight).insert(path.clone()) {
            return Err(CacheError::DownloadInProgress {
                url: url.to_string(),
            });
        }

        Ok(DownloadGuard {
            url: url.to_string(),
            path,
            in_flight: self.in_flight.clone(),
        })
    }
}

/// Delete `.partial` files in `dir`, returning how many were removed
fn clean_partial_files(dir: &Path) -> Result<usize, CacheError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CacheError::ReadDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut cleaned = 0;
    for entry in entries {
        let entry = entry.map_err(|e| CacheError::ReadDirectoryFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let is_partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));

        if is_partial && std::fs::remove_file(&path).is_ok() {
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
