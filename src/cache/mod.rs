mod download;
mod filename;
mod store;

pub use download::{DownloadResult, download_to_cache};
pub use filename::cache_file_name;
pub use store::{DownloadGuard, MediaCache, PARTIAL_SUFFIX};

#[cfg(test)]
pub(crate) use download::tests::MockMediaClient;
