use url::Url;

use crate::error::CacheError;

/// Derive the cache file name from the last path segment of a media URL
///
/// The segment is sanitized so it is safe to use as a file name on every
/// platform. Query strings and fragments are ignored.
pub fn cache_file_name(media_url: &str) -> Result<String, CacheError> {
    let url = Url::parse(media_url).map_err(|e| CacheError::InvalidUrl {
        url: media_url.to_string(),
        source: e,
    })?;

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let sanitized = sanitize_filename::sanitize(segment);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return Err(CacheError::MissingFileName {
            url: media_url.to_string(),
        });
    }

    Ok(sanitized)
}
