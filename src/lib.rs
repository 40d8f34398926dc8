pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod pagination;
pub mod playback;
pub mod view_model;

// Re-export main types for convenience
pub use api::{Guest, HttpShowsApi, MediaFile, Show, ShowDetails, ShowsApi};
pub use cache::{DownloadResult, MediaCache, cache_file_name, download_to_cache};
pub use config::ViewModelConfig;
pub use error::{ApiError, CacheError, ConfigError, PlaybackError, ViewModelError};
pub use events::{EventSink, NoopSink, SharedEventSink, ViewModelEvent};
pub use http::{BufferedResponse, HttpClient, HttpResponse, ReqwestClient};
pub use pagination::PaginationState;
pub use playback::{
    EngineEvent, LocalStream, MediaEngine, PlaybackController, PlaybackState,
    format_time_remaining,
};
pub use view_model::HomeViewModel;
