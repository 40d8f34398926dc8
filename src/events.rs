use std::sync::Arc;

use crate::playback::PlaybackState;

/// State changes published by the view-model for a UI layer to render
#[derive(Debug, Clone, PartialEq)]
pub enum ViewModelEvent {
    /// The human-readable status line changed
    StatusChanged { status: String },

    /// Playback started or stopped
    PlayingChanged { is_playing: bool },

    /// The playback state machine moved
    PlaybackStateChanged { state: PlaybackState },

    /// Cache presence for a media URL changed
    CachedChanged { url: String, is_cached: bool },

    /// A batch of shows was appended to the show list
    ShowsAppended { added: usize, total: usize },

    /// The show list was replaced by a full catalogue load
    ShowsReplaced { total: usize },

    /// Details for a show were fetched
    ShowDetailsLoaded { show_number: u32 },

    /// A background cache download is starting
    DownloadStarting {
        url: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Cache download progress update
    DownloadProgress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A cache download completed and the file is in place
    DownloadCompleted {
        url: String,
        bytes_downloaded: u64,
        content_hash: String,
    },

    /// A cache download failed; playback is unaffected
    DownloadFailed { url: String, error: String },
}

/// Receiver for view-model events.
///
/// Implementations can forward events to a UI, draw progress bars or
/// collect them for assertions.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ViewModelEvent);
}

/// A shared reference to an event sink
pub type SharedEventSink = Arc<dyn EventSink>;

/// An event sink that silently ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: ViewModelEvent) {
        // Intentionally empty
    }
}

impl NoopSink {
    /// Create a new NoopSink wrapped in an Arc
    pub fn shared() -> SharedEventSink {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// An event sink that records every event in order
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        events: Mutex<Vec<ViewModelEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Copy of all events received so far
        pub(crate) fn events(&self) -> Vec<ViewModelEvent> {
            self.events
                .lock()
                .map(|events| events.clone())
                .unwrap_or_default()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: ViewModelEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    #[test]
    fn noop_sink_handles_all_events() {
        let sink = NoopSink;

        sink.emit(ViewModelEvent::StatusChanged {
            status: "Downloading...".to_string(),
        });
        sink.emit(ViewModelEvent::PlayingChanged { is_playing: true });
        sink.emit(ViewModelEvent::PlaybackStateChanged {
            state: PlaybackState::PlayingRemote,
        });
        sink.emit(ViewModelEvent::CachedChanged {
            url: "https://example.com/a.mp3".to_string(),
            is_cached: true,
        });
        sink.emit(ViewModelEvent::ShowsAppended { added: 3, total: 3 });
        sink.emit(ViewModelEvent::ShowsReplaced { total: 1900 });
        sink.emit(ViewModelEvent::ShowDetailsLoaded { show_number: 1 });
        sink.emit(ViewModelEvent::DownloadStarting {
            url: "https://example.com/a.mp3".to_string(),
            content_length: Some(1024),
        });
        sink.emit(ViewModelEvent::DownloadProgress {
            url: "https://example.com/a.mp3".to_string(),
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });
        sink.emit(ViewModelEvent::DownloadCompleted {
            url: "https://example.com/a.mp3".to_string(),
            bytes_downloaded: 1024,
            content_hash: "sha256:abc123".to_string(),
        });
        sink.emit(ViewModelEvent::DownloadFailed {
            url: "https://example.com/a.mp3".to_string(),
            error: "Connection reset".to_string(),
        });
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(ViewModelEvent::PlayingChanged { is_playing: true });
        sink.emit(ViewModelEvent::PlayingChanged { is_playing: false });

        assert_eq!(
            sink.events(),
            vec![
                ViewModelEvent::PlayingChanged { is_playing: true },
                ViewModelEvent::PlayingChanged { is_playing: false },
            ]
        );
    }
}
