use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::events::{SharedEventSink, ViewModelEvent};

/// Where the player currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Remote playback requested; the engine has not confirmed yet
    Downloading,
    PlayingRemote,
    PlayingCached,
    Stopped,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        matches!(
            self,
            PlaybackState::Downloading | PlaybackState::PlayingRemote | PlaybackState::PlayingCached
        )
    }
}

/// Notifications pushed by a media engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    PositionChanged { position: Duration, duration: Duration },
    MediaFinished,
}

/// A readable handle on a cached media file that the owner can close
/// underneath the engine.
///
/// Clones share the same file. Once [`LocalStream::close`] has run the file
/// descriptor is released and every clone reads as closed.
#[derive(Debug, Clone)]
pub struct LocalStream {
    name: String,
    file: Arc<tokio::sync::Mutex<Option<File>>>,
}

impl LocalStream {
    /// Open `path` for reading
    pub async fn open(path: &Path, name: &str) -> io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            name: name.to_string(),
            file: Arc::new(tokio::sync::Mutex::new(Some(file))),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the next chunk into `buf`, returning 0 at end of file
    pub async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.lock().await.as_mut() {
            Some(file) => file.read(buf).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "local stream has been closed",
            )),
        }
    }

    /// Read everything that is left in the stream
    pub async fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        match self.file.lock().await.as_mut() {
            Some(file) => {
                file.read_to_end(&mut data).await?;
                Ok(data)
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "local stream has been closed",
            )),
        }
    }

    /// Release the underlying file. Closing twice is a no-op.
    pub async fn close(&self) {
        self.file.lock().await.take();
    }

    pub async fn is_open(&self) -> bool {
        self.file.lock().await.is_some()
    }
}

/// The external media player the controller drives
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Start streaming playback of a remote URL
    async fn play_url(&self, url: &str) -> Result<(), PlaybackError>;

    /// Start playback of a local byte stream
    async fn play_stream(&self, stream: LocalStream, name: &str) -> Result<(), PlaybackError>;

    async fn stop(&self) -> Result<(), PlaybackError>;
}

/// Format the status line shown while media is playing
///
/// Minutes are total minutes, so a remaining time above an hour reads as
/// e.g. `75:03`.
pub fn format_time_remaining(position: Duration, duration: Duration) -> String {
    let remaining = duration.saturating_sub(position).as_secs();
    format!(
        "Time Remaining: {:02}:{:02}",
        remaining / 60,
        remaining % 60
    )
}

/// Wraps a [`MediaEngine`] with the playback state machine and ownership of
/// the open local stream.
pub struct PlaybackController<E: MediaEngine> {
    engine: Arc<E>,
    state: Mutex<PlaybackState>,
    stream: Mutex<Option<LocalStream>>,
    sink: SharedEventSink,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(engine: Arc<E>, sink: SharedEventSink) -> Self {
        Self {
            engine,
            state: Mutex::new(PlaybackState::Idle),
            stream: Mutex::new(None),
            sink,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing()
    }

    /// Whether a local stream is currently held open
    pub fn has_open_stream(&self) -> bool {
        self.stream
            .lock()
            .map(|stream| stream.is_some())
            .unwrap_or(false)
    }

    fn set_state(&self, next: PlaybackState) {
        let changed = match self.state.lock() {
            Ok(mut state) if *state != next => {
                *state = next;
                true
            }
            _ => false,
        };

        if changed {
            debug!("Playback state -> {:?}", next);
            self.sink
                .emit(ViewModelEvent::PlaybackStateChanged { state: next });
        }
    }

    /// Close and forget the current local stream, if any
    async fn release_stream(&self) {
        let stream = self.stream.lock().ok().and_then(|mut stream| stream.take());
        if let Some(stream) = stream {
            debug!("Releasing local stream {}", stream.name());
            stream.close().await;
        }
    }

    /// Stream `url` from the network
    pub async fn play_remote(&self, url: &str) -> Result<(), PlaybackError> {
        self.release_stream().await;
        self.set_state(PlaybackState::Downloading);

        if let Err(e) = self.engine.play_url(url).await {
            self.set_state(PlaybackState::Idle);
            return Err(e);
        }

        self.set_state(PlaybackState::PlayingRemote);
        Ok(())
    }

    /// Play the cached file at `path`
    pub async fn play_cached(&self, path: &Path, name: &str) -> Result<(), PlaybackError> {
        self.release_stream().await;

        let stream = LocalStream::open(path, name).await?;
        if let Ok(mut current) = self.stream.lock() {
            *current = Some(stream.clone());
        }
        self.set_state(PlaybackState::PlayingCached);

        if let Err(e) = self.engine.play_stream(stream, name).await {
            self.release_stream().await;
            self.set_state(PlaybackState::Idle);
            return Err(e);
        }

        Ok(())
    }

    /// Stop the engine and release the local stream.
    ///
    /// The stream is released even when the engine reports an error.
    pub async fn stop(&self) -> Result<(), PlaybackError> {
        let result = self.engine.stop().await;
        if let Err(e) = &result {
            warn!("Media engine failed to stop: {}", e);
        }

        self.release_stream().await;
        self.set_state(PlaybackState::Stopped);
        result
    }

    /// The engine reported the end of the current item
    pub async fn finished(&self) {
        self.release_stream().await;
        self.set_state(PlaybackState::Idle);
    }
}
