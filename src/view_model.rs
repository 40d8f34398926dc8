// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{Show, ShowDetails, ShowsApi};
use crate::cache::{DownloadResult, MediaCache, cache_file_name, download_to_cache};
use crate::config::ViewModelConfig;
use crate::error::{CacheError, ViewModelError};
use crate::events::{SharedEventSink, ViewModelEvent};
use crate::http::HttpClient;
use crate::pagination::PaginationState;
use crate::playback::{
    EngineEvent, MediaEngine, PlaybackController, PlaybackState, format_time_remaining,
};

pub const STATUS_DOWNLOADING: &str = "Downloading...";
pub const STATUS_PLAYING_CACHED: &str = "Playing from Cache...";

type DownloadHandle = JoinHandle<Result<DownloadResult, CacheError>>;

/// Mutable state shared between commands and background downloads
#[derive(Debug)]
struct ViewState {
    pagination: PaginationState,
    all_shows: Vec<Show>,
    status: String,
    is_playing: bool,
    /// Cache path of the media most recently passed to `play`
    current_path: Option<PathBuf>,
    is_cached: bool,
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Status string and observable flags shared with the download tasks
#[derive(Clone)]
struct SharedState {
    state: Arc<Mutex<ViewState>>,
    sink: SharedEventSink,
}

impl SharedState {
    fn set_status(&self, status: &str) {
        self.update_status(status, false);
    }

    /// Set the status only while playback is active.
    ///
    /// The check and the write happen under one lock, so a `stop` that has
    /// already cleared `is_playing` always wins.
    fn set_status_while_playing(&self, status: &str) {
        self.update_status(status, true);
    }

    fn update_status(&self, status: &str, only_while_playing: bool) {
        let changed = {
            let mut state = lock(&self.state);
            if (only_while_playing && !state.is_playing) || state.status == status {
                false
            } else {
                state.status = status.to_string();
                true
            }
        };

        if changed {
            self.sink.emit(ViewModelEvent::StatusChanged {
                status: status.to_string(),
            });
        }
    }

    fn set_playing(&self, is_playing: bool) {
        let changed = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut state.is_playing, is_playing) != is_playing
        };

        if changed {
            self.sink
                .emit(ViewModelEvent::PlayingChanged { is_playing });
        }
    }

    /// Record that `path` now holds a complete download of `url`
    fn mark_cached(&self, url: &str, path: &Path) {
        let is_current = {
            let mut state = lock(&self.state);
            let is_current = state.current_path.as_deref() == Some(path);
            if is_current {
                state.is_cached = true;
            }
            is_current
        };

        debug!("Cache filled for {} (current: {})", url, is_current);
        self.sink.emit(ViewModelEvent::CachedChanged {
            url: url.to_string(),
            is_cached: true,
        });
    }
}

/// The home screen view-model: paginated show list plus cache-aware playback
///
/// Commands take `&self` and may be triggered concurrently; state changes
/// are published to the [`crate::EventSink`] given at construction.
pub struct HomeViewModel<A, E, C>
where
    A: ShowsApi,
    E: MediaEngine,
    C: HttpClient + Clone + 'static,
{
    api: A,
    http: C,
    show_name: String,
    cache: MediaCache,
    player: PlaybackController<E>,
    shared: SharedState,
    downloads: Mutex<HashMap<PathBuf, DownloadHandle>>,
}

impl<A, E, C> HomeViewModel<A, E, C>
where
    A: ShowsApi,
    E: MediaEngine,
    C: HttpClient + Clone + 'static,
{
    pub fn new(
        api: A,
        engine: Arc<E>,
        http: C,
        cache: MediaCache,
        config: &ViewModelConfig,
        sink: SharedEventSink,
    ) -> Self {
        let state = ViewState {
            pagination: PaginationState::new(config.page_size),
            all_shows: Vec::new(),
            status: String::new(),
            is_playing: false,
            current_path: None,
            is_cached: false,
        };

        Self {
            api,
            http,
            show_name: config.show_name.clone(),
            cache,
            player: PlaybackController::new(engine, sink.clone()),
            shared: SharedState {
                state: Arc::new(Mutex::new(state)),
                sink,
            },
            downloads: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        lock(&self.shared.state)
    }

    pub fn current_status(&self) -> String {
        self.state().status.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state().is_playing
    }

    /// Whether the media most recently played is in the local cache
    pub fn is_cached(&self) -> bool {
        self.state().is_cached
    }

    pub fn all_shows(&self) -> Vec<Show> {
        self.state().all_shows.clone()
    }

    pub fn show_count(&self) -> usize {
        self.state().all_shows.len()
    }

    pub fn show_numbers(&self) -> Vec<u32> {
        self.state().pagination.show_numbers().to_vec()
    }

    pub fn last_show_number(&self) -> u32 {
        self.state().pagination.last_show_number()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    /// Whether a cached file is currently held open for the engine
    pub fn has_open_stream(&self) -> bool {
        self.player.has_open_stream()
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Fetch the next page of shows and append it to the show list.
    ///
    /// The show number index is loaded on first use. Empty remote results
    /// leave all state untouched. Returns the number of shows appended.
    pub async fn load_next_batch(&self) -> Result<usize, ViewModelError> {
        let seeded = self.state().pagination.is_seeded();
        if !seeded {
            let numbers = self.api.get_show_numbers().await?;
            if !self.state().pagination.seed(numbers) {
                debug!("Show number index is empty");
                return Ok(0);
            }
            info!(
                "Loaded show number index, cursor at {}",
                self.last_show_number()
            );
        }

        let indexes = self.state().pagination.next_indexes();
        if indexes.is_empty() {
            debug!("No show numbers left below {}", self.last_show_number());
            return Ok(0);
        }

        let batch = self
            .api
            .get_by_show_numbers(&self.show_name, &indexes)
            .await?;
        if batch.is_empty() {
            debug!("Empty batch for {} requested show numbers", indexes.len());
            return Ok(0);
        }

        let added = batch.len();
        let total = {
            let mut state = self.state();
            state.pagination.advance(&batch);
            state.all_shows.extend(batch);
            state.all_shows.len()
        };

        debug!("Appended {} shows ({} total)", added, total);
        self.shared
            .sink
            .emit(ViewModelEvent::ShowsAppended { added, total });
        Ok(added)
    }

    /// Replace the show list with the full catalogue and summarize its first
    /// show in the status line.
    ///
    /// An empty catalogue leaves the current show list in place.
    pub async fn load_all_shows(&self) -> Result<usize, ViewModelError> {
        let mut shows = self.api.get_all_shows().await?;
        let Some(first_number) = shows.first().map(|show| show.show_number) else {
            debug!("Show catalogue is empty");
            return Ok(0);
        };

        let details = self.api.get_show_details(first_number).await?;
        let total = shows.len();
        let summary = details.guests.first().map(|guest| {
            format!(
                "{} shows downloaded. First show title: {}. The first guest is {} \
                 and the file can be downloaded at {}",
                total, shows[0].show_title, guest.name, details.file.url
            )
        });
        shows[0].show_details = Some(details);

        self.state().all_shows = shows;
        self.shared
            .sink
            .emit(ViewModelEvent::ShowsReplaced { total });

        let summary = summary.ok_or(ViewModelError::NoGuests(first_number))?;
        self.shared.set_status(&summary);
        Ok(total)
    }

    /// Fetch details for a show and attach them to every matching entry
    pub async fn load_show_details(&self, show_number: u32) -> Result<ShowDetails, ViewModelError> {
        let details = self.api.get_show_details(show_number).await?;

        {
            let mut state = self.state();
            for show in state
                .all_shows
                .iter_mut()
                .filter(|show| show.show_number == show_number)
            {
                show.show_details = Some(details.clone());
            }
        }

        self.shared
            .sink
            .emit(ViewModelEvent::ShowDetailsLoaded { show_number });
        Ok(details)
    }

    /// Play the media at `url`, from the local cache when it is there.
    ///
    /// Uncached media is streamed from the network while a background
    /// download fills the cache. Download failures never fail this command.
    pub async fn play(&self, url: &str) -> Result<(), ViewModelError> {
        let path = self.cache.path_for(url)?;
        let name = cache_file_name(url)?;
        let cached = self.cache.is_cached(url).await?;

        {
            let mut state = self.state();
            state.current_path = Some(path.clone());
            state.is_cached = cached;
        }
        self.shared.sink.emit(ViewModelEvent::CachedChanged {
            url: url.to_string(),
            is_cached: cached,
        });
        self.shared.set_playing(true);

        let result = if cached {
            info!("Playing {} from cache", name);
            self.shared.set_status(STATUS_PLAYING_CACHED);
            self.player.play_cached(&path, &name).await
        } else {
            info!("Streaming {}", url);
            self.shared.set_status(STATUS_DOWNLOADING);
            self.player.play_remote(url).await
        };

        if let Err(e) = result {
            self.shared.set_playing(false);
            self.shared.set_status("");
            return Err(e.into());
        }

        if !cached {
            self.start_download(url);
        }
        Ok(())
    }

    /// Start filling the cache for `url` unless a download of the same cache
    /// path is already running.
    fn start_download(&self, url: &str) {
        let guard = match self.cache.begin_download(url) {
            Ok(guard) => guard,
            Err(CacheError::DownloadInProgress { .. }) => {
                debug!("Download of {} already running", url);
                return;
            }
            Err(e) => {
                warn!("Could not start download of {}: {}", url, e);
                return;
            }
        };

        let http = self.http.clone();
        let shared = self.shared.clone();
        let path = guard.path().to_path_buf();

        let handle = tokio::spawn(async move {
            let result = download_to_cache(&http, &guard, &shared.sink).await;
            match &result {
                Ok(_) => shared.mark_cached(guard.url(), guard.path()),
                Err(e) => {
                    warn!("Failed to cache {}: {}", guard.url(), e);
                    shared.sink.emit(ViewModelEvent::DownloadFailed {
                        url: guard.url().to_string(),
                        error: e.to_string(),
                    });
                }
            }
            result
        });

        let mut downloads = self.downloads.lock().unwrap_or_else(PoisonError::into_inner);
        downloads.retain(|_, handle| !handle.is_finished());
        downloads.insert(path, handle);
    }

    /// Wait for the background downloads still tracked.
    ///
    /// Cancelled downloads are skipped. Starting a new download forgets the
    /// handles of downloads that already finished.
    pub async fn wait_for_downloads(&self) -> Vec<Result<DownloadResult, CacheError>> {
        let handles: Vec<DownloadHandle> = self
            .downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(result) = handle.await {
                results.push(result);
            }
        }
        results
    }

    /// Abort every running background download; partial files are removed
    /// the next time the cache is opened.
    pub fn cancel_downloads(&self) {
        let mut downloads = self
            .downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (path, handle) in downloads.drain() {
            if !handle.is_finished() {
                debug!("Cancelling download to {}", path.display());
                handle.abort();
            }
        }
    }

    /// Stop playback and release any open local stream.
    ///
    /// In-flight cache downloads keep running.
    pub async fn stop(&self) -> Result<(), ViewModelError> {
        self.shared.set_playing(false);
        self.shared.set_status("");
        self.player.stop().await?;
        Ok(())
    }

    /// Apply a notification pushed by the media engine
    pub async fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::PositionChanged { position, duration } => {
                self.shared
                    .set_status_while_playing(&format_time_remaining(position, duration));
            }
            EngineEvent::MediaFinished => {
                self.shared.set_playing(false);
                self.shared.set_status("");
                self.player.finished().await;
            }
        }
    }
}

impl<A, E, C> HomeViewModel<A, E, C>
where
    A: ShowsApi + 'static,
    E: MediaEngine + 'static,
    C: HttpClient + Clone + 'static,
{
    /// Feed engine notifications from `events` into the view-model until the
    /// channel closes
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<EngineEvent>,
    ) -> JoinHandle<()> {
        let view_model = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                view_model.handle_engine_event(event).await;
            }
            debug!("Engine event channel closed");
        })
    }
}

impl<A, E, C> Drop for HomeViewModel<A, E, C>
where
    A: ShowsApi,
    E: MediaEngine,
    C: HttpClient + Clone + 'static,
{
    fn drop(&mut self) {
        self.cancel_downloads();
    }
}
