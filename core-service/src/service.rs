//! Player service
//!
//! One controller owning one [`PlayerSession`]. Each public method maps to a
//! user-facing command (load, cache all, refresh status, start, stop,
//! select, clear cache).

use crate::error::{CoreError, Result};
use bridge_traits::background::{LifecycleObserver, LifecycleState};
use bridge_traits::media::{MediaEvent, MediaSink};
use bridge_traits::storage::KeyValueStore;
use core_playback::{
    CacheConfig, CacheIndex, CacheReport, CacheWriter, ClearReport, LifecycleCoordinator,
    LifecycleOutcome, PlaybackCursor, PlaybackState, PlayerSession, Playlist, RehydrateReport,
    Transition,
};
use core_runtime::config::AppConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::logging::redact_url;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Fast-store key holding the raw text of the last loaded playlist.
pub const LAST_INPUT_KEY: &str = "last-playlist-input";

/// Cache state of one playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "message")]
pub enum CacheStatus {
    Cached,
    NotCached,
    /// The status could not be determined.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStatus {
    pub index: usize,
    pub url: String,
    pub status: CacheStatus,
}

/// Controller façade over the cache and playback core.
pub struct PlayerService {
    index: Arc<CacheIndex>,
    writer: Arc<CacheWriter>,
    cursor: Arc<PlaybackCursor>,
    lifecycle: Arc<LifecycleCoordinator>,
    session: Arc<Mutex<PlayerSession>>,
    store: Arc<dyn KeyValueStore>,
    sink: Arc<dyn MediaSink>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    event_bus: EventBus,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl PlayerService {
    /// Wire the core from runtime capabilities and cache settings.
    pub fn new(config: &AppConfig, cache: CacheConfig) -> Result<Self> {
        config.validate()?;
        cache.validate().map_err(CoreError::Config)?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let index = Arc::new(
            CacheIndex::new(
                config.key_value_store.clone(),
                config.file_system.clone(),
                config.clock.clone(),
                cache,
            )
            .with_event_bus(event_bus.clone()),
        );
        let writer = Arc::new(CacheWriter::new(index.clone(), config.http_client.clone()));
        let cursor = Arc::new(
            PlaybackCursor::new(index.clone(), config.media_sink.clone())
                .with_event_bus(event_bus.clone()),
        );
        let lifecycle = Arc::new(
            LifecycleCoordinator::new(index.clone(), cursor.clone())
                .with_event_bus(event_bus.clone()),
        );

        Ok(Self {
            index,
            writer,
            cursor,
            lifecycle,
            session: Arc::new(Mutex::new(PlayerSession::default())),
            store: config.key_value_store.clone(),
            sink: config.media_sink.clone(),
            lifecycle_observer: config.lifecycle_observer.clone(),
            event_bus,
            tasks: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to cache, playback and lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub fn cache_index(&self) -> &Arc<CacheIndex> {
        &self.index
    }

    pub fn caching_supported(&self) -> bool {
        self.index.caching_supported()
    }

    /// Prepare the cache directory and rehydrate the index from the manifest.
    ///
    /// Failures are logged; the service stays usable (at worst stream-only).
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> RehydrateReport {
        if !self.index.caching_supported() {
            info!("File store unavailable; videos will be streamed");
            return RehydrateReport::default();
        }

        if let Err(e) = self.index.initialize().await {
            error!(error = %e, "Error initializing cache directory");
        }

        match self.index.rehydrate().await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Error loading cache status");
                RehydrateReport::default()
            }
        }
    }

    // ========================================================================
    // Playlist
    // ========================================================================

    /// Parse and load a playlist, replacing the current one.
    ///
    /// Playback of the previous playlist is stopped. The raw input is kept
    /// in the fast store for [`last_input`](Self::last_input).
    #[instrument(skip(self, input))]
    pub async fn load_playlist(&self, input: &str) -> Result<usize> {
        let playlist = Playlist::parse(input).map_err(core_playback::PlaybackError::from)?;
        let count = playlist.len();

        {
            let mut session = self.session.lock().await;
            if session.state().is_playing() {
                if let Err(e) = self.cursor.stop(&mut session).await {
                    warn!(error = %e, "Failed to stop previous playlist");
                }
            }
            session.load(playlist);
        }

        if let Err(e) = self.store.set(LAST_INPUT_KEY, input).await {
            warn!(error = %e, "Failed to remember playlist input");
        }

        info!(count, "Loaded video URLs");
        Ok(count)
    }

    /// Raw text of the last successfully loaded playlist.
    pub async fn last_input(&self) -> Result<Option<String>> {
        self.store
            .get(LAST_INPUT_KEY)
            .await
            .map_err(|e| CoreError::Playback(core_playback::PlaybackError::store(e)))
    }

    pub async fn playlist(&self) -> Playlist {
        self.session.lock().await.playlist().clone()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.session.lock().await.state().clone()
    }

    // ========================================================================
    // Caching
    // ========================================================================

    /// Cache every playlist entry, one at a time.
    ///
    /// The session lock is not held while downloading, so playback commands
    /// stay responsive. A concurrent call fails with a busy error.
    pub async fn cache_all(&self) -> Result<CacheReport> {
        let entries = {
            let session = self.session.lock().await;
            session.playlist().entries().to_vec()
        };
        if entries.is_empty() {
            return Err(CoreError::EmptyPlaylist);
        }

        Ok(self.writer.cache_all(&entries).await?)
    }

    /// Cache status of every playlist entry. Stale records are evicted.
    #[instrument(skip(self))]
    pub async fn refresh_status(&self) -> Vec<EntryStatus> {
        let playlist = self.playlist().await;

        let mut statuses = Vec::with_capacity(playlist.len());
        for entry in playlist.iter() {
            let status = match self.index.is_cached(&entry.url).await {
                Ok(true) => CacheStatus::Cached,
                Ok(false) => CacheStatus::NotCached,
                Err(e) => {
                    warn!(url = %redact_url(&entry.url), error = %e, "Cannot determine cache status");
                    CacheStatus::Error(e.to_string())
                }
            };
            statuses.push(EntryStatus {
                index: entry.index,
                url: entry.url.clone(),
                status,
            });
        }

        debug!(entries = statuses.len(), "Cache status refreshed");
        statuses
    }

    /// Whether `start` would find something to play.
    pub async fn can_start(&self) -> bool {
        let playlist = self.playlist().await;
        let available = self.cursor.first_playable(&playlist).await.is_some();
        if available {
            debug!("Cached videos available for playback");
        } else {
            info!("No cached videos available for playback");
        }
        available
    }

    /// Remove every record, cached file and the manifest.
    pub async fn clear_cache(&self) -> Result<ClearReport> {
        Ok(self.index.remove_all().await?)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    pub async fn start(&self) -> Result<Transition> {
        let mut session = self.session.lock().await;
        if session.playlist().is_empty() {
            return Err(CoreError::EmptyPlaylist);
        }
        Ok(self.cursor.start(&mut session).await?)
    }

    pub async fn stop(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        Ok(self.cursor.stop(&mut session).await?)
    }

    /// Jump to `index`; ignored unless playing.
    pub async fn select(&self, index: usize) -> Result<Transition> {
        let mut session = self.session.lock().await;
        Ok(self.cursor.select(&mut session, index).await?)
    }

    /// Feed a media sink event into the cursor.
    pub async fn handle_media_event(&self, event: MediaEvent) -> Result<Transition> {
        let mut session = self.session.lock().await;
        Ok(self.cursor.on_media_event(&mut session, event).await?)
    }

    /// Feed a lifecycle transition into the coordinator.
    pub async fn handle_lifecycle(&self, state: LifecycleState) -> LifecycleOutcome {
        let mut session = self.session.lock().await;
        self.lifecycle.handle(&mut session, state).await
    }

    // ========================================================================
    // Event loops
    // ========================================================================

    /// Start forwarding media sink and lifecycle events into the session.
    pub async fn spawn_event_loops(&self) -> Result<()> {
        let mut media = self
            .sink
            .subscribe_events()
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        let session = self.session.clone();
        let cursor = self.cursor.clone();
        let media_task = tokio::spawn(async move {
            while let Some(event) = media.next().await {
                let mut session = session.lock().await;
                if let Err(e) = cursor.on_media_event(&mut session, event).await {
                    warn!(error = %e, "Failed to advance playback");
                }
            }
            debug!("Media event stream closed");
        });
        self.tasks.lock().push(media_task);

        if let Some(observer) = &self.lifecycle_observer {
            let mut changes = observer
                .subscribe_changes()
                .await
                .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
            let session = self.session.clone();
            let lifecycle = self.lifecycle.clone();
            let lifecycle_task = tokio::spawn(async move {
                while let Some(state) = changes.next().await {
                    let mut session = session.lock().await;
                    lifecycle.handle(&mut session, state).await;
                }
                debug!("Lifecycle stream closed");
            });
            self.tasks.lock().push(lifecycle_task);
        }

        Ok(())
    }

    /// Stop playback, checkpoint the index and end the event loops.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Failed to stop playback");
        }
        if self.index.caching_supported() {
            if let Err(e) = self.index.flush().await {
                warn!(error = %e, "Failed to save cache status");
            }
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for PlayerService {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
