//! # Playback Cursor
//!
//! Walks a [`PlayerSession`]'s playlist in order, preferring cached copies
//! and streaming everything else.
//!
//! ```text
//!          start (some entry cached)
//!   Idle ─────────────────────────────> Playing ──┐ ended / error / select
//!                                        │   ^    │ (advance)
//!              stop / past last entry    │   └────┘
//!                                        v
//!                                     Stopped ──── start ───> Playing
//! ```
//!
//! An entry whose cached copy cannot be resolved is skipped in favor of the
//! next index, so one broken file never stalls the playlist. Every event
//! handler re-checks the playing flag when it runs, which makes a late
//! end-of-media notification after [`PlaybackCursor::stop`] a no-op.
//! [`PlaybackCursor::on_media_event`] additionally drops sink events whose
//! generation is not the one currently rendering, so an event queued before
//! a stop and restart cannot advance the new run.

use crate::cache::CacheIndex;
use crate::error::{PlaybackError, Result};
use crate::playlist::{Playlist, PlaylistEntry};
use crate::session::PlayerSession;
use bridge_traits::media::{MediaEvent, MediaSink, MediaSource};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of a cursor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The sink is now rendering `source` for entry `index`.
    Playing { index: usize, source: MediaSource },
    /// The cursor ran past the last entry; playback stopped normally.
    Completed,
    /// The command does not apply in the current state.
    Ignored,
}

/// Drives the media sink through a session's playlist.
pub struct PlaybackCursor {
    index: Arc<CacheIndex>,
    sink: Arc<dyn MediaSink>,
    event_bus: Option<EventBus>,
}

impl PlaybackCursor {
    pub fn new(index: Arc<CacheIndex>, sink: Arc<dyn MediaSink>) -> Self {
        Self {
            index,
            sink,
            event_bus: None,
        }
    }

    /// Publish playback events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn sink(&self) -> &Arc<dyn MediaSink> {
        &self.sink
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }

    /// Lowest index whose URL is cached.
    ///
    /// Without a file store nothing can be cached, and playback streams
    /// from the first entry.
    pub async fn first_playable(&self, playlist: &Playlist) -> Option<usize> {
        if playlist.is_empty() {
            return None;
        }
        if !self.index.caching_supported() {
            return Some(0);
        }

        for entry in playlist.iter() {
            match self.index.is_cached(&entry.url).await {
                Ok(true) => return Some(entry.index),
                Ok(false) => {}
                Err(e) => warn!(
                    index = entry.index,
                    url = %redact_url(&entry.url),
                    error = %e,
                    "Cannot check cache status"
                ),
            }
        }
        None
    }

    /// Begin playback at the first cached entry.
    ///
    /// Fails with [`PlaybackError::NothingToPlay`] when no entry is cached.
    #[instrument(skip(self, session))]
    pub async fn start(&self, session: &mut PlayerSession) -> Result<Transition> {
        if session.state().is_playing() {
            debug!("Already playing");
            return Ok(Transition::Ignored);
        }

        let Some(first) = self.first_playable(session.playlist()).await else {
            info!("No cached videos available for playback");
            return Err(PlaybackError::NothingToPlay);
        };

        info!(index = first, "Starting video playback");
        session.state_mut().begin(first);
        self.play_from(session, first).await
    }

    /// Route a sink event to [`on_ended`](Self::on_ended) or
    /// [`on_error`](Self::on_error).
    ///
    /// Events about a source other than the one being rendered are ignored.
    pub async fn on_media_event(
        &self,
        session: &mut PlayerSession,
        event: MediaEvent,
    ) -> Result<Transition> {
        if session.state().generation() != Some(event.generation()) {
            debug!(
                generation = event.generation(),
                current = ?session.state().generation(),
                "Ignoring event for a replaced source"
            );
            return Ok(Transition::Ignored);
        }

        match event {
            MediaEvent::Ended { .. } => self.on_ended(session).await,
            MediaEvent::Error { message, .. } => self.on_error(session, &message).await,
        }
    }

    /// The current entry played to its end; move to the next one.
    #[instrument(skip(self, session))]
    pub async fn on_ended(&self, session: &mut PlayerSession) -> Result<Transition> {
        if !session.state().is_playing() {
            return Ok(Transition::Ignored);
        }

        let next = session.state().cursor().map_or(0, |cursor| cursor + 1);
        info!(next, "Video ended, playing next video");
        self.play_from(session, next).await
    }

    /// The sink failed on the current entry; skip to the next one.
    #[instrument(skip(self, session))]
    pub async fn on_error(&self, session: &mut PlayerSession, message: &str) -> Result<Transition> {
        if !session.state().is_playing() {
            return Ok(Transition::Ignored);
        }

        let current = session.state().cursor().unwrap_or(0);
        if let Some(entry) = session.playlist().get(current).cloned() {
            self.skip(&entry, message);
        }
        self.play_from(session, current + 1).await
    }

    /// Jump to `index`. Only honored while playing.
    #[instrument(skip(self, session))]
    pub async fn select(&self, session: &mut PlayerSession, index: usize) -> Result<Transition> {
        if !session.state().is_playing() {
            debug!(index, "Selection ignored while not playing");
            return Ok(Transition::Ignored);
        }

        let len = session.playlist().len();
        if index >= len {
            return Err(PlaybackError::InvalidIndex { index, len });
        }

        self.play_from(session, index).await
    }

    /// Halt the sink and release its source. Safe to call repeatedly.
    #[instrument(skip(self, session))]
    pub async fn stop(&self, session: &mut PlayerSession) -> Result<()> {
        let was_playing = session.state().is_playing();
        if was_playing {
            session.state_mut().stop();
        }

        let halted = self.sink.stop().await.map_err(PlaybackError::sink);

        if was_playing {
            info!("Playback stopped");
            self.emit(PlaybackEvent::Stopped);
        }
        halted
    }

    /// Pause rendering while keeping the session playing.
    ///
    /// Returns `true` if the sink was actually paused.
    pub async fn suspend(&self, session: &mut PlayerSession) -> Result<bool> {
        let state = session.state();
        if !state.is_playing() || state.is_suspended() {
            return Ok(false);
        }
        if self.sink.is_paused().await {
            return Ok(false);
        }

        self.sink.pause().await.map_err(PlaybackError::sink)?;
        session.state_mut().set_suspended(true);
        info!("Playback paused due to app entering background");
        self.emit(PlaybackEvent::Paused);
        Ok(true)
    }

    /// Undo [`suspend`](Self::suspend). Does nothing if playback was stopped
    /// in the meantime.
    pub async fn resume(&self, session: &mut PlayerSession) -> Result<bool> {
        if !session.state().is_suspended() {
            return Ok(false);
        }
        session.state_mut().set_suspended(false);
        if !session.state().is_playing() {
            return Ok(false);
        }

        self.sink.play().await.map_err(PlaybackError::sink)?;
        info!("Playback resumed");
        self.emit(PlaybackEvent::Resumed);
        Ok(true)
    }

    async fn play_from(&self, session: &mut PlayerSession, start: usize) -> Result<Transition> {
        let mut position = start;
        loop {
            let Some(entry) = session.playlist().get(position).cloned() else {
                return Ok(self.complete(session, position).await);
            };

            let rendered = match self.resolve(&entry).await {
                Ok(source) => self.render(&source).await.map(|generation| (source, generation)),
                Err(e) => Err(e),
            };

            match rendered {
                Ok((source, generation)) => {
                    let state = session.state_mut();
                    state.set_cursor(position);
                    state.set_generation(generation);
                    state.set_suspended(false);

                    let local = !source.is_remote();
                    if local {
                        info!(index = position, url = %redact_url(&entry.url), "Now playing cached video");
                    } else {
                        info!(index = position, url = %redact_url(&entry.url), "Now playing streamed video");
                    }
                    self.emit(PlaybackEvent::Started {
                        index: position,
                        url: entry.url.clone(),
                        local,
                    });
                    return Ok(Transition::Playing {
                        index: position,
                        source,
                    });
                }
                Err(e) => self.skip(&entry, &e.to_string()),
            }

            position += 1;
        }
    }

    async fn resolve(&self, entry: &PlaylistEntry) -> Result<MediaSource> {
        let stream = || MediaSource::RemoteStream {
            url: entry.url.clone(),
        };

        if !self.index.caching_supported() {
            return Ok(stream());
        }

        let record = match self.index.lookup(&entry.url).await {
            Ok(record) => record,
            Err(e) => {
                warn!(url = %redact_url(&entry.url), error = %e, "Cannot read cache status, streaming");
                None
            }
        };

        match record {
            Some(record) => {
                let path = self.index.local_path(&record).await?;
                Ok(MediaSource::LocalFile { path })
            }
            None => Ok(stream()),
        }
    }

    async fn render(&self, source: &MediaSource) -> Result<u64> {
        let generation = self
            .sink
            .set_source(source.clone())
            .await
            .map_err(PlaybackError::sink)?;
        self.sink.play().await.map_err(PlaybackError::sink)?;
        Ok(generation)
    }

    fn skip(&self, entry: &PlaylistEntry, reason: &str) {
        warn!(
            index = entry.index,
            url = %redact_url(&entry.url),
            reason,
            "Error playing video, trying next"
        );
        self.emit(PlaybackEvent::EntrySkipped {
            index: entry.index,
            url: entry.url.clone(),
            reason: reason.to_string(),
        });
    }

    async fn complete(&self, session: &mut PlayerSession, position: usize) -> Transition {
        let state = session.state_mut();
        state.set_cursor(position);
        state.stop();

        if let Err(e) = self.sink.stop().await {
            warn!(error = %e, "Failed to release media sink");
        }

        info!("End of playlist reached");
        self.emit(PlaybackEvent::PlaylistCompleted);
        Transition::Completed
    }
}
