//! Player session state

use crate::playlist::Playlist;

/// Coarse playback phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Nothing has been played since the playlist was loaded.
    #[default]
    Idle,
    Playing,
    /// Stopped on request or after the last entry.
    Stopped,
}

/// Cursor position and playing flag.
///
/// Only the playback cursor mutates this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    phase: PlaybackPhase,
    cursor: Option<usize>,
    suspended: bool,
    generation: Option<u64>,
}

impl PlaybackState {
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Current entry. Kept after stopping but no longer meaningful.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    /// Rendering paused because the app went to the background.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Sink generation of the source being rendered, if any.
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub(crate) fn begin(&mut self, index: usize) {
        self.phase = PlaybackPhase::Playing;
        self.cursor = Some(index);
        self.suspended = false;
    }

    pub(crate) fn set_cursor(&mut self, index: usize) {
        self.cursor = Some(index);
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = Some(generation);
    }

    pub(crate) fn stop(&mut self) {
        self.phase = PlaybackPhase::Stopped;
        self.suspended = false;
        self.generation = None;
    }

    pub(crate) fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }
}

/// Everything one player instance owns: the loaded playlist and where
/// playback is within it.
#[derive(Debug, Clone, Default)]
pub struct PlayerSession {
    playlist: Playlist,
    state: PlaybackState,
}

impl PlayerSession {
    pub fn new(playlist: Playlist) -> Self {
        Self {
            playlist,
            state: PlaybackState::default(),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut PlaybackState {
        &mut self.state
    }

    /// Replace the playlist and reset playback to idle.
    ///
    /// Callers stop the media sink first if something was playing.
    pub fn load(&mut self, playlist: Playlist) {
        self.playlist = playlist;
        self.state = PlaybackState::default();
    }
}
