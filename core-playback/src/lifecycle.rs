//! Lifecycle coordination
//!
//! Going to the background checkpoints the cache index and pauses
//! rendering; coming back resumes only what the background transition
//! paused.

use crate::cache::CacheIndex;
use crate::cursor::PlaybackCursor;
use crate::error::PlaybackError;
use crate::session::PlayerSession;
use bridge_traits::background::LifecycleState;
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What a lifecycle transition did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub manifest_saved: bool,
    pub paused: bool,
    pub resumed: bool,
}

/// Reacts to foreground/background transitions.
pub struct LifecycleCoordinator {
    index: Arc<CacheIndex>,
    cursor: Arc<PlaybackCursor>,
    event_bus: Option<EventBus>,
}

impl LifecycleCoordinator {
    pub fn new(index: Arc<CacheIndex>, cursor: Arc<PlaybackCursor>) -> Self {
        Self {
            index,
            cursor,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    fn emit(&self, event: LifecycleEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Lifecycle(event));
        }
    }

    /// Dispatch a platform lifecycle state.
    pub async fn handle(&self, session: &mut PlayerSession, state: LifecycleState) -> LifecycleOutcome {
        if state.is_hidden() {
            self.on_background(session).await
        } else {
            self.on_foreground(session).await
        }
    }

    /// Flush the index, then pause rendering if something is playing.
    ///
    /// Failures are logged; neither step prevents the other.
    #[instrument(skip(self, session))]
    pub async fn on_background(&self, session: &mut PlayerSession) -> LifecycleOutcome {
        info!("App entering background");
        self.emit(LifecycleEvent::EnteredBackground);

        let manifest_saved = match self.index.flush().await {
            Ok(_) => true,
            Err(PlaybackError::CapabilityUnavailable(_)) => false,
            Err(e) => {
                error!(error = %e, "Failed to save cache status");
                false
            }
        };

        let paused = match self.cursor.suspend(session).await {
            Ok(paused) => paused,
            Err(e) => {
                warn!(error = %e, "Failed to pause playback");
                false
            }
        };

        LifecycleOutcome {
            manifest_saved,
            paused,
            resumed: false,
        }
    }

    /// Resume rendering if the background transition paused it.
    #[instrument(skip(self, session))]
    pub async fn on_foreground(&self, session: &mut PlayerSession) -> LifecycleOutcome {
        info!("App returning to foreground");
        self.emit(LifecycleEvent::EnteredForeground);

        let resumed = match self.cursor.resume(session).await {
            Ok(resumed) => resumed,
            Err(e) => {
                warn!(error = %e, "Failed to resume playback");
                false
            }
        };

        LifecycleOutcome {
            resumed,
            ..LifecycleOutcome::default()
        }
    }
}
