//! Host-driven lifecycle observer

use async_trait::async_trait;
use bridge_traits::{
    background::{LifecycleChangeStream, LifecycleObserver, LifecycleState},
    error::Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

/// Lifecycle observer whose transitions are pushed by the host.
///
/// Desktop windows have no standard visibility callback, so the embedding
/// application (or the CLI's signal handler) calls [`notify`](Self::notify)
/// when the app is hidden or shown again.
#[derive(Clone)]
pub struct ChannelLifecycleObserver {
    state: Arc<RwLock<LifecycleState>>,
    sender: broadcast::Sender<LifecycleState>,
}

impl ChannelLifecycleObserver {
    /// Create an observer that starts in the foreground.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(LifecycleState::Foreground)),
            sender,
        }
    }

    /// Record a new state and fan it out to subscribers.
    ///
    /// Repeated notifications of the current state are dropped.
    pub fn notify(&self, state: LifecycleState) {
        {
            let mut current = self.state.write();
            if *current == state {
                return;
            }
            *current = state;
        }
        debug!(state = ?state, "Lifecycle state changed");
        // No subscribers is fine
        let _ = self.sender.send(state);
    }
}

impl Default for ChannelLifecycleObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleObserver for ChannelLifecycleObserver {
    async fn get_state(&self) -> Result<LifecycleState> {
        Ok(*self.state.read())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>> {
        Ok(Box::new(ChannelLifecycleStream {
            receiver: self.sender.subscribe(),
        }))
    }
}

struct ChannelLifecycleStream {
    receiver: broadcast::Receiver<LifecycleState>,
}

#[async_trait]
impl LifecycleChangeStream for ChannelLifecycleStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Lifecycle stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
