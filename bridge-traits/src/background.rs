//! Application Lifecycle
//!
//! Notifies the core about foreground/background transitions so it can
//! checkpoint the cache index and suspend rendering while hidden.

use crate::error::Result;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is visible and active
    Foreground,
    /// Application is hidden
    Background,
    /// Application is being suspended by the platform
    Suspended,
}

impl LifecycleState {
    /// Whether the application is hidden in this state.
    pub fn is_hidden(&self) -> bool {
        !matches!(self, LifecycleState::Foreground)
    }
}

/// Lifecycle observer trait
///
/// # Platform Support
///
/// - **TV runtimes**: application visibility callbacks
/// - **Desktop**: window minimize/restore, or host-driven notifications
/// - **Web**: Page Visibility API
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::{LifecycleObserver, LifecycleState};
///
/// async fn watch(observer: &dyn LifecycleObserver) -> Result<()> {
///     let mut stream = observer.subscribe_changes().await?;
///
///     while let Some(state) = stream.next().await {
///         match state {
///             LifecycleState::Foreground => resume_rendering(),
///             _ => checkpoint_and_pause(),
///         }
///     }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get current lifecycle state
    async fn get_state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle state changes
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle state changes
#[async_trait::async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next lifecycle state update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}
