//! # Video Cache & Playback Core
//!
//! Decides, for each playlist URL, whether a valid local copy exists and
//! drives ordered playback that prefers cached copies over streaming.
//!
//! ## Overview
//!
//! This crate handles:
//! - Playlist parsing (JSON array or one URL per line)
//! - The cache index, reconciled between the fast store, the durable
//!   manifest and the files themselves
//! - Sequential caching with a busy guard
//! - The playback cursor and its fallback on broken entries
//! - Pausing and checkpointing around app lifecycle transitions
//!
//! Platform services come in through `bridge-traits`; nothing here touches
//! the file system, network or a renderer directly.

pub mod cache;
pub mod cursor;
pub mod error;
pub mod lifecycle;
pub mod playlist;
pub mod session;

pub use cache::{
    CacheConfig, CacheIndex, CacheRecord, CacheReport, CacheWriter, ClearReport, RehydrateReport,
};
pub use cursor::{PlaybackCursor, Transition};
pub use error::{ParseError, PlaybackError, Result};
pub use lifecycle::{LifecycleCoordinator, LifecycleOutcome};
pub use playlist::{Playlist, PlaylistEntry};
pub use session::{PlaybackPhase, PlaybackState, PlayerSession};
