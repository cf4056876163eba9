//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (fast store, file
//! store, HTTP, media sink, lifecycle observer) into the shared cache and
//! playback core. [`PlayerService`] is the single entry point hosts drive:
//! every user command maps to one method.
//!
//! Desktop apps typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and call [`bootstrap_desktop`]. Other hosts build an
//! [`AppConfig`](core_runtime::config::AppConfig) with their own adapters and
//! call [`PlayerService::new`].

pub mod error;
pub mod service;

#[cfg(feature = "desktop-shims")]
pub mod bootstrap;

pub use error::{CoreError, Result};
pub use service::{CacheStatus, EntryStatus, PlayerService, LAST_INPUT_KEY};

#[cfg(feature = "desktop-shims")]
pub use bootstrap::{bootstrap_desktop, DesktopOptions, STORE_FILE_NAME};

pub use core_playback::{
    CacheConfig, CacheReport, ClearReport, LifecycleOutcome, PlaybackPhase, PlaybackState,
    Playlist, PlaylistEntry, RehydrateReport, Transition,
};
