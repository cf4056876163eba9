//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the video cache core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, TV runtime, tests).
//!
//! ## Traits
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Hierarchical file store for cached payloads and the manifest
//! - [`KeyValueStore`](storage::KeyValueStore) - Low-latency string store backing the live cache index
//!
//! ### Networking & Media
//! - [`HttpClient`](http::HttpClient) - Whole-body fetch of remote videos
//! - [`MediaSink`](media::MediaSink) - Renderer that plays one source at a time
//!
//! ### Platform Integration
//! - [`LifecycleObserver`](background::LifecycleObserver) - App foreground/background transitions
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to a host console
//!
//! ## Missing Capabilities
//!
//! A platform without file access passes [`UnsupportedFileSystem`]. Every
//! call on it fails with [`BridgeError::NotAvailable`] and the core degrades
//! to streaming playback instead of failing.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod background;
pub mod error;
pub mod http;
pub mod media;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{LifecycleChangeStream, LifecycleObserver, LifecycleState};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{MediaEvent, MediaEventStream, MediaSink, MediaSource};
pub use storage::{FileSystemAccess, KeyValueStore, UnsupportedFileSystem};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
