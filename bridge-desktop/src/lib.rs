//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the bridge traits using
//! desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `KeyValueStore` using a SQLite table, or an in-memory map
//! - `MediaSink` driving an external player process (`mpv` by default)
//! - `LifecycleObserver` fed by the host application
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ProcessMediaSink, ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let sink = ProcessMediaSink::new("mpv").with_args(["--fs"]);
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod kv_store;
mod lifecycle;
mod media;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use kv_store::{MemoryKeyValueStore, SqliteKeyValueStore};
pub use lifecycle::ChannelLifecycleObserver;
pub use media::{BroadcastMediaEvents, ProcessMediaSink, DEFAULT_PLAYER};
