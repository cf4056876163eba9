//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the video cache core:
//! - Logging and tracing infrastructure
//! - Capability wiring and configuration
//! - Event bus system
//!
//! ## Overview
//!
//! Other workspace crates depend on this one for their logging conventions,
//! for the typed events they publish, and for the [`AppConfig`](config::AppConfig)
//! that hands them their platform capabilities.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
