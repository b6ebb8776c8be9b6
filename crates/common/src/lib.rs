//! MuvidGen Common Utilities
//!
//! Shared infrastructure for all MuvidGen crates:
//! - Error types, result aliases, and the exit-code policy
//! - External tool discovery (ffmpeg / ffprobe)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod tools;

pub use config::*;
pub use error::*;
pub use tools::*;
