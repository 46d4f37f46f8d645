//! Lanserve Core Library
//!
//! This crate provides the core functionality for the Lanserve static site
//! server: configuration, error handling, logging setup, network address
//! discovery, and the HTTP server lifecycle.

pub mod config;
pub mod error;
pub mod logging;
pub mod net;
pub mod server;

pub use error::{Error, Result};

/// Lanserve version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
