//! Common types, errors, and configuration for wasmcell.
//!
//! This crate provides shared functionality used across the wasmcell workspace:
//! - [`HostError`]: the complete error taxonomy of the host, via `thiserror`
//! - Configuration structures for the engine and per-call execution limits
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{EngineConfig, ExecutionConfig, HostConfig};
pub use config_file::{ConfigFile, ConfigFileError};
pub use error::HostError;
