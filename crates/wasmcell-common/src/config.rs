//! Configuration structures for the wasmcell host.
//!
//! - [`HostConfig`]: top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (pooling, epoch interruption)
//! - [`ExecutionConfig`]: per-call execution limits (fuel, memory, timeout)

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level host configuration.
///
/// Can be loaded from TOML files (see [`crate::config_file`]) or constructed
/// directly. Every field has a sensible default, so a `HostConfig::default()`
/// host is fully functional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HostConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-call execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Wasmtime engine configuration.
///
/// These settings are fixed for the lifetime of the engine and shared by
/// every runtime instance the host creates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable the pooling allocator for fast instantiation.
    ///
    /// Pre-allocates memory for a pool of instances instead of allocating
    /// per instantiation.
    #[serde(default = "defaults::pooling_allocator")]
    pub pooling_allocator: bool,

    /// Maximum concurrent instantiations in the pool.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per instance slot in megabytes.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,

    /// Enable epoch-based interruption.
    ///
    /// Required for wall-clock execution timeouts. When enabled, the host
    /// runs a ticker worker that increments the engine epoch every
    /// millisecond.
    #[serde(default = "defaults::epoch_interruption")]
    pub epoch_interruption: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: defaults::pooling_allocator(),
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
            epoch_interruption: defaults::epoch_interruption(),
        }
    }
}

/// Per-call execution configuration.
///
/// These limits apply to each invocation of a guest export independently.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum fuel (abstract CPU instructions) per call.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Enable fuel metering.
    ///
    /// Deterministic CPU limiting; when disabled, only the epoch timeout
    /// bounds a runaway guest.
    #[serde(default = "defaults::fuel_metering")]
    pub fuel_metering: bool,

    /// Wall-clock execution timeout in milliseconds.
    ///
    /// Enforced through epoch interruption; has no effect if the engine is
    /// built with `epoch_interruption` disabled.
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum linear memory a single call may grow to, in megabytes.
    #[serde(default = "defaults::max_memory_mb")]
    pub max_memory_mb: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            fuel_metering: defaults::fuel_metering(),
            timeout_ms: defaults::timeout_ms(),
            max_memory_mb: defaults::max_memory_mb(),
        }
    }
}

impl ExecutionConfig {
    /// Get the timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the memory limit in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize) * 1024 * 1024
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn pooling_allocator() -> bool {
        true
    }

    pub const fn max_instances() -> u32 {
        1000
    }

    pub const fn instance_memory_mb() -> u32 {
        64
    }

    pub const fn epoch_interruption() -> bool {
        true
    }

    pub const fn max_fuel() -> u64 {
        10_000_000
    }

    pub const fn fuel_metering() -> bool {
        true
    }

    pub const fn timeout_ms() -> u64 {
        1000
    }

    pub const fn max_memory_mb() -> u32 {
        128
    }
}
