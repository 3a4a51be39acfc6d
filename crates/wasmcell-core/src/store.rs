//! Per-call execution context and store construction.
//!
//! Every guest invocation gets a fresh Wasmtime [`Store`] with its own
//! [`CallContext`]: resource limits, a call id for tracing, and metrics
//! collected while the call runs. Nothing in the context outlives the call.

use std::time::{Duration, Instant};

use wasmtime::{Store, StoreLimits, StoreLimitsBuilder};

use crate::WasmEngine;
use wasmcell_common::{ExecutionConfig, HostError};

/// Per-call execution state.
pub struct CallContext {
    /// Unique call identifier for tracing.
    pub call_id: String,

    /// Execution metrics, finalized after the call returns.
    pub metrics: ExecutionMetrics,

    /// Linear-memory growth limiter for this call.
    pub(crate) limits: StoreLimits,

    start_time: Instant,
}

/// Execution performance metrics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetrics {
    /// Fuel consumed during execution.
    pub fuel_consumed: u64,

    /// Total execution duration.
    pub duration: Option<Duration>,
}

impl CallContext {
    /// Create a new call context.
    pub fn new(call_id: String, config: &ExecutionConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .build();

        Self {
            call_id,
            metrics: ExecutionMetrics::default(),
            limits,
            start_time: Instant::now(),
        }
    }

    /// Elapsed time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finalize metrics after execution.
    pub fn finalize_metrics(&mut self) {
        self.metrics.duration = Some(self.start_time.elapsed());
    }
}

/// Create a new Wasmtime store for one call.
///
/// Applies the fuel limit, the epoch deadline (when the engine runs with
/// epoch interruption), and the linear-memory limiter.
///
/// # Errors
///
/// Returns `InvalidConfig` if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &ExecutionConfig,
    call_id: String,
) -> Result<Store<CallContext>, HostError> {
    let context = CallContext::new(call_id, config);
    let mut store = Store::new(engine.inner(), context);

    store.limiter(|ctx| &mut ctx.limits);

    // The engine always runs with fuel consumption on; an unmetered call
    // gets a full tank instead of the zero it would otherwise trap on.
    let fuel = if config.fuel_metering {
        config.max_fuel
    } else {
        u64::MAX
    };
    store
        .set_fuel(fuel)
        .map_err(|e| HostError::invalid_config(format!("Failed to set fuel: {e}")))?;

    // Deadline in ticks; the host's ticker increments the epoch once per
    // millisecond, so timeout_ms maps directly.
    if engine.epoch_interruption() {
        store.set_epoch_deadline(config.timeout_ms);
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<CallContext>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed since the store was created.
pub fn calculate_fuel_consumed(initial_fuel: u64, store: &Store<CallContext>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmcell_common::EngineConfig;

    fn test_engine() -> WasmEngine {
        let config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        WasmEngine::new(&config).unwrap()
    }

    #[test]
    fn test_call_context_creation() {
        let ctx = CallContext::new("call-123".into(), &ExecutionConfig::default());

        assert_eq!(ctx.call_id, "call-123");
        assert_eq!(ctx.metrics.fuel_consumed, 0);
        assert!(ctx.metrics.duration.is_none());
    }

    #[test]
    fn test_finalize_metrics() {
        let mut ctx = CallContext::new("call".into(), &ExecutionConfig::default());
        ctx.finalize_metrics();
        assert!(ctx.metrics.duration.is_some());
    }

    #[test]
    fn test_store_creation() {
        let engine = test_engine();
        let exec_config = ExecutionConfig::default();

        let store = create_store(&engine, &exec_config, "call-1".into());
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_fuel() {
        let engine = test_engine();
        let exec_config = ExecutionConfig {
            max_fuel: 1000,
            fuel_metering: true,
            ..Default::default()
        };

        let store = create_store(&engine, &exec_config, "call-2".into()).unwrap();
        assert_eq!(get_remaining_fuel(&store), Some(1000));
    }

    #[test]
    fn test_fuel_disabled() {
        let engine = test_engine();
        let exec_config = ExecutionConfig {
            fuel_metering: false,
            ..Default::default()
        };

        let store = create_store(&engine, &exec_config, "call-3".into()).unwrap();
        // Unmetered calls run on a full tank.
        assert_eq!(get_remaining_fuel(&store), Some(u64::MAX));
    }
}
