//! Wasmtime engine configuration and creation.
//!
//! One [`WasmEngine`] backs every runtime instance the host creates. It is
//! thread-safe, carries no per-tenant state, and is configured once at host
//! startup.

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine, InstanceAllocationStrategy, PoolingAllocationConfig};

use wasmcell_common::{EngineConfig, HostError};

/// Thread-safe WebAssembly engine wrapper.
///
/// The engine is configured with:
/// - **Async support**: guest calls run through `call_async`, so a blocked
///   guest never wedges the caller's executor
/// - **Fuel metering**: deterministic CPU limiting per call
/// - **Epoch interruption** (optional): wall-clock timeouts, driven by the
///   host's ticker worker
/// - **Pooling allocator** (optional): pre-allocated instance slots for fast
///   instantiation
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl WasmEngine {
    /// Create a new WebAssembly engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the Wasmtime configuration is rejected or
    /// the pooling allocator cannot be initialized.
    pub fn new(config: &EngineConfig) -> Result<Self, HostError> {
        let mut wasmtime_config = Config::new();

        wasmtime_config.async_support(true);
        wasmtime_config.consume_fuel(true);

        if config.epoch_interruption {
            wasmtime_config.epoch_interruption(true);
        }

        wasmtime_config.cranelift_opt_level(wasmtime::OptLevel::Speed);

        if config.pooling_allocator {
            let pooling = Self::create_pooling_config(config);
            wasmtime_config.allocation_strategy(InstanceAllocationStrategy::Pooling(pooling));

            info!(
                max_instances = config.max_instances,
                instance_memory_mb = config.instance_memory_mb,
                "Pooling allocator enabled"
            );
        }

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            HostError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!("Wasmtime engine initialized");

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Create pooling allocation configuration.
    fn create_pooling_config(config: &EngineConfig) -> PoolingAllocationConfig {
        let mut pooling = PoolingAllocationConfig::default();

        pooling.total_core_instances(config.max_instances);
        pooling.total_memories(config.max_instances);
        pooling.total_tables(config.max_instances);

        let max_memory_bytes = (config.instance_memory_mb as usize) * 1024 * 1024;
        pooling.max_memory_size(max_memory_bytes);

        pooling
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Increment the epoch counter.
    ///
    /// Called by the host's ticker worker (once per millisecond) while epoch
    /// interruption is enabled; a store whose deadline has passed traps at
    /// its next epoch check.
    pub fn increment_epoch(&self) {
        self.engine.increment_epoch();
    }

    /// Check if epoch interruption is enabled.
    pub fn epoch_interruption(&self) -> bool {
        self.config.epoch_interruption
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("pooling_allocator", &self.config.pooling_allocator)
            .field("max_instances", &self.config.max_instances)
            .field("epoch_interruption", &self.config.epoch_interruption)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation_default() {
        let config = EngineConfig::default();
        let engine = WasmEngine::new(&config);

        assert!(engine.is_ok());
    }

    #[test]
    fn test_engine_creation_no_pooling() {
        let config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        let engine = WasmEngine::new(&config);

        assert!(engine.is_ok());
    }

    #[test]
    fn test_engine_epoch_increment() {
        let config = EngineConfig::default();
        let engine = WasmEngine::new(&config).unwrap();

        // Should not panic
        engine.increment_epoch();
        engine.increment_epoch();
    }

    #[test]
    fn test_engine_debug() {
        let config = EngineConfig::default();
        let engine = WasmEngine::new(&config).unwrap();

        let debug_str = format!("{engine:?}");
        assert!(debug_str.contains("WasmEngine"));
        assert!(debug_str.contains("pooling_allocator"));
    }
}
