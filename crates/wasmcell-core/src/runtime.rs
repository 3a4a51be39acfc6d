//! Runtime instance management.
//!
//! [`WasmHost`] owns every runtime instance in the process. Each instance is
//! an isolated execution context with its own [`ModuleRegistry`]; instances
//! share the engine and runner but never any module state. Handles are
//! issued monotonically and never reused, so a handle that outlives its
//! instance fails cleanly instead of aliasing a newer tenant.
//!
//! # Workers
//!
//! When the engine is configured with epoch interruption, the host spawns
//! exactly one background worker: a ticker thread that increments the engine
//! epoch every millisecond to drive wall-clock timeouts. It is stopped and
//! joined when the host is dropped. There are no other implicit threads; all
//! other work happens on the caller's thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::args::{FunctionCall, WasmValue};
use crate::builtin::{Builtin, BuiltinCatalog};
use crate::{CompiledModule, ModuleRegistry, ModuleRunner, WasmEngine};
use wasmcell_common::{ExecutionConfig, HostConfig, HostError};

/// Opaque identifier of a runtime instance.
///
/// Unique for the process lifetime; never reissued, even after the instance
/// is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeHandle(u64);

impl RuntimeHandle {
    /// The raw handle value, for transport across the FFI boundary.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for RuntimeHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One isolated execution context.
struct RuntimeInstance {
    handle: RuntimeHandle,

    /// The instance's module registry, guarded by the one exclusive lock
    /// this instance has. Registration mutates under the lock; execution
    /// resolves under the lock and invokes outside it, so a guest call can
    /// neither observe a half-applied registration nor block one.
    registry: Mutex<ModuleRegistry>,

    created_at: Instant,
}

/// The multi-tenant host: engine, runner, and all runtime instances.
pub struct WasmHost {
    engine: WasmEngine,
    runner: ModuleRunner,
    instances: DashMap<u64, Arc<RuntimeInstance>>,
    next_handle: AtomicU64,
    exec_config: ExecutionConfig,
    ticker: Option<EpochTicker>,
}

impl WasmHost {
    /// Create a new host from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the engine cannot be built.
    pub fn new(config: &HostConfig) -> Result<Self, HostError> {
        let engine = WasmEngine::new(&config.engine)?;
        let runner = ModuleRunner::new(engine.clone());

        let ticker = engine
            .epoch_interruption()
            .then(|| EpochTicker::start(engine.clone()));

        info!("Host initialized");

        Ok(Self {
            engine,
            runner,
            instances: DashMap::new(),
            next_handle: AtomicU64::new(1),
            exec_config: config.execution.clone(),
            ticker,
        })
    }

    /// Allocate a new isolated runtime instance.
    ///
    /// Never fails; handles are issued monotonically.
    pub fn initialize_runtime(&self) -> RuntimeHandle {
        let handle = RuntimeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        self.instances.insert(
            handle.as_u64(),
            Arc::new(RuntimeInstance {
                handle,
                registry: Mutex::new(ModuleRegistry::new()),
                created_at: Instant::now(),
            }),
        );

        debug!(%handle, "Runtime instance created");
        handle
    }

    /// Shut down a runtime instance, freeing its registry and all compiled
    /// artifacts it holds.
    ///
    /// The handle is never reissued; later calls against it fail with
    /// `UnknownRuntime`.
    pub fn shutdown_runtime(&self, handle: RuntimeHandle) -> Result<(), HostError> {
        let (_, instance) = self
            .instances
            .remove(&handle.as_u64())
            .ok_or_else(|| HostError::unknown_runtime(handle.as_u64()))?;

        info!(
            %handle,
            modules = instance.registry.lock().len(),
            lifetime_ms = instance.created_at.elapsed().as_millis(),
            "Runtime instance shut down"
        );
        Ok(())
    }

    /// Resolve a handle to its instance.
    fn resolve(&self, handle: RuntimeHandle) -> Result<Arc<RuntimeInstance>, HostError> {
        self.instances
            .get(&handle.as_u64())
            .map(|entry| entry.clone())
            .ok_or_else(|| HostError::unknown_runtime(handle.as_u64()))
    }

    /// Register a built-in module in a runtime instance.
    ///
    /// The module is registered under `name`, or under the catalog's default
    /// name when `name` is `None`. Returns the registered name.
    #[instrument(skip(self), fields(%handle))]
    pub fn register_builtin(
        &self,
        handle: RuntimeHandle,
        builtin: Builtin,
        name: Option<&str>,
    ) -> Result<String, HostError> {
        let entry = BuiltinCatalog::global().get(builtin);
        let name = name.unwrap_or(entry.name);

        self.register_module(handle, name, entry.bytes)
    }

    /// Register a dynamically supplied module from raw bytecode.
    ///
    /// Returns the registered name.
    #[instrument(skip(self, bytes), fields(%handle, bytes_len = bytes.len()))]
    pub fn register_module(
        &self,
        handle: RuntimeHandle,
        name: &str,
        bytes: &[u8],
    ) -> Result<String, HostError> {
        let instance = self.resolve(handle)?;

        // Compile outside the instance lock; only the registry insertion
        // needs mutual exclusion.
        let module = Arc::new(CompiledModule::from_bytes(
            self.engine.inner(),
            name,
            bytes,
        )?);

        instance.registry.lock().insert(name, module)?;

        info!(%handle, module = %name, "Module registered");
        Ok(name.to_string())
    }

    /// Register a dynamically supplied module from base64-encoded bytecode.
    ///
    /// Returns the registered name.
    pub fn register_module_base64(
        &self,
        handle: RuntimeHandle,
        name: &str,
        data_base64: &str,
    ) -> Result<String, HostError> {
        let bytes = BASE64
            .decode(data_base64)
            .map_err(|e| HostError::invalid_encoding(e.to_string()))?;

        self.register_module(handle, name, &bytes)
    }

    /// Whether a module is registered in a runtime instance.
    ///
    /// Pure query: an unknown handle reads as `false`, not an error, so the
    /// call is safe for polling.
    pub fn is_registered(&self, handle: RuntimeHandle, name: &str) -> bool {
        self.instances
            .get(&handle.as_u64())
            .is_some_and(|instance| instance.registry.lock().contains(name))
    }

    /// Registered module names in a runtime instance.
    pub fn module_names(&self, handle: RuntimeHandle) -> Result<Vec<String>, HostError> {
        Ok(self.resolve(handle)?.registry.lock().names())
    }

    /// Bytecode of a built-in module.
    ///
    /// Reads the embedded bytecode store directly; independent of any
    /// runtime instance or registration.
    pub fn builtin_bytes(builtin: Builtin) -> &'static [u8] {
        BuiltinCatalog::global().bytes(builtin)
    }

    /// Base64-encoded bytecode of a built-in module.
    pub fn builtin_base64(builtin: Builtin) -> String {
        BuiltinCatalog::global().base64(builtin)
    }

    /// Base64-encoded bytecode of a built-in, scoped to a runtime handle.
    ///
    /// The handle is validated, but the bytecode comes from the embedded
    /// store whether or not the module is registered in that instance;
    /// callers use this to transport built-in bytecode to another instance
    /// or process.
    pub fn runtime_builtin_base64(
        &self,
        handle: RuntimeHandle,
        builtin: Builtin,
    ) -> Result<String, HostError> {
        self.resolve(handle)?;
        Ok(Self::builtin_base64(builtin))
    }

    /// Execute a named export of a registered module.
    ///
    /// Registration and execution are always separate steps; executing an
    /// unregistered module fails with `ModuleNotFound` and has no side
    /// effects.
    pub async fn execute(
        &self,
        handle: RuntimeHandle,
        module_name: &str,
        call: &FunctionCall,
    ) -> Result<WasmValue, HostError> {
        let instance = self.resolve(handle)?;

        // Resolve under the instance lock, invoke outside it: the lock
        // covers registry consistency only, so a long or timed-out guest
        // call cannot block registration or corrupt the registry.
        let module = {
            let registry = instance.registry.lock();
            registry
                .get(module_name)
                .ok_or_else(|| HostError::module_not_found(module_name))?
        };

        self.runner
            .invoke(module_name, &module, call, &self.exec_config)
            .await
    }

    /// Number of live runtime instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// The per-call execution configuration.
    pub fn exec_config(&self) -> &ExecutionConfig {
        &self.exec_config
    }

    /// The shared engine.
    pub fn engine(&self) -> &WasmEngine {
        &self.engine
    }
}

impl std::fmt::Debug for WasmHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmHost")
            .field("instances", &self.instances.len())
            .field("epoch_ticker", &self.ticker.is_some())
            .finish_non_exhaustive()
    }
}

/// Background worker driving epoch-based timeouts.
///
/// Increments the engine epoch once per millisecond so per-call deadlines
/// expressed in milliseconds map directly to epoch ticks. Stopped and joined
/// on drop.
struct EpochTicker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EpochTicker {
    fn start(engine: WasmEngine) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let thread = std::thread::Builder::new()
            .name("wasmcell-epoch".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    engine.increment_epoch();
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("failed to spawn epoch ticker thread");

        Self {
            stop,
            thread: Some(thread),
        }
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_host() -> WasmHost {
        let mut config = HostConfig::default();
        config.engine.pooling_allocator = false;
        config.engine.epoch_interruption = false;
        WasmHost::new(&config).unwrap()
    }

    #[test]
    fn test_handles_are_monotonic() {
        let host = test_host();

        let h1 = host.initialize_runtime();
        let h2 = host.initialize_runtime();

        assert_ne!(h1, h2);
        assert!(h2.as_u64() > h1.as_u64());
        assert_eq!(host.instance_count(), 2);
    }

    #[test]
    fn test_handle_not_reused_after_shutdown() {
        let host = test_host();

        let h1 = host.initialize_runtime();
        host.shutdown_runtime(h1).unwrap();

        let h2 = host.initialize_runtime();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_shutdown_unknown_handle() {
        let host = test_host();

        let err = host.shutdown_runtime(RuntimeHandle::from(999)).unwrap_err();
        assert!(matches!(err, HostError::UnknownRuntime { handle: 999 }));
    }

    #[test]
    fn test_register_builtin_default_name() {
        let host = test_host();
        let handle = host.initialize_runtime();

        let name = host.register_builtin(handle, Builtin::Sum, None).unwrap();
        assert_eq!(name, "sum");
        assert!(host.is_registered(handle, "sum"));
    }

    #[test]
    fn test_register_builtin_custom_name() {
        let host = test_host();
        let handle = host.initialize_runtime();

        let name = host
            .register_builtin(handle, Builtin::Sum, Some("adder"))
            .unwrap();
        assert_eq!(name, "adder");
        assert!(host.is_registered(handle, "adder"));
        assert!(!host.is_registered(handle, "sum"));
    }

    #[test]
    fn test_is_registered_unknown_handle_is_false() {
        let host = test_host();
        assert!(!host.is_registered(RuntimeHandle::from(42), "sum"));
    }

    #[test]
    fn test_register_invalid_base64() {
        let host = test_host();
        let handle = host.initialize_runtime();

        let err = host
            .register_module_base64(handle, "bad", "!!! not base64 !!!")
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_register_invalid_bytecode() {
        let host = test_host();
        let handle = host.initialize_runtime();

        let err = host
            .register_module(handle, "bad", b"definitely not wasm")
            .unwrap_err();
        assert!(matches!(err, HostError::CompileError { .. }));
    }

    #[test]
    fn test_runtime_builtin_base64_requires_valid_handle() {
        let host = test_host();

        let err = host
            .runtime_builtin_base64(RuntimeHandle::from(7), Builtin::Sum)
            .unwrap_err();
        assert!(matches!(err, HostError::UnknownRuntime { .. }));

        // With a valid handle it reads the bytecode store regardless of
        // registration state.
        let handle = host.initialize_runtime();
        let b64 = host.runtime_builtin_base64(handle, Builtin::Sum).unwrap();
        assert_eq!(b64, WasmHost::builtin_base64(Builtin::Sum));
    }

    #[tokio::test]
    async fn test_execute_unknown_runtime() {
        let host = test_host();

        let err = host
            .execute(
                RuntimeHandle::from(1234),
                "sum",
                &FunctionCall::new("sum", vec![]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, HostError::UnknownRuntime { .. }));
    }
}
