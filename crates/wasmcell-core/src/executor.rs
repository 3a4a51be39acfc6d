//! Guest invocation.
//!
//! [`ModuleRunner`] takes a compiled module and a [`FunctionCall`] and runs
//! the complete invocation lifecycle:
//!
//! 1. Create a fresh store with fuel, deadline, and memory limits
//! 2. Instantiate the module
//! 3. Resolve the named export and validate the argument list against its
//!    real signature
//! 4. Invoke, catching guest traps
//! 5. Convert the result back to a typed [`WasmValue`]
//!
//! Execution is a single deterministic attempt; the runner never retries.

use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use wasmtime::{Linker, Trap};

use crate::args::{FunctionCall, WasmValue, marshal_args};
use crate::store::{CallContext, calculate_fuel_consumed, create_store, get_remaining_fuel};
use crate::{CompiledModule, WasmEngine};
use wasmcell_common::{ExecutionConfig, HostError};

/// Invokes exports of compiled modules.
///
/// Thread-safe: each invocation builds its own [`wasmtime::Store`], so one
/// runner can serve every runtime instance concurrently.
pub struct ModuleRunner {
    engine: WasmEngine,
    linker: Linker<CallContext>,
}

impl ModuleRunner {
    /// Create a new runner for the given engine.
    pub fn new(engine: WasmEngine) -> Self {
        let linker = Linker::new(engine.inner());

        Self { engine, linker }
    }

    /// Invoke `call` on `module`.
    ///
    /// `module_name` is the registry name, carried into every error for
    /// context. Trap conditions inside the guest are caught and reported as
    /// [`HostError::GuestTrap`]; they never propagate as host faults.
    #[instrument(skip_all, fields(module = %module_name, function = %call.name))]
    pub async fn invoke(
        &self,
        module_name: &str,
        module: &CompiledModule,
        call: &FunctionCall,
        config: &ExecutionConfig,
    ) -> Result<WasmValue, HostError> {
        let call_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        let mut store = create_store(&self.engine, config, call_id)?;
        let initial_fuel = get_remaining_fuel(&store).unwrap_or(0);

        debug!("Instantiating module");

        let instance = self
            .linker
            .instantiate_async(&mut store, module.inner())
            .await
            .map_err(|e| {
                self.map_guest_error(e, module_name, &call.name, config, "instantiation")
            })?;

        let func = instance
            .get_func(&mut store, &call.name)
            .ok_or_else(|| HostError::function_not_found(module_name, &call.name))?;

        let ty = func.ty(&store);
        let params: Vec<_> = ty.params().collect();
        let args = marshal_args(&call.name, &call.args, &params)?;

        let mut results = vec![wasmtime::Val::I32(0); ty.results().len()];

        debug!(arity = args.len(), "Invoking export");

        let outcome = func.call_async(&mut store, &args, &mut results).await;

        let fuel_consumed = calculate_fuel_consumed(initial_fuel, &store);
        store.data_mut().metrics.fuel_consumed = fuel_consumed;
        store.data_mut().finalize_metrics();

        let duration = start.elapsed();

        match outcome {
            Ok(()) => {
                let value = convert_results(module_name, &call.name, &results)?;

                info!(
                    duration_ms = duration.as_millis(),
                    fuel_consumed,
                    result = %value,
                    "Execution completed"
                );

                Ok(value)
            }
            Err(e) => {
                warn!(
                    duration_ms = duration.as_millis(),
                    fuel_consumed,
                    "Execution failed"
                );
                Err(self.map_guest_error(e, module_name, &call.name, config, "call"))
            }
        }
    }

    /// Map an engine-level error to the host taxonomy.
    ///
    /// Fuel exhaustion and epoch interruption get their own variants; every
    /// other trap is reported as a guest fault with module/function context.
    fn map_guest_error(
        &self,
        error: wasmtime::Error,
        module: &str,
        function: &str,
        config: &ExecutionConfig,
        phase: &str,
    ) -> HostError {
        match error.downcast_ref::<Trap>() {
            Some(Trap::OutOfFuel) => HostError::FuelExhausted,
            Some(Trap::Interrupt) => HostError::ExecutionTimeout {
                duration_ms: config.timeout_ms,
            },
            Some(trap) => HostError::guest_trap(module, function, format!("{trap:?}")),
            None => {
                error!(phase, error = %error, "Engine error outside a trap");
                HostError::guest_trap(module, function, format!("{phase} failed: {error}"))
            }
        }
    }

    /// Get the engine this runner executes on.
    pub fn engine(&self) -> &WasmEngine {
        &self.engine
    }
}

/// Convert the export's result values to the host representation.
fn convert_results(
    module: &str,
    function: &str,
    results: &[wasmtime::Val],
) -> Result<WasmValue, HostError> {
    match results {
        [] => Ok(WasmValue::Unit),
        [single] => WasmValue::from_val(single)
            .map_err(|reason| HostError::guest_trap(module, function, reason)),
        more => Err(HostError::guest_trap(
            module,
            function,
            format!("unsupported result arity: {}", more.len()),
        )),
    }
}

impl std::fmt::Debug for ModuleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRunner").finish_non_exhaustive()
    }
}
