//! Error types for the wasmcell host.
//!
//! [`HostError`] covers every failure the host can report across its
//! boundary. All of these are returned as values; none of them escape as
//! panics. Guest-level faults (traps) are caught by the execution engine and
//! surfaced as [`HostError::GuestTrap`] with enough context to be actionable
//! without re-entering Wasmtime's own error type.

use thiserror::Error;

/// Errors reported by the multi-tenant host.
#[derive(Error, Debug)]
pub enum HostError {
    /// The runtime handle was never issued (or the runtime was shut down).
    #[error("Unknown runtime: {handle:#x}")]
    UnknownRuntime {
        /// The handle that failed to resolve.
        handle: u64,
    },

    /// A module with this name is already registered in the runtime instance.
    ///
    /// The previously registered module is left intact.
    #[error("Module already registered: {name}")]
    DuplicateModule {
        /// The contested module name.
        name: String,
    },

    /// No module with this name is registered in the runtime instance.
    #[error("Module not found: {name}")]
    ModuleNotFound {
        /// The requested module name.
        name: String,
    },

    /// The module has no export with the requested function name.
    #[error("Function not found: {module}::{function}")]
    FunctionNotFound {
        /// The module that was searched.
        module: String,
        /// The missing export name.
        function: String,
    },

    /// Supplied bytecode payload was not valid base64.
    #[error("Invalid encoding: {reason}")]
    InvalidEncoding {
        /// Description of the decode failure.
        reason: String,
    },

    /// WebAssembly compilation failed.
    #[error("Compilation of '{name}' failed: {reason}")]
    CompileError {
        /// The name the module was being registered under.
        name: String,
        /// Description of the compilation failure.
        reason: String,
    },

    /// An argument value could not be represented as its declared type.
    ///
    /// This covers parse failures, overflow, and reference-typed arguments,
    /// which have no textual representation the host accepts. The marshaller
    /// rejects rather than truncates.
    #[error("Argument {index} is not a valid {expected}: {reason}")]
    ArgumentTypeMismatch {
        /// Zero-based position of the offending argument.
        index: usize,
        /// The declared (or required) type.
        expected: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The supplied argument count does not match the export's signature.
    #[error("Arity mismatch calling '{function}': expected {expected} arguments, got {actual}")]
    ArityMismatch {
        /// The export being called.
        function: String,
        /// Parameter count of the export's real signature.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// The guest trapped during execution (e.g. division by zero,
    /// unreachable, out-of-bounds memory access).
    #[error("Guest trap in {module}::{function}: {reason}")]
    GuestTrap {
        /// Module that was executing.
        module: String,
        /// Export that was invoked.
        function: String,
        /// Trap description from the engine.
        reason: String,
    },

    /// Execution exceeded the configured wall-clock timeout.
    #[error("Execution timeout after {duration_ms}ms")]
    ExecutionTimeout {
        /// The timeout that was exceeded, in milliseconds.
        duration_ms: u64,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// Invalid host or engine configuration.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl HostError {
    /// Create a new `UnknownRuntime` error.
    pub fn unknown_runtime(handle: u64) -> Self {
        Self::UnknownRuntime { handle }
    }

    /// Create a new `DuplicateModule` error.
    pub fn duplicate_module(name: impl Into<String>) -> Self {
        Self::DuplicateModule { name: name.into() }
    }

    /// Create a new `ModuleNotFound` error.
    pub fn module_not_found(name: impl Into<String>) -> Self {
        Self::ModuleNotFound { name: name.into() }
    }

    /// Create a new `FunctionNotFound` error.
    pub fn function_not_found(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self::FunctionNotFound {
            module: module.into(),
            function: function.into(),
        }
    }

    /// Create a new `InvalidEncoding` error.
    pub fn invalid_encoding(reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            reason: reason.into(),
        }
    }

    /// Create a new `CompileError`.
    pub fn compile_error(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CompileError {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `ArgumentTypeMismatch` error.
    pub fn argument_type_mismatch(
        index: usize,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ArgumentTypeMismatch {
            index,
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `GuestTrap` error.
    pub fn guest_trap(
        module: impl Into<String>,
        function: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::GuestTrap {
            module: module.into(),
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates a missing runtime, module, or
    /// export.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownRuntime { .. } | Self::ModuleNotFound { .. } | Self::FunctionNotFound { .. }
        )
    }

    /// Returns `true` if this error indicates a resource limit was exceeded.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::FuelExhausted | Self::ExecutionTimeout { .. })
    }

    /// Returns `true` if the caller supplied an invalid argument list
    /// (type or arity).
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::ArgumentTypeMismatch { .. } | Self::ArityMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::module_not_found("div");
        assert_eq!(err.to_string(), "Module not found: div");

        let err = HostError::unknown_runtime(0xfeed);
        assert_eq!(err.to_string(), "Unknown runtime: 0xfeed");

        let err = HostError::function_not_found("sum", "mul");
        assert_eq!(err.to_string(), "Function not found: sum::mul");

        let err = HostError::FuelExhausted;
        assert_eq!(err.to_string(), "Fuel exhausted: CPU limit exceeded");
    }

    #[test]
    fn test_arity_mismatch_display() {
        let err = HostError::ArityMismatch {
            function: "sum".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Arity mismatch calling 'sum': expected 2 arguments, got 3"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(HostError::module_not_found("m").is_not_found());
        assert!(HostError::unknown_runtime(1).is_not_found());
        assert!(HostError::function_not_found("m", "f").is_not_found());
        assert!(!HostError::FuelExhausted.is_not_found());
    }

    #[test]
    fn test_is_resource_limit() {
        assert!(HostError::FuelExhausted.is_resource_limit());
        assert!(HostError::ExecutionTimeout { duration_ms: 50 }.is_resource_limit());
        assert!(!HostError::module_not_found("m").is_resource_limit());
    }

    #[test]
    fn test_is_argument_error() {
        assert!(HostError::argument_type_mismatch(0, "i32", "bad digit").is_argument_error());
        assert!(
            HostError::ArityMismatch {
                function: "f".into(),
                expected: 2,
                actual: 0,
            }
            .is_argument_error()
        );
        assert!(!HostError::duplicate_module("m").is_argument_error());
    }
}
