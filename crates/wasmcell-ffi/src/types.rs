//! `repr(C)` mirror types and the boundary status encoding.
//!
//! These types define the wire shape of the C contract. They carry no
//! behavior beyond conversion into the core host types.

use std::os::raw::c_char;

use wasmcell_common::HostError;
use wasmcell_core::{self as core, Builtin};

/// Declared type of a textual argument (C mirror of the host's `ArgType`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// Signed 32 bit integer.
    I32,
    /// Signed 64 bit integer.
    I64,
    /// 32 bit IEEE-754 float.
    F32,
    /// 64 bit IEEE-754 float.
    F64,
    /// A 128 bit vector value.
    V128,
    /// A reference to opaque data in the Wasm instance.
    ExternRef,
    /// A reference to a Wasm function.
    FuncRef,
}

impl From<ArgType> for core::ArgType {
    fn from(arg: ArgType) -> Self {
        match arg {
            ArgType::I32 => core::ArgType::I32,
            ArgType::I64 => core::ArgType::I64,
            ArgType::F32 => core::ArgType::F32,
            ArgType::F64 => core::ArgType::F64,
            ArgType::V128 => core::ArgType::V128,
            ArgType::ExternRef => core::ArgType::ExternRef,
            ArgType::FuncRef => core::ArgType::FuncRef,
        }
    }
}

/// Identifiers of the statically embedded modules (C mirror of `Builtin`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinId {
    /// `sum(i32, i32) -> i32`.
    WasmSum,
    /// `div(i32, i32) -> i32`.
    WasmDiv,
}

impl From<BuiltinId> for Builtin {
    fn from(id: BuiltinId) -> Self {
        match id {
            BuiltinId::WasmSum => Builtin::Sum,
            BuiltinId::WasmDiv => Builtin::Div,
        }
    }
}

/// A single textual argument with its declared type.
#[repr(C)]
#[derive(Debug)]
pub struct WasmArg {
    /// NUL-terminated textual representation of the value.
    pub value: *const c_char,
    /// Declared type the value must parse as.
    pub arg_type: ArgType,
}

/// A named export invocation: function name plus an ordered argument
/// sequence with explicit arity.
#[repr(C)]
#[derive(Debug)]
pub struct WasmFunction {
    /// NUL-terminated export name.
    pub name: *const c_char,
    /// Pointer to `arg_count` arguments in declared order; may be null when
    /// `arg_count` is zero.
    pub args: *const WasmArg,
    /// Number of arguments.
    pub arg_count: usize,
}

/// Status codes for every fallible boundary operation.
///
/// This is a closed encoding: callers dispatch over exactly these values,
/// and the host maps its error taxonomy onto them exhaustively.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    /// The operation succeeded.
    Ok = 0,
    /// The runtime handle was never issued or was shut down.
    UnknownRuntime = 1,
    /// A module with this name is already registered.
    DuplicateModule = 2,
    /// No module with this name is registered.
    ModuleNotFound = 3,
    /// The module has no export with this name.
    FunctionNotFound = 4,
    /// The supplied payload was not valid base64.
    InvalidEncoding = 5,
    /// The bytecode failed to compile.
    CompileError = 6,
    /// An argument value could not be represented as its declared type.
    ArgumentTypeMismatch = 7,
    /// The argument count does not match the export's signature.
    ArityMismatch = 8,
    /// The guest trapped during execution.
    GuestTrap = 9,
    /// Execution exceeded the configured timeout.
    ExecutionTimeout = 10,
    /// Execution exhausted the configured fuel limit.
    FuelExhausted = 11,
    /// A null pointer or non-UTF-8 string was supplied.
    InvalidArgument = 12,
    /// A string was released twice, or was never handed out by the host.
    OwnershipViolation = 13,
    /// Invalid host configuration.
    InvalidConfig = 14,
}

impl From<&HostError> for FfiStatus {
    fn from(err: &HostError) -> Self {
        // Exhaustive on purpose: a new error variant must choose its wire
        // encoding here, not fall through a wildcard.
        match err {
            HostError::UnknownRuntime { .. } => FfiStatus::UnknownRuntime,
            HostError::DuplicateModule { .. } => FfiStatus::DuplicateModule,
            HostError::ModuleNotFound { .. } => FfiStatus::ModuleNotFound,
            HostError::FunctionNotFound { .. } => FfiStatus::FunctionNotFound,
            HostError::InvalidEncoding { .. } => FfiStatus::InvalidEncoding,
            HostError::CompileError { .. } => FfiStatus::CompileError,
            HostError::ArgumentTypeMismatch { .. } => FfiStatus::ArgumentTypeMismatch,
            HostError::ArityMismatch { .. } => FfiStatus::ArityMismatch,
            HostError::GuestTrap { .. } => FfiStatus::GuestTrap,
            HostError::ExecutionTimeout { .. } => FfiStatus::ExecutionTimeout,
            HostError::FuelExhausted => FfiStatus::FuelExhausted,
            HostError::InvalidConfig { .. } => FfiStatus::InvalidConfig,
        }
    }
}
