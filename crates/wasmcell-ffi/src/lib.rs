//! C-callable boundary layer for the wasmcell host.
//!
//! This crate compiles to a `cdylib` exposing the host's contract to
//! non-Rust callers:
//!
//! - `initialize_runtime` / `shutdown_runtime`: instance lifecycle
//! - `register_module` / `register_static_module`: module registration
//! - `is_module_registered`: registration query
//! - `get_static_module_data` / `get_runtime_module_base64_data`: bytecode
//!   transport as base64
//! - `execute_module`: typed invocation of a named export
//! - `free_ffi_string`: the single release path for every string the host
//!   hands out
//!
//! # Ownership across the boundary
//!
//! Every `*mut c_char` returned by this crate is owned by the caller until
//! it is passed back to [`free_ffi_string`]. The crate keeps a ledger of
//! outstanding allocations: releasing a pointer the host never handed out,
//! or releasing the same pointer twice, is rejected with
//! [`FfiStatus::OwnershipViolation`] instead of corrupting the allocator.
//!
//! # Errors
//!
//! Every fallible entry point returns an [`FfiStatus`]; no error is ever
//! raised as a host-fatal fault, and null or non-UTF-8 inputs are reported
//! as [`FfiStatus::InvalidArgument`] rather than dereferenced blindly.

// The whole crate is the FFI boundary; raw-pointer handling is its job.
#![allow(unsafe_code)]

pub mod api;
pub mod string;
pub mod types;

pub use api::{
    execute_module, free_ffi_string, get_runtime_module_base64_data, get_static_module_data,
    initialize_runtime, is_module_registered, register_module, register_static_module,
    shutdown_runtime,
};
pub use types::{ArgType, BuiltinId, FfiStatus, WasmArg, WasmFunction};
