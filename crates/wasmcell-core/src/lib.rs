//! Multi-tenant Wasmtime execution host.
//!
//! This crate provides the core of wasmcell:
//! - [`WasmEngine`]: configured Wasmtime engine shared by all runtime instances
//! - [`BuiltinCatalog`]: statically embedded module bytecode, keyed by [`Builtin`]
//! - [`ModuleRegistry`]: per-instance name to compiled-module mapping
//! - [`ModuleRunner`]: instantiates modules and invokes exports with typed args
//! - [`WasmHost`]: the runtime instance manager tying it all together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       WasmHost                          │
//! │  DashMap<handle, RuntimeInstance>   (cross-tenant)      │
//! └─────────────────────────────────────────────────────────┘
//!        │ one per handle                      │ shared
//!        ▼                                     ▼
//! ┌───────────────────────────┐   ┌──────────────────────────┐
//! │      RuntimeInstance      │   │   WasmEngine + Runner    │
//! │  Mutex<ModuleRegistry>    │   │  fuel / epoch / pooling  │
//! │  name → CompiledModule    │   └──────────────────────────┘
//! └───────────────────────────┘                │
//!                                              ▼
//!                              ┌──────────────────────────────┐
//!                              │   Store<CallContext> (per    │
//!                              │   call, isolated, limited)   │
//!                              └──────────────────────────────┘
//! ```
//!
//! Every runtime instance is fully isolated: registering a module in one
//! instance is never observable from another, and distinct handles can be
//! used concurrently without contention.

pub mod args;
pub mod builtin;
pub mod engine;
pub mod executor;
pub mod module;
pub mod registry;
pub mod runtime;
pub mod store;

pub use args::{ArgType, FunctionCall, WasmArg, WasmValue};
pub use builtin::{Builtin, BuiltinCatalog};
pub use engine::WasmEngine;
pub use executor::ModuleRunner;
pub use module::CompiledModule;
pub use registry::ModuleRegistry;
pub use runtime::{RuntimeHandle, WasmHost};
pub use store::{CallContext, ExecutionMetrics};
