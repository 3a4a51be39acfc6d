//! WebAssembly module compilation.
//!
//! [`CompiledModule`] wraps a Wasmtime [`Module`] together with a content
//! hash of its source bytes. Compiled modules are immutable and shared
//! behind `Arc` between the registry and in-flight executions.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, Module};

use wasmcell_common::HostError;

/// A compiled WebAssembly module.
///
/// Thread-safe; the underlying Wasmtime module is immutable machine code
/// and can be instantiated concurrently from any number of stores.
#[derive(Clone)]
pub struct CompiledModule {
    inner: Module,

    /// Hash of the original Wasm bytes, for logging and cache keys.
    content_hash: String,

    /// When this module was compiled.
    compiled_at: Instant,
}

impl CompiledModule {
    /// Compile a module from WebAssembly bytes.
    ///
    /// `name` is only used for error context; it is the name the module is
    /// being registered under.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if the bytes are not a valid module.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, name: &str, bytes: &[u8]) -> Result<Self, HostError> {
        let start = Instant::now();

        Self::validate_wasm_header(name, bytes)?;

        let module = Module::new(engine, bytes)
            .map_err(|e| HostError::compile_error(name, e.to_string()))?;

        let content_hash = compute_hash(bytes);
        let duration = start.elapsed();

        info!(
            module = %name,
            content_hash = %content_hash,
            duration_ms = duration.as_millis(),
            "Module compiled"
        );

        Ok(Self {
            inner: module,
            content_hash,
            compiled_at: Instant::now(),
        })
    }

    /// Compile a module from WAT (WebAssembly Text Format).
    ///
    /// This is primarily for testing purposes.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if the WAT is invalid.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, name: &str, wat: &str) -> Result<Self, HostError> {
        let module =
            Module::new(engine, wat).map_err(|e| HostError::compile_error(name, e.to_string()))?;

        Ok(Self {
            inner: module,
            content_hash: compute_hash(wat.as_bytes()),
            compiled_at: Instant::now(),
        })
    }

    /// Get the content hash of the original Wasm bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Get when this module was compiled.
    pub fn compiled_at(&self) -> Instant {
        self.compiled_at
    }

    /// Get the inner Wasmtime module.
    pub fn inner(&self) -> &Module {
        &self.inner
    }

    /// Validate the WebAssembly header (magic number).
    ///
    /// Rejecting obviously-not-Wasm payloads here gives a clearer error than
    /// Wasmtime's parser output for e.g. accidentally base64-decoded text.
    fn validate_wasm_header(name: &str, bytes: &[u8]) -> Result<(), HostError> {
        if bytes.len() < 8 {
            return Err(HostError::compile_error(name, "invalid Wasm: file too small"));
        }

        // Magic number: \0asm
        if &bytes[0..4] != b"\0asm" {
            return Err(HostError::compile_error(
                name,
                "invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WasmEngine;
    use wasmcell_common::EngineConfig;

    // Minimal valid Wasm module (empty module)
    const MINIMAL_WASM: &[u8] = &[
        0x00, 0x61, 0x73, 0x6d, // magic: \0asm
        0x01, 0x00, 0x00, 0x00, // version: 1
    ];

    fn test_engine() -> WasmEngine {
        let config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        WasmEngine::new(&config).unwrap()
    }

    #[test]
    fn test_validate_wasm_header_valid() {
        assert!(CompiledModule::validate_wasm_header("m", MINIMAL_WASM).is_ok());
    }

    #[test]
    fn test_validate_wasm_header_too_small() {
        let result = CompiledModule::validate_wasm_header("m", &[0x00, 0x61]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_wasm_header_bad_magic() {
        let bad_wasm = &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        let result = CompiledModule::validate_wasm_header("m", bad_wasm);
        assert!(matches!(result, Err(HostError::CompileError { .. })));
    }

    #[test]
    fn test_compute_hash() {
        let hash1 = compute_hash(b"hello");
        let hash2 = compute_hash(b"hello");
        let hash3 = compute_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 16); // 64-bit hex
    }

    #[test]
    fn test_module_compilation() {
        let engine = test_engine();

        let module = CompiledModule::from_bytes(engine.inner(), "empty", MINIMAL_WASM);
        assert!(module.is_ok());
        assert!(!module.unwrap().content_hash().is_empty());
    }

    #[test]
    fn test_module_compilation_error_context() {
        let engine = test_engine();

        let err =
            CompiledModule::from_bytes(engine.inner(), "broken", b"not a wasm module").unwrap_err();
        match err {
            HostError::CompileError { name, .. } => assert_eq!(name, "broken"),
            other => panic!("expected CompileError, got {other}"),
        }
    }

    #[test]
    fn test_module_from_wat() {
        let engine = test_engine();

        let module = CompiledModule::from_wat(
            engine.inner(),
            "nop",
            r#"(module (func (export "nop")))"#,
        );
        assert!(module.is_ok());
    }

    #[test]
    fn test_module_debug() {
        let engine = test_engine();
        let module = CompiledModule::from_bytes(engine.inner(), "empty", MINIMAL_WASM).unwrap();

        let debug_str = format!("{module:?}");
        assert!(debug_str.contains("CompiledModule"));
        assert!(debug_str.contains("content_hash"));
    }
}
