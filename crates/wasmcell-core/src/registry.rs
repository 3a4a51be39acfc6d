//! Per-instance module registry.
//!
//! Each runtime instance owns one [`ModuleRegistry`] mapping module names to
//! compiled modules. A name is registered at most once per instance;
//! re-registration fails and leaves the existing module intact. The registry
//! itself is not synchronized; the owning runtime instance guards it with
//! its exclusive lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::CompiledModule;
use wasmcell_common::HostError;

/// Name to compiled-module mapping for one runtime instance.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<CompiledModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module under `name`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateModule` if the name is already taken; the existing
    /// registration is untouched.
    pub fn insert(&mut self, name: &str, module: Arc<CompiledModule>) -> Result<(), HostError> {
        if self.modules.contains_key(name) {
            return Err(HostError::duplicate_module(name));
        }

        self.modules.insert(name.to_string(), module);
        Ok(())
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledModule>> {
        self.modules.get(name).cloned()
    }

    /// Whether a module is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, unordered.
    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
