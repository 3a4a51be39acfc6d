//! Statically embedded module bytecode.
//!
//! The host binary carries the bytecode of a small set of built-in modules.
//! [`Builtin`] is the closed identifier enumeration; [`BuiltinCatalog`] is
//! the table that maps identifiers (and default names) to bytecode. The
//! catalog is populated once at process start, so adding a built-in means
//! adding one entry to [`Builtin::ALL`] rather than editing a switch in
//! every accessor.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Bytecode for `sum(i32, i32) -> i32`.
///
/// Hand-assembled minimal module: one function, exported as "sum",
/// body `local.get 0; local.get 1; i32.add`.
static WASM_SUM: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, // magic: \0asm
    0x01, 0x00, 0x00, 0x00, // version: 1
    0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f, // type: (i32, i32) -> i32
    0x03, 0x02, 0x01, 0x00, // function: 1 func of type 0
    0x07, 0x07, 0x01, 0x03, 0x73, 0x75, 0x6d, 0x00, 0x00, // export "sum" = func 0
    0x0a, 0x09, 0x01, 0x07, 0x00, // code: 1 body, no locals
    0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b, // local.get 0; local.get 1; i32.add; end
];

/// Bytecode for `div(i32, i32) -> i32` (signed division; traps on zero).
static WASM_DIV: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, // magic: \0asm
    0x01, 0x00, 0x00, 0x00, // version: 1
    0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f, 0x01, 0x7f, // type: (i32, i32) -> i32
    0x03, 0x02, 0x01, 0x00, // function: 1 func of type 0
    0x07, 0x07, 0x01, 0x03, 0x64, 0x69, 0x76, 0x00, 0x00, // export "div" = func 0
    0x0a, 0x09, 0x01, 0x07, 0x00, // code: 1 body, no locals
    0x20, 0x00, 0x20, 0x01, 0x6d, 0x0b, // local.get 0; local.get 1; i32.div_s; end
];

/// Identifiers for the built-in modules embedded in the host.
///
/// This enumeration is closed: it is resolved to bytecode at compile time of
/// the host itself, and the FFI layer mirrors it as a `repr(C)` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    /// `sum(i32, i32) -> i32`.
    Sum,
    /// `div(i32, i32) -> i32`, signed.
    Div,
}

impl Builtin {
    /// Every built-in module, in catalog order.
    pub const ALL: &'static [Builtin] = &[Builtin::Sum, Builtin::Div];

    /// Default registration name for this built-in.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sum => "sum",
            Builtin::Div => "div",
        }
    }

    /// Embedded bytecode for this built-in.
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Builtin::Sum => WASM_SUM,
            Builtin::Div => WASM_DIV,
        }
    }
}

impl std::fmt::Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry in the built-in catalog.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEntry {
    /// The built-in identifier.
    pub builtin: Builtin,
    /// Default registration name.
    pub name: &'static str,
    /// Embedded bytecode.
    pub bytes: &'static [u8],
}

/// Table of built-in modules, populated at process start.
///
/// Accessors go through the table rather than matching on [`Builtin`]
/// directly, so lookup by name and iteration come for free.
pub struct BuiltinCatalog {
    entries: Vec<BuiltinEntry>,
}

impl BuiltinCatalog {
    /// Build the catalog from [`Builtin::ALL`].
    pub fn new() -> Self {
        let entries = Builtin::ALL
            .iter()
            .map(|&builtin| BuiltinEntry {
                builtin,
                name: builtin.name(),
                bytes: builtin.bytes(),
            })
            .collect();

        Self { entries }
    }

    /// The process-wide catalog instance.
    pub fn global() -> &'static BuiltinCatalog {
        static CATALOG: LazyLock<BuiltinCatalog> = LazyLock::new(BuiltinCatalog::new);
        &CATALOG
    }

    /// Look up an entry by identifier.
    pub fn get(&self, builtin: Builtin) -> &BuiltinEntry {
        // ALL covers every variant, so the entry always exists.
        self.entries
            .iter()
            .find(|e| e.builtin == builtin)
            .unwrap_or_else(|| unreachable!("catalog is populated from Builtin::ALL"))
    }

    /// Look up an entry by its default name.
    pub fn get_by_name(&self, name: &str) -> Option<&BuiltinEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Bytecode for a built-in.
    pub fn bytes(&self, builtin: Builtin) -> &'static [u8] {
        self.get(builtin).bytes
    }

    /// Base64-encoded bytecode for a built-in, for transport to another
    /// process or runtime instance.
    pub fn base64(&self, builtin: Builtin) -> String {
        BASE64.encode(self.get(builtin).bytes)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &BuiltinEntry> {
        self.entries.iter()
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}
