//! Typed argument marshalling.
//!
//! The host accepts arguments as textual values tagged with a declared
//! [`ArgType`], and converts them to Wasmtime [`Val`]s immediately before
//! invocation. This layer is pure: it has no side effects and rejects any
//! representation mismatch (overflow, malformed digits, wrong vector width)
//! instead of truncating.

use serde::{Deserialize, Serialize};
use wasmtime::{Val, ValType};

use wasmcell_common::HostError;

/// Declared type of a textual argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

impl ArgType {
    /// Whether this declared type matches the engine's parameter type.
    pub fn matches(self, val_type: &ValType) -> bool {
        matches!(
            (self, val_type),
            (ArgType::I32, ValType::I32)
                | (ArgType::I64, ValType::I64)
                | (ArgType::F32, ValType::F32)
                | (ArgType::F64, ValType::F64)
                | (ArgType::V128, ValType::V128)
        ) || matches!(
            (self, val_type),
            (ArgType::ExternRef | ArgType::FuncRef, ValType::Ref(_))
        )
    }
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArgType::I32 => "i32",
            ArgType::I64 => "i64",
            ArgType::F32 => "f32",
            ArgType::F64 => "f64",
            ArgType::V128 => "v128",
            ArgType::ExternRef => "externref",
            ArgType::FuncRef => "funcref",
        };
        f.write_str(s)
    }
}

/// A single textual argument with its declared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmArg {
    /// Textual representation of the value.
    pub value: String,
    /// Declared type the value must parse as.
    pub arg_type: ArgType,
}

impl WasmArg {
    /// Convenience constructor.
    pub fn new(value: impl Into<String>, arg_type: ArgType) -> Self {
        Self {
            value: value.into(),
            arg_type,
        }
    }
}

/// A named export invocation: function name plus ordered arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    /// Export name to invoke.
    pub name: String,
    /// Arguments in declared order; arity is explicit (`args.len()`).
    pub args: Vec<WasmArg>,
}

impl FunctionCall {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, args: Vec<WasmArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// A typed result returned from a guest export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum WasmValue {
    /// The export returned no value.
    Unit,
    /// 32 bit integer result.
    I32(i32),
    /// 64 bit integer result.
    I64(i64),
    /// 32 bit float result.
    F32(f32),
    /// 64 bit float result.
    F64(f64),
    /// 128 bit vector result.
    V128(u128),
}

impl WasmValue {
    /// The value as an `i32`, if it is one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            WasmValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert an engine value back to the host representation.
    ///
    /// Reference-typed results have no host representation and are rejected.
    pub fn from_val(val: &Val) -> Result<Self, String> {
        match val {
            Val::I32(v) => Ok(WasmValue::I32(*v)),
            Val::I64(v) => Ok(WasmValue::I64(*v)),
            Val::F32(bits) => Ok(WasmValue::F32(f32::from_bits(*bits))),
            Val::F64(bits) => Ok(WasmValue::F64(f64::from_bits(*bits))),
            Val::V128(v) => Ok(WasmValue::V128(v.as_u128())),
            Val::FuncRef(_) | Val::ExternRef(_) | Val::AnyRef(_) => {
                Err("unsupported result type: reference".to_string())
            }
        }
    }
}

impl std::fmt::Display for WasmValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasmValue::Unit => f.write_str("()"),
            WasmValue::I32(v) => write!(f, "{v}"),
            WasmValue::I64(v) => write!(f, "{v}"),
            WasmValue::F32(v) => write!(f, "{v}"),
            WasmValue::F64(v) => write!(f, "{v}"),
            WasmValue::V128(v) => write!(f, "{v:#034x}"),
        }
    }
}

/// Parse a single argument into an engine value.
///
/// `index` is the argument's position, carried into the error for context.
pub fn marshal_arg(index: usize, arg: &WasmArg) -> Result<Val, HostError> {
    let value = arg.value.trim();

    match arg.arg_type {
        ArgType::I32 => parse_int::<i32>(value)
            .map(Val::I32)
            .map_err(|reason| HostError::argument_type_mismatch(index, "i32", reason)),
        ArgType::I64 => parse_int::<i64>(value)
            .map(Val::I64)
            .map_err(|reason| HostError::argument_type_mismatch(index, "i64", reason)),
        ArgType::F32 => value
            .parse::<f32>()
            .map(|v| Val::F32(v.to_bits()))
            .map_err(|e| HostError::argument_type_mismatch(index, "f32", e.to_string())),
        ArgType::F64 => value
            .parse::<f64>()
            .map(|v| Val::F64(v.to_bits()))
            .map_err(|e| HostError::argument_type_mismatch(index, "f64", e.to_string())),
        ArgType::V128 => parse_v128(value)
            .map(|v| Val::V128(v.into()))
            .map_err(|reason| HostError::argument_type_mismatch(index, "v128", reason)),
        // Reference values only exist as engine-managed tokens; there is no
        // textual representation the host accepts.
        ArgType::ExternRef | ArgType::FuncRef => Err(HostError::argument_type_mismatch(
            index,
            arg.arg_type.to_string(),
            "reference arguments cannot be supplied as text",
        )),
    }
}

/// Parse and validate a full argument list against an export's signature.
///
/// Checks arity first, then declared-vs-actual parameter types, then parses
/// each value. Declared order is preserved.
pub fn marshal_args(
    function: &str,
    args: &[WasmArg],
    params: &[ValType],
) -> Result<Vec<Val>, HostError> {
    if args.len() != params.len() {
        return Err(HostError::ArityMismatch {
            function: function.to_string(),
            expected: params.len(),
            actual: args.len(),
        });
    }

    args.iter()
        .zip(params)
        .enumerate()
        .map(|(index, (arg, param))| {
            if !arg.arg_type.matches(param) {
                return Err(HostError::argument_type_mismatch(
                    index,
                    param.to_string(),
                    format!("argument declared as {}", arg.arg_type),
                ));
            }
            marshal_arg(index, arg)
        })
        .collect()
}

/// Parse a signed integer from decimal or `0x`-prefixed hex.
///
/// Overflow is reported as an error, never truncated.
fn parse_int<T>(value: &str) -> Result<T, String>
where
    T: TryFrom<i128>,
{
    let (digits, negative) = match value.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (value, false),
    };

    // The underlying parsers accept their own sign, which would let "--5"
    // or "0x-5" through with a surprising value. One optional leading '-'
    // is the only sign this grammar has.
    if digits.starts_with(['+', '-']) {
        return Err(format!("'{value}': malformed sign"));
    }

    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        if hex.starts_with(['+', '-']) {
            return Err(format!("'{value}': malformed sign"));
        }
        i128::from_str_radix(hex, 16)
    } else {
        digits.parse::<i128>()
    }
    .map_err(|e| format!("'{value}': {e}"))?;

    let signed = if negative { -parsed } else { parsed };

    T::try_from(signed).map_err(|_| format!("'{value}': out of range"))
}

/// Parse a 128 bit vector from a fixed-width hex literal.
fn parse_v128(value: &str) -> Result<u128, String> {
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    // No sign: a vector literal is 32 raw hex digits.
    if hex.starts_with(['+', '-']) {
        return Err(format!("'{value}': malformed sign"));
    }

    if hex.len() != 32 {
        return Err(format!(
            "'{value}': expected 32 hex digits (16 bytes), got {}",
            hex.len()
        ));
    }

    u128::from_str_radix(hex, 16).map_err(|e| format!("'{value}': {e}"))
}
