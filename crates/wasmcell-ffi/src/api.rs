//! The exported C surface.
//!
//! All entry points run against one process-wide [`WasmHost`], built lazily
//! on first use. Host configuration is read from the TOML file named by the
//! `WASMCELL_CONFIG` environment variable when set, and defaults otherwise.
//! The host's async execution path is bridged to the synchronous C surface
//! through a dedicated Tokio runtime owned by this crate.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::LazyLock;

use tracing::warn;

use crate::string::{export_string, release_string};
use crate::types::{BuiltinId, FfiStatus, WasmFunction};
use wasmcell_common::HostConfig;
use wasmcell_core::{FunctionCall, RuntimeHandle, WasmHost, WasmValue};
use wasmcell_core::args::WasmArg as CoreArg;

/// Tokio runtime bridging the async host to the synchronous C surface.
static RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("wasmcell-ffi")
        .enable_all()
        .build()
        .expect("failed to build FFI bridge runtime")
});

/// The process-wide host instance.
static HOST: LazyLock<WasmHost> = LazyLock::new(|| {
    let config = match std::env::var("WASMCELL_CONFIG") {
        Ok(path) => match wasmcell_common::ConfigFile::from_file(&path) {
            Ok(file) => file.host,
            Err(e) => {
                warn!(%path, error = %e, "Failed to load config file, using defaults");
                HostConfig::default()
            }
        },
        Err(_) => HostConfig::default(),
    };

    WasmHost::new(&config).expect("failed to initialize wasmcell host")
});

/// Read a NUL-terminated UTF-8 string from the caller.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer valid for the
/// duration of the call.
unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, FfiStatus> {
    if ptr.is_null() {
        return Err(FfiStatus::InvalidArgument);
    }

    // SAFETY: non-null and NUL-terminated per this function's contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiStatus::InvalidArgument)
}

/// Allocate a new isolated runtime instance and return its handle.
///
/// Handles are issued monotonically and never reused within a process.
#[unsafe(no_mangle)]
pub extern "C" fn initialize_runtime() -> u64 {
    HOST.initialize_runtime().as_u64()
}

/// Shut down a runtime instance, freeing its registry and compiled modules.
#[unsafe(no_mangle)]
pub extern "C" fn shutdown_runtime(runtime_id: u64) -> FfiStatus {
    match HOST.shutdown_runtime(RuntimeHandle::from(runtime_id)) {
        Ok(()) => FfiStatus::Ok,
        Err(e) => FfiStatus::from(&e),
    }
}

/// Register a built-in module in a runtime instance under its default name.
///
/// On success, when `out_name` is non-null it receives the registered name
/// as an owned string; the caller must release it with [`free_ffi_string`].
///
/// # Safety
///
/// `out_name` must be null or point to writable storage for one pointer.
#[unsafe(no_mangle)]
pub extern "C" fn register_static_module(
    runtime_id: u64,
    module: BuiltinId,
    out_name: *mut *mut c_char,
) -> FfiStatus {
    let handle = RuntimeHandle::from(runtime_id);

    let name = match HOST.register_builtin(handle, module.into(), None) {
        Ok(name) => name,
        Err(e) => return FfiStatus::from(&e),
    };

    if !out_name.is_null() {
        let Some(ptr) = export_string(name) else {
            return FfiStatus::InvalidArgument;
        };
        // SAFETY: out_name is non-null and writable per this function's
        // contract.
        unsafe { *out_name = ptr };
    }

    FfiStatus::Ok
}

/// Register a dynamically supplied module from base64-encoded bytecode.
///
/// # Safety
///
/// `module_name` and `module_data_base64` must be NUL-terminated strings.
#[unsafe(no_mangle)]
pub extern "C" fn register_module(
    runtime_id: u64,
    module_name: *const c_char,
    module_data_base64: *const c_char,
) -> FfiStatus {
    // SAFETY: NUL-terminated per this function's contract.
    let (name, data) = unsafe {
        match (read_str(module_name), read_str(module_data_base64)) {
            (Ok(n), Ok(d)) => (n, d),
            (Err(status), _) | (_, Err(status)) => return status,
        }
    };

    match HOST.register_module_base64(RuntimeHandle::from(runtime_id), name, data) {
        Ok(_) => FfiStatus::Ok,
        Err(e) => FfiStatus::from(&e),
    }
}

/// Whether a module is registered in a runtime instance.
///
/// Pure query: an unknown runtime, a null name, or a non-UTF-8 name all
/// read as `false`.
///
/// # Safety
///
/// `module_name` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub extern "C" fn is_module_registered(runtime_id: u64, module_name: *const c_char) -> bool {
    // SAFETY: NUL-terminated per this function's contract.
    let Ok(name) = (unsafe { read_str(module_name) }) else {
        return false;
    };

    HOST.is_registered(RuntimeHandle::from(runtime_id), name)
}

/// Base64-encoded bytecode of a built-in module, as an owned string.
///
/// Never fails: built-ins are embedded in the host binary. The caller must
/// release the returned string with [`free_ffi_string`].
#[unsafe(no_mangle)]
pub extern "C" fn get_static_module_data(module: BuiltinId) -> *mut c_char {
    let encoded = WasmHost::builtin_base64(module.into());

    // Base64 text never contains an interior NUL.
    export_string(encoded).unwrap_or(std::ptr::null_mut())
}

/// Base64-encoded bytecode of a built-in, scoped to a runtime handle.
///
/// The handle is validated; the bytecode itself comes from the embedded
/// store whether or not the module is registered in that instance. On
/// success `out_data` receives an owned string the caller must release with
/// [`free_ffi_string`].
///
/// # Safety
///
/// `out_data` must point to writable storage for one pointer.
#[unsafe(no_mangle)]
pub extern "C" fn get_runtime_module_base64_data(
    runtime_id: u64,
    module: BuiltinId,
    out_data: *mut *mut c_char,
) -> FfiStatus {
    if out_data.is_null() {
        return FfiStatus::InvalidArgument;
    }

    let encoded = match HOST.runtime_builtin_base64(RuntimeHandle::from(runtime_id), module.into())
    {
        Ok(encoded) => encoded,
        Err(e) => return FfiStatus::from(&e),
    };

    let Some(ptr) = export_string(encoded) else {
        return FfiStatus::InvalidArgument;
    };

    // SAFETY: out_data is non-null and writable per this function's contract.
    unsafe { *out_data = ptr };
    FfiStatus::Ok
}

/// Execute a named export of a registered module.
///
/// The illustrated contract carries a 32-bit integer result: exports
/// returning nothing write `0`, exports returning an `i32` write the value,
/// and any other result type is rejected with
/// [`FfiStatus::ArgumentTypeMismatch`].
///
/// # Safety
///
/// `module_name` must be a NUL-terminated string, `function` must point to
/// a valid [`WasmFunction`] whose `args`/`arg_count` describe a readable
/// array, and `out_result` must point to writable storage for one `i32`.
#[unsafe(no_mangle)]
pub extern "C" fn execute_module(
    runtime_id: u64,
    module_name: *const c_char,
    function: *const WasmFunction,
    out_result: *mut i32,
) -> FfiStatus {
    if function.is_null() || out_result.is_null() {
        return FfiStatus::InvalidArgument;
    }

    // SAFETY: pointers validated above; strings NUL-terminated and the args
    // array readable per this function's contract.
    let (name, call) = unsafe {
        let name = match read_str(module_name) {
            Ok(n) => n,
            Err(status) => return status,
        };

        let call = match convert_function(&*function) {
            Ok(call) => call,
            Err(status) => return status,
        };

        (name, call)
    };

    let handle = RuntimeHandle::from(runtime_id);
    let outcome = RUNTIME.block_on(HOST.execute(handle, name, &call));

    match outcome {
        Ok(WasmValue::Unit) => {
            // SAFETY: out_result validated non-null above.
            unsafe { *out_result = 0 };
            FfiStatus::Ok
        }
        Ok(value) => match value.as_i32() {
            Some(v) => {
                // SAFETY: out_result validated non-null above.
                unsafe { *out_result = v };
                FfiStatus::Ok
            }
            None => FfiStatus::ArgumentTypeMismatch,
        },
        Err(e) => FfiStatus::from(&e),
    }
}

/// Release a string previously returned by this crate.
///
/// This is the single release path for host-owned strings. Releasing a
/// pointer the host never handed out, or releasing the same pointer twice,
/// returns [`FfiStatus::OwnershipViolation`] and leaves memory untouched.
#[unsafe(no_mangle)]
pub extern "C" fn free_ffi_string(data: *mut c_char) -> FfiStatus {
    match release_string(data) {
        Ok(()) => FfiStatus::Ok,
        Err(()) => FfiStatus::OwnershipViolation,
    }
}

/// Convert the C function description into the host's call type.
///
/// # Safety
///
/// `function.args` must point to `function.arg_count` readable elements,
/// and every `value` pointer must be NUL-terminated.
unsafe fn convert_function(function: &WasmFunction) -> Result<FunctionCall, FfiStatus> {
    // SAFETY: NUL-terminated per this function's contract.
    let name = unsafe { read_str(function.name)? };

    if function.args.is_null() && function.arg_count > 0 {
        return Err(FfiStatus::InvalidArgument);
    }

    let raw_args = if function.arg_count == 0 {
        &[]
    } else {
        // SAFETY: non-null with arg_count readable elements per this
        // function's contract.
        unsafe { std::slice::from_raw_parts(function.args, function.arg_count) }
    };

    let mut args = Vec::with_capacity(raw_args.len());
    for raw in raw_args {
        // SAFETY: NUL-terminated per this function's contract.
        let value = unsafe { read_str(raw.value)? };
        args.push(CoreArg::new(value, raw.arg_type.into()));
    }

    Ok(FunctionCall::new(name, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArgType, WasmArg};
    use std::ffi::CString;

    fn c_function(name: &CString, args: &[WasmArg]) -> WasmFunction {
        WasmFunction {
            name: name.as_ptr(),
            args: if args.is_empty() {
                std::ptr::null()
            } else {
                args.as_ptr()
            },
            arg_count: args.len(),
        }
    }

    fn sum_args(a: &CString, b: &CString) -> [WasmArg; 2] {
        [
            WasmArg {
                value: a.as_ptr(),
                arg_type: ArgType::I32,
            },
            WasmArg {
                value: b.as_ptr(),
                arg_type: ArgType::I32,
            },
        ]
    }

    #[test]
    fn test_full_ffi_flow() {
        let runtime = initialize_runtime();
        assert_ne!(runtime, 0);

        let mut name_ptr: *mut c_char = std::ptr::null_mut();
        let status = register_static_module(runtime, BuiltinId::WasmSum, &mut name_ptr);
        assert_eq!(status, FfiStatus::Ok);
        assert!(!name_ptr.is_null());

        // SAFETY: name_ptr came from register_static_module.
        let registered = unsafe { CStr::from_ptr(name_ptr) }.to_str().unwrap();
        assert_eq!(registered, "sum");

        let module_name = CString::new("sum").unwrap();
        assert!(is_module_registered(runtime, module_name.as_ptr()));

        let func_name = CString::new("sum").unwrap();
        let a = CString::new("10").unwrap();
        let b = CString::new("10").unwrap();
        let args = sum_args(&a, &b);
        let function = c_function(&func_name, &args);

        let mut result = 0i32;
        let status = execute_module(runtime, module_name.as_ptr(), &function, &mut result);
        assert_eq!(status, FfiStatus::Ok);
        assert_eq!(result, 20);

        assert_eq!(free_ffi_string(name_ptr), FfiStatus::Ok);
    }

    #[test]
    fn test_base64_transport_between_runtimes() {
        let a = initialize_runtime();
        let b = initialize_runtime();

        let status = register_static_module(a, BuiltinId::WasmDiv, std::ptr::null_mut());
        assert_eq!(status, FfiStatus::Ok);

        let mut data_ptr: *mut c_char = std::ptr::null_mut();
        let status = get_runtime_module_base64_data(a, BuiltinId::WasmDiv, &mut data_ptr);
        assert_eq!(status, FfiStatus::Ok);

        let module_name = CString::new("div").unwrap();
        let status = register_module(b, module_name.as_ptr(), data_ptr);
        assert_eq!(status, FfiStatus::Ok);
        assert!(is_module_registered(b, module_name.as_ptr()));

        let func_name = CString::new("div").unwrap();
        let ten = CString::new("10").unwrap();
        let two = CString::new("2").unwrap();
        let args = sum_args(&ten, &two);
        let function = c_function(&func_name, &args);

        let mut result = 0i32;
        let status = execute_module(b, module_name.as_ptr(), &function, &mut result);
        assert_eq!(status, FfiStatus::Ok);
        assert_eq!(result, 5);

        assert_eq!(free_ffi_string(data_ptr), FfiStatus::Ok);
    }

    #[test]
    fn test_unknown_runtime_and_missing_module() {
        let module_name = CString::new("sum").unwrap();
        let func_name = CString::new("sum").unwrap();
        let function = c_function(&func_name, &[]);
        let mut result = 0i32;

        // A handle that was never issued.
        let status = execute_module(u64::MAX, module_name.as_ptr(), &function, &mut result);
        assert_eq!(status, FfiStatus::UnknownRuntime);

        // A real runtime without the module.
        let runtime = initialize_runtime();
        let status = execute_module(runtime, module_name.as_ptr(), &function, &mut result);
        assert_eq!(status, FfiStatus::ModuleNotFound);

        assert!(!is_module_registered(runtime, module_name.as_ptr()));
    }

    #[test]
    fn test_invalid_base64_payload() {
        let runtime = initialize_runtime();

        let name = CString::new("bad").unwrap();
        let payload = CString::new("!!! not base64 !!!").unwrap();

        let status = register_module(runtime, name.as_ptr(), payload.as_ptr());
        assert_eq!(status, FfiStatus::InvalidEncoding);
    }

    #[test]
    fn test_argument_type_mismatch_through_ffi() {
        let runtime = initialize_runtime();
        register_static_module(runtime, BuiltinId::WasmSum, std::ptr::null_mut());

        let module_name = CString::new("sum").unwrap();
        let func_name = CString::new("sum").unwrap();
        let bad = CString::new("abc").unwrap();
        let ok = CString::new("10").unwrap();
        let args = sum_args(&bad, &ok);
        let function = c_function(&func_name, &args);

        let mut result = 0i32;
        let status = execute_module(runtime, module_name.as_ptr(), &function, &mut result);
        assert_eq!(status, FfiStatus::ArgumentTypeMismatch);
    }

    #[test]
    fn test_null_inputs_rejected() {
        let runtime = initialize_runtime();
        let mut result = 0i32;

        let status = execute_module(runtime, std::ptr::null(), std::ptr::null(), &mut result);
        assert_eq!(status, FfiStatus::InvalidArgument);

        let name = CString::new("m").unwrap();
        let status = register_module(runtime, name.as_ptr(), std::ptr::null());
        assert_eq!(status, FfiStatus::InvalidArgument);

        assert!(!is_module_registered(runtime, std::ptr::null()));
    }

    #[test]
    fn test_free_rejects_double_and_foreign_pointers() {
        let ptr = get_static_module_data(BuiltinId::WasmSum);
        assert!(!ptr.is_null());

        assert_eq!(free_ffi_string(ptr), FfiStatus::Ok);
        // Second release of the same pointer is a contract violation.
        assert_eq!(free_ffi_string(ptr), FfiStatus::OwnershipViolation);

        // A pointer the host never handed out.
        let foreign = CString::new("foreign").unwrap();
        assert_eq!(
            free_ffi_string(foreign.as_ptr().cast_mut()),
            FfiStatus::OwnershipViolation
        );

        // Null is rejected, not freed.
        assert_eq!(
            free_ffi_string(std::ptr::null_mut()),
            FfiStatus::OwnershipViolation
        );
    }

    #[test]
    fn test_shutdown_through_ffi() {
        let runtime = initialize_runtime();
        assert_eq!(shutdown_runtime(runtime), FfiStatus::Ok);
        assert_eq!(shutdown_runtime(runtime), FfiStatus::UnknownRuntime);
    }

    #[test]
    fn test_static_module_data_round_trips() {
        let ptr = get_static_module_data(BuiltinId::WasmDiv);
        assert!(!ptr.is_null());

        // SAFETY: ptr came from get_static_module_data.
        let encoded = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(encoded, WasmHost::builtin_base64(wasmcell_core::Builtin::Div));

        assert_eq!(free_ffi_string(ptr), FfiStatus::Ok);
    }
}
