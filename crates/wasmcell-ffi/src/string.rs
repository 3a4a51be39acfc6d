//! Owned strings crossing the FFI boundary.
//!
//! Strings handed to the caller are allocated here and released here, and
//! nowhere else. A ledger of outstanding pointers turns the two classic
//! misuse modes (double release, releasing a pointer the host never
//! produced) into rejected calls instead of undefined behavior.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::LazyLock;

use dashmap::DashMap;

/// Outstanding allocations, keyed by pointer address.
static LEDGER: LazyLock<DashMap<usize, ()>> = LazyLock::new(DashMap::new);

/// Hand a string to the caller as an owned NUL-terminated buffer.
///
/// Returns `None` if the string contains an interior NUL (nothing the host
/// produces does; this guards adversarial registered names).
pub fn export_string(s: String) -> Option<*mut c_char> {
    let cstring = CString::new(s).ok()?;
    let ptr = cstring.into_raw();

    LEDGER.insert(ptr as usize, ());
    Some(ptr)
}

/// Release a string previously produced by [`export_string`].
///
/// This is the only release path. Returns `Err(())` and leaves the
/// allocation alone if the pointer is not in the ledger: either it was
/// never handed out, or it was already released.
pub fn release_string(ptr: *mut c_char) -> Result<(), ()> {
    if ptr.is_null() {
        return Err(());
    }

    if LEDGER.remove(&(ptr as usize)).is_none() {
        return Err(());
    }

    // SAFETY: the ledger entry proves this exact pointer came out of
    // CString::into_raw in export_string and has not been released yet.
    drop(unsafe { CString::from_raw(ptr) });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_export_and_release() {
        let ptr = export_string("hello".to_string()).unwrap();

        // SAFETY: ptr is a live NUL-terminated buffer from export_string.
        let readback = unsafe { CStr::from_ptr(ptr) };
        assert_eq!(readback.to_str().unwrap(), "hello");

        assert!(release_string(ptr).is_ok());
    }

    #[test]
    fn test_double_release_rejected() {
        let ptr = export_string("once".to_string()).unwrap();

        assert!(release_string(ptr).is_ok());
        assert!(release_string(ptr).is_err());
    }

    #[test]
    fn test_foreign_pointer_rejected() {
        let foreign = CString::new("not ours").unwrap();
        let ptr = foreign.as_ptr().cast_mut();

        assert!(release_string(ptr).is_err());
        // `foreign` is still valid and dropped normally here.
    }

    #[test]
    fn test_null_rejected() {
        assert!(release_string(std::ptr::null_mut()).is_err());
    }

    #[test]
    fn test_interior_nul_rejected() {
        assert!(export_string("a\0b".to_string()).is_none());
    }
}
