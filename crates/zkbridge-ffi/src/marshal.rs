//! Raw C arguments to Rust values.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use tracing::warn;
use zkbridge_core::{BridgeError, BridgeResult, ErrorSink, ProofRequest};
use zkbridge_scheduler::Job;

/// Borrow a NUL-terminated C string as a path.
///
/// # Safety
/// `ptr` is null or points to a NUL-terminated string that outlives `'a`.
pub unsafe fn resolve_path<'a>(ptr: *const c_char, what: &str) -> BridgeResult<&'a Path> {
    if ptr.is_null() {
        return Err(BridgeError::InputResolution(format!("{what} path is null")));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let bytes = unsafe { CStr::from_ptr(ptr) }.to_bytes();
    if bytes.is_empty() {
        return Err(BridgeError::InputResolution(format!("{what} path is empty")));
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(Path::new(std::ffi::OsStr::from_bytes(bytes)))
    }
    #[cfg(not(unix))]
    {
        std::str::from_utf8(bytes)
            .map(Path::new)
            .map_err(|_| BridgeError::InputResolution(format!("{what} path is not UTF-8")))
    }
}

/// Borrow entry `index` of a C array of path strings.
///
/// # Safety
/// `array` is null or points to at least `index + 1` entries, each valid for
/// [`resolve_path`].
pub unsafe fn path_at<'a>(
    array: *const *const c_char,
    index: usize,
    what: &str,
) -> BridgeResult<&'a Path> {
    if array.is_null() {
        return Err(BridgeError::InputResolution(format!("{what} path array is null")));
    }
    // SAFETY: in bounds per the caller contract.
    let entry = unsafe { *array.add(index) };
    // SAFETY: forwarded contract.
    unsafe { resolve_path(entry, &format!("{what} {index}")) }
}

/// Build job `index` of a batch. The shared `zkey` was resolved once.
///
/// # Safety
/// Each array is null or holds more than `index` entries valid for
/// [`resolve_path`].
pub unsafe fn job_at(
    index: usize,
    witnesses: *const *const c_char,
    zkey: &BridgeResult<&Path>,
    proofs: *const *const c_char,
    publics: *const *const c_char,
) -> Job {
    // SAFETY: forwarded contract for all three arrays.
    let (witness, proof, public) = unsafe {
        (
            path_at(witnesses, index, "witness")?,
            path_at(proofs, index, "proof")?,
            path_at(publics, index, "public")?,
        )
    };
    let zkey = zkey.clone()?;
    Ok(ProofRequest::new(witness, zkey, proof, public))
}

/// View the caller's message buffer as an [`ErrorSink`].
///
/// A null pointer or zero capacity yields a disabled sink that never touches
/// memory.
///
/// # Safety
/// `ptr` is null or valid for writes of `capacity` bytes for `'a`, and is not
/// aliased by anything else the bridge reads during the call.
pub unsafe fn error_sink<'a>(ptr: *mut c_char, capacity: u64) -> ErrorSink<'a> {
    if ptr.is_null() || capacity == 0 {
        return ErrorSink::disabled();
    }
    let Ok(len) = usize::try_from(capacity) else {
        warn!(capacity, "error buffer capacity exceeds the address space; ignoring buffer");
        return ErrorSink::disabled();
    };
    // SAFETY: non-null and writable for `len` bytes per the caller contract.
    ErrorSink::new(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), len) })
}
