//! `zkbridge-ffi`: C ABI for proof generation and verification.
//!
//! Built as `cdylib`/`staticlib` for mobile and desktop hosts. With the
//! default `cabi` feature these symbols are exported unmangled; the matching
//! declarations live in `include/zkbridge.h`.
//!
//! ## Exported
//! - `prove(...) -> int32_t`: one proof; 0 on success, 1 on failure with a
//!   message in the caller's buffer.
//! - `verify(proof, public, vk) -> int32_t`: 0 if the proof is accepted.
//! - `parallel_prove(...) -> int64_t*`: N proofs with bounded concurrency.
//!   Returns an array of N codes, or NULL if setup failed.
//! - `free_parallel_results(ptr, count)`: give that array back, exactly once.
//! - `zkbridge_abi_version`, `zkbridge_version`, `zkbridge_init_logging`,
//!   `zkbridge_live_results`.
//!
//! ### Minimal C usage
//! ```c
//! char err[256];
//! const char* w[] = {"a.wtns", "b.wtns"};
//! const char* p[] = {"proof_0.json", "proof_1.json"};
//! const char* q[] = {"public_0.json", "public_1.json"};
//! int64_t* r = parallel_prove(w, "circuit.zkey", p, q, 2, err, sizeof err, 0, 0);
//! if (r) {
//!     for (int i = 0; i < 2; i++) printf("%d: %lld\n", i, (long long) r[i]);
//!     free_parallel_results(r, 2);
//! } else {
//!     fprintf(stderr, "batch failed: %s\n", err);
//! }
//! ```
//!
//! ### Error buffer contract
//! When `error_msg` is non-null and `error_msg_maxsize > 0`, its first byte is
//! cleared on entry and at most `error_msg_maxsize` bytes (NUL included) are
//! ever written. Otherwise the buffer is never touched.
//!
//! ### Panics
//! No panic crosses this boundary. A panic inside the prover fails that job;
//! a panic anywhere else fails the call.

#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_safety_doc, clippy::doc_markdown)]

pub mod marshal;
pub mod results;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;
use tracing::{error, warn};
use zkbridge_core::{
    panic_message, BatchConfig, BridgeError, BridgeResult, DeviceType, JobResult, Prover,
};
use zkbridge_digest::DigestProver;
use zkbridge_scheduler::{BatchOutcome, Job, Orchestrator};

/// Stable ABI contract version (bump on breaking C ABI changes).
pub const ZKBRIDGE_FFI_ABI_VERSION: u32 = 1;

static BACKEND: DigestProver = DigestProver;
static VERSION_CSTR: OnceLock<CString> = OnceLock::new();

fn prover() -> Prover<'static, DigestProver> {
    Prover::new(&BACKEND)
}

/// Run `f`, turning a panic into a [`BridgeError`].
fn guarded<T>(entry: &'static str, f: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<T> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        error!(entry, panic = panic_message(payload.as_ref()), "panic caught at the C boundary");
        Err(BridgeError::panicked(payload.as_ref()))
    })
}

fn device_from_raw(raw: i32) -> BridgeResult<DeviceType> {
    DeviceType::try_from(i64::from(raw))
}

const fn status(r: JobResult) -> i32 {
    r as i32
}

/// Generate one proof.
///
/// Returns 0 on success. On failure returns 1 and, if a buffer was given,
/// writes a NUL-terminated message of at most `error_msg_maxsize` bytes.
///
/// # Safety
/// - Path arguments are null or NUL-terminated strings.
/// - `error_msg` is null or writable for `error_msg_maxsize` bytes.
#[cfg_attr(feature = "cabi", no_mangle)]
pub unsafe extern "C" fn prove(
    witness_path: *const c_char,
    zkey_path: *const c_char,
    proof_path: *const c_char,
    public_path: *const c_char,
    error_msg: *mut c_char,
    error_msg_maxsize: u64,
    device: i32,
) -> i32 {
    // SAFETY: buffer contract is the caller's.
    let mut sink = unsafe { marshal::error_sink(error_msg, error_msg_maxsize) };
    sink.clear();

    let outcome = guarded("prove", || {
        // SAFETY: path contract is the caller's.
        let request = unsafe {
            zkbridge_core::ProofRequest::new(
                marshal::resolve_path(witness_path, "witness")?,
                marshal::resolve_path(zkey_path, "zkey")?,
                marshal::resolve_path(proof_path, "proof")?,
                marshal::resolve_path(public_path, "public")?,
            )
        };
        prover().try_prove(&request, device_from_raw(device)?)
    });
    status(sink.settle(outcome))
}

/// Verify a proof against its public inputs and verification key.
///
/// Returns 0 if accepted, 1 if rejected or if verification could not run.
///
/// # Safety
/// Arguments are null or NUL-terminated strings.
#[cfg_attr(feature = "cabi", no_mangle)]
pub unsafe extern "C" fn verify(
    proof_path: *const c_char,
    public_path: *const c_char,
    vk_path: *const c_char,
) -> i32 {
    let outcome = guarded("verify", || {
        // SAFETY: path contract is the caller's.
        let (proof, public, vk) = unsafe {
            (
                marshal::resolve_path(proof_path, "proof")?,
                marshal::resolve_path(public_path, "public")?,
                marshal::resolve_path(vk_path, "verification key")?,
            )
        };
        Ok(prover().verify_one(proof, public, vk))
    });
    match outcome {
        Ok(r) => status(r),
        Err(e) => {
            warn!(error = %e, "verify failed before reaching the backend");
            status(JobResult::Failure)
        }
    }
}

unsafe fn run_parallel(
    witness_paths: *const *const c_char,
    zkey_path: *const c_char,
    proof_paths: *const *const c_char,
    public_paths: *const *const c_char,
    num_proofs: u64,
    device: i32,
    max_batch_size: u64,
) -> BridgeResult<(*mut i64, Option<String>)> {
    let n = usize::try_from(num_proofs).map_err(|_| {
        BridgeError::InputResolution(format!("num_proofs {num_proofs} exceeds the address space"))
    })?;
    // A bound wider than the address space cannot bind anything.
    let config = BatchConfig::new(usize::try_from(max_batch_size).unwrap_or(usize::MAX));

    let outcome = match device_from_raw(device) {
        Err(e) => BatchOutcome::all_failed(n, &e)?,
        Ok(device) => {
            // SAFETY: path contract is the caller's.
            let zkey = unsafe { marshal::resolve_path(zkey_path, "zkey") };
            let mut jobs: Vec<Job> = Vec::new();
            jobs.try_reserve_exact(n)
                .map_err(|e| BridgeError::Allocation(format!("{n} jobs: {e}")))?;
            for i in 0..n {
                // SAFETY: arrays hold `num_proofs` entries per the caller contract.
                jobs.push(unsafe {
                    marshal::job_at(i, witness_paths, &zkey, proof_paths, public_paths)
                });
            }
            Orchestrator::new(prover(), config).run(&jobs, device)?
        }
    };

    let first_error = outcome.first_error().map(str::to_owned);
    Ok((results::publish(outcome.results())?, first_error))
}

/// Generate `num_proofs` proofs sharing one proving key.
///
/// At most `max_batch_size` proofs run at once (0 selects the default of 10).
/// Returns an array of `num_proofs` codes (0 success, 1 failure) in input
/// order, to be released with [`free_parallel_results`]. Returns null only
/// if the batch could not be set up; the buffer then says why. When some jobs
/// fail, the buffer holds the first failure as `proof <index>: <message>`.
///
/// # Safety
/// - The three path arrays are null or hold `num_proofs` entries, each null or
///   a NUL-terminated string.
/// - `error_msg` is null or writable for `error_msg_maxsize` bytes.
#[cfg_attr(feature = "cabi", no_mangle)]
pub unsafe extern "C" fn parallel_prove(
    witness_paths: *const *const c_char,
    zkey_path: *const c_char,
    proof_paths: *const *const c_char,
    public_paths: *const *const c_char,
    num_proofs: u64,
    error_msg: *mut c_char,
    error_msg_maxsize: u64,
    device: i32,
    max_batch_size: u64,
) -> *mut i64 {
    // SAFETY: buffer contract is the caller's.
    let mut sink = unsafe { marshal::error_sink(error_msg, error_msg_maxsize) };
    sink.clear();

    let outcome = guarded("parallel_prove", || {
        // SAFETY: forwarded caller contract.
        unsafe {
            run_parallel(
                witness_paths,
                zkey_path,
                proof_paths,
                public_paths,
                num_proofs,
                device,
                max_batch_size,
            )
        }
    });
    match outcome {
        Ok((results, first_error)) => {
            if let Some(msg) = first_error {
                sink.write(&msg);
            }
            results
        }
        Err(e) => {
            error!(error = %e, "parallel_prove setup failed");
            sink.write(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Release an array returned by [`parallel_prove`].
///
/// `count` must equal the `num_proofs` it was created with. Null is a no-op.
/// A pointer that was never returned, or a mismatched count, is logged and
/// rejected without freeing anything.
///
/// # Safety
/// `results` is null or a live pointer returned by [`parallel_prove`] and not
/// yet released. Freeing the same array twice is undefined behavior: once an
/// array is released its address may be handed out again by a later
/// `parallel_prove`, and a stale second free then releases that newer array.
/// Detection of repeated frees is best-effort only.
#[cfg_attr(feature = "cabi", no_mangle)]
pub unsafe extern "C" fn free_parallel_results(results: *mut i64, count: u64) {
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    // Rejections are logged inside `release`.
    let _ = guarded("free_parallel_results", || results::release(results, count));
}

/// Stable ABI contract version.
#[cfg_attr(feature = "cabi", no_mangle)]
pub extern "C" fn zkbridge_abi_version() -> u32 {
    ZKBRIDGE_FFI_ABI_VERSION
}

/// Pointer to a static, NUL-terminated crate version string. Do not free.
#[cfg_attr(feature = "cabi", no_mangle)]
pub extern "C" fn zkbridge_version() -> *const c_char {
    VERSION_CSTR
        .get_or_init(|| CString::new(env!("CARGO_PKG_VERSION")).unwrap_or_default())
        .as_ptr()
}

/// Install a stderr log subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Returns 0 if installed, 1 if a subscriber was already set.
#[cfg_attr(feature = "cabi", no_mangle)]
pub extern "C" fn zkbridge_init_logging() -> i32 {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let installed = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok();
    i32::from(!installed)
}

/// Number of result arrays not yet released.
#[cfg_attr(feature = "cabi", no_mangle)]
pub extern "C" fn zkbridge_live_results() -> u64 {
    u64::try_from(results::live_count()).unwrap_or(u64::MAX)
}
