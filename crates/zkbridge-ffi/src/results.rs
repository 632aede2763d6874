//! Ownership of result arrays handed across the C boundary.
//!
//! `parallel_prove` returns a heap array that the caller must give back via
//! `free_parallel_results` with the same count. Every live array is tracked
//! here by address. A release of an address that is not live, or with a
//! count that differs from the published one, is rejected before it reaches
//! the allocator.
//!
//! Releasing twice is the caller's undefined behavior. The allocator may
//! reuse a released address for the next `publish`, so a stale second
//! release is only caught while that address has not been handed out again.

use std::collections::BTreeMap;
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};
use zkbridge_core::{BridgeError, BridgeResult, JobResult};

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// count the caller must pass back
    count: usize,
    /// slots actually allocated (at least one)
    allocated: usize,
}

static LIVE: Mutex<BTreeMap<usize, Entry>> = Mutex::new(BTreeMap::new());

fn live_map() -> MutexGuard<'static, BTreeMap<usize, Entry>> {
    LIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Copy `results` into a fresh array owned by the caller.
///
/// An empty batch still gets a one-slot allocation, so the returned pointer is
/// never null on success.
pub fn publish(results: &[JobResult]) -> BridgeResult<*mut i64> {
    let count = results.len();
    let allocated = count.max(1);
    let mut codes: Vec<i64> = Vec::new();
    codes
        .try_reserve_exact(allocated)
        .map_err(|e| BridgeError::Allocation(format!("result array of {count}: {e}")))?;
    codes.extend(results.iter().map(|r| r.code()));
    codes.resize(allocated, JobResult::Failure.code());

    let raw = Box::into_raw(codes.into_boxed_slice()).cast::<i64>();
    live_map().insert(raw as usize, Entry { count, allocated });
    debug!(count, addr = raw as usize, "result array published");
    Ok(raw)
}

/// Give back an array obtained from [`publish`].
///
/// Null is a no-op. A pointer that is not live, or a `count` that differs from
/// the published one, is a [`BridgeError::ContractViolation`] and leaves the
/// registry untouched. A repeated release is only rejected if the address has
/// not been published again since; see the module docs.
pub fn release(results: *mut i64, count: usize) -> BridgeResult<()> {
    if results.is_null() {
        return Ok(());
    }
    let addr = results as usize;
    let mut live = live_map();
    let Some(entry) = live.get(&addr).copied() else {
        let err = BridgeError::ContractViolation(format!(
            "{results:p} is not a live result array (never returned, or already freed)"
        ));
        error!(error = %err, "release rejected");
        return Err(err);
    };
    if entry.count != count {
        let err = BridgeError::ContractViolation(format!(
            "release of {results:p} with count {count}, but it holds {} results",
            entry.count
        ));
        error!(error = %err, "release rejected");
        return Err(err);
    }
    live.remove(&addr);
    drop(live);

    // SAFETY: `addr` came from `Box::into_raw` of a boxed slice of exactly
    // `allocated` elements in `publish`, and was just removed from the live
    // set, so this is the only reconstruction.
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(results, entry.allocated)) });
    debug!(count, addr, "result array released");
    Ok(())
}

/// Whether `results` is a live, unreleased array.
#[must_use]
pub fn is_live(results: *const i64) -> bool {
    live_map().contains_key(&(results as usize))
}

/// Number of arrays currently owned by callers.
#[must_use]
pub fn live_count() -> usize {
    live_map().len()
}
