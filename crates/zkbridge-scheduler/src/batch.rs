// crates/zkbridge-scheduler/src/batch.rs

//! Chunked, bounded batch execution.
//!
//! A batch of `N` jobs is split into `ceil(N / max)` consecutive chunks. Chunks
//! run one after another; the jobs of a chunk run concurrently on a pool of at
//! most `max` workers, so no more than `max` backend calls are ever in flight.
//! Each job owns exactly one result slot at its input index, which keeps the
//! output aligned with the input no matter the completion order.

use crate::first_error::FirstError;
use crate::interval::partition;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::time::Instant;
use tracing::{debug, debug_span, info, warn};
use zkbridge_core::{
    BatchConfig, BridgeError, BridgeResult, DeviceType, JobResult, ProofRequest, Prover,
    ProvingBackend,
};

/// One batch entry. `Err` marks an input that could not be resolved; that
/// job fails without reaching the backend.
pub type Job = BridgeResult<ProofRequest>;

/// Lifecycle of a batch, as reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPhase {
    /// Inputs accepted, nothing scheduled.
    Received,
    /// Split into chunks.
    Partitioned,
    /// A chunk has been handed to the pool.
    Dispatched,
    /// All chunks returned; gathering the first error.
    Collecting,
    /// Results are final.
    Completed,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::Partitioned => "partitioned",
            Self::Dispatched => "dispatched",
            Self::Collecting => "collecting",
            Self::Completed => "completed",
        })
    }
}

/// Allocate `n` result slots, all initialised to [`JobResult::Failure`].
///
/// Reports [`BridgeError::Allocation`] instead of aborting when the
/// reservation cannot be satisfied.
pub fn allocate_results(n: usize) -> BridgeResult<Vec<JobResult>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(n)
        .map_err(|e| BridgeError::Allocation(format!("{n} result slots: {e}")))?;
    slots.resize(n, JobResult::Failure);
    Ok(slots)
}

/// Per-job results in input order, plus the one message the batch reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    results: Vec<JobResult>,
    first_error: Option<String>,
}

impl BatchOutcome {
    /// Every job failed for the same reason, e.g. the device was rejected.
    pub fn all_failed(n: usize, err: &BridgeError) -> BridgeResult<Self> {
        Ok(Self {
            results: allocate_results(n)?,
            first_error: Some(err.to_string()),
        })
    }

    /// Results, index-aligned with the submitted jobs.
    #[must_use]
    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    /// Consume into the result vector.
    #[must_use]
    pub fn into_results(self) -> Vec<JobResult> {
        self.results
    }

    /// The first failure message recorded, if any job failed.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.first_error.as_deref()
    }

    /// Number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of successful jobs.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed jobs.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Runs batches against one prover with one concurrency bound.
pub struct Orchestrator<'b, B: ?Sized> {
    prover: Prover<'b, B>,
    config: BatchConfig,
}

impl<'b, B: ProvingBackend + ?Sized> Orchestrator<'b, B> {
    /// Bind a prover and a batch configuration.
    #[must_use]
    pub const fn new(prover: Prover<'b, B>, config: BatchConfig) -> Self {
        Self { prover, config }
    }

    /// The concurrency bound in force.
    #[must_use]
    pub const fn config(&self) -> BatchConfig {
        self.config
    }

    fn pool(&self, n: usize) -> BridgeResult<ThreadPool> {
        let threads = self.config.max_batch_size().min(n).max(1);
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("zkbridge-prove-{i}"))
            .build()
            .map_err(|e| BridgeError::Allocation(format!("worker pool of {threads}: {e}")))
    }

    /// Prove every job and return results in input order.
    ///
    /// Only setup failures (slot or pool allocation) are returned as `Err`.
    /// Job failures, including an unusable device, are reported per slot.
    pub fn run(&self, jobs: &[Job], device: DeviceType) -> BridgeResult<BatchOutcome> {
        let n = jobs.len();
        let started = Instant::now();
        info!(
            phase = %BatchPhase::Received,
            jobs = n,
            max_batch_size = self.config.max_batch_size(),
            %device,
            "batch received"
        );

        if let Err(e) = self.prover.resolve_device(device) {
            warn!(%device, error = %e, "device rejected; failing whole batch");
            return BatchOutcome::all_failed(n, &e);
        }

        let mut results = allocate_results(n)?;
        if n == 0 {
            info!(phase = %BatchPhase::Completed, jobs = 0, "empty batch");
            return Ok(BatchOutcome {
                results,
                first_error: None,
            });
        }

        let chunks = self.config.chunk_count(n);
        debug!(phase = %BatchPhase::Partitioned, chunks, "batch partitioned");

        let pool = self.pool(n)?;
        let first = FirstError::new();
        for (c, span) in partition(n, self.config.max_batch_size()).enumerate() {
            debug!(
                phase = %BatchPhase::Dispatched,
                chunk = c,
                lo = span.lo,
                hi = span.hi,
                "chunk dispatched"
            );
            let slots = &mut results[span.range()];
            let work = &jobs[span.range()];
            let first = &first;
            pool.install(|| {
                slots
                    .par_iter_mut()
                    .zip(work.par_iter())
                    .enumerate()
                    .for_each(|(offset, (slot, job))| {
                        *slot = self.run_job(span.lo + offset, job, device, first);
                    });
            });
        }

        debug!(phase = %BatchPhase::Collecting, "all chunks returned");
        let outcome = BatchOutcome {
            results,
            first_error: first.into_message(),
        };
        info!(
            phase = %BatchPhase::Completed,
            jobs = n,
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            elapsed_ms = started.elapsed().as_millis(),
            "batch completed"
        );
        Ok(outcome)
    }

    fn run_job(&self, index: usize, job: &Job, device: DeviceType, first: &FirstError) -> JobResult {
        let _span = debug_span!("job", index).entered();
        let outcome = match job {
            Ok(request) => self.prover.try_prove(request, device),
            Err(e) => {
                warn!(error = %e, "job input unresolved");
                Err(e.clone())
            }
        };
        match outcome {
            Ok(()) => JobResult::Success,
            Err(e) => {
                first.offer(index, &e);
                JobResult::Failure
            }
        }
    }
}

/// Run `jobs` against `backend` with the build's device policy.
pub fn run_batch<B: ProvingBackend + ?Sized>(
    backend: &B,
    jobs: &[Job],
    device: DeviceType,
    config: BatchConfig,
) -> BridgeResult<BatchOutcome> {
    Orchestrator::new(Prover::new(backend), config).run(jobs, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_as_failures() {
        let slots = allocate_results(4).unwrap();
        assert_eq!(slots, vec![JobResult::Failure; 4]);
    }

    #[test]
    fn absurd_allocation_is_reported() {
        let err = allocate_results(usize::MAX).unwrap_err();
        assert!(matches!(err, BridgeError::Allocation(_)), "{err}");
    }

    #[test]
    fn outcome_counts() {
        let o = BatchOutcome {
            results: vec![JobResult::Success, JobResult::Failure, JobResult::Success],
            first_error: Some("proof 1: x".into()),
        };
        assert_eq!((o.len(), o.succeeded(), o.failed()), (3, 2, 1));
        assert_eq!(o.first_error(), Some("proof 1: x"));
    }

    #[test]
    fn phases_render_lowercase() {
        assert_eq!(BatchPhase::Dispatched.to_string(), "dispatched");
    }
}
