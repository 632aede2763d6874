// crates/zkbridge-scheduler/src/lib.rs

//! Bounded batch orchestrator for zkbridge proof jobs.
//!
//! - Jobs are split into consecutive `[lo, hi)` chunks of at most
//!   `max_batch_size` entries ([`partition`]).
//! - Chunks run in order; jobs inside a chunk run concurrently on a rayon pool
//!   sized to the bound, so concurrency never exceeds it.
//! - Every job writes only its own result slot. A failing or panicking job
//!   never changes another job's result.
//! - Only the first failure's message is kept ([`FirstError`]).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc)]

mod batch;
mod first_error;
mod interval;

pub use batch::{allocate_results, run_batch, BatchOutcome, BatchPhase, Job, Orchestrator};
pub use first_error::FirstError;
pub use interval::{partition, Interval};
