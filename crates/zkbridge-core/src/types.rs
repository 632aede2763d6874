//! Request and result types that cross the bridge.
//!
//! All integer representations here are part of the C ABI: result codes are
//! `0 = success, 1 = failure`, and device values are `Cpu = 0, Metal = 1,
//! CpuMetal = 2`. Changing any of them is an ABI break.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Batch size used when the caller passes `0`.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// One proof job: where to read the witness and proving key, and where to
/// write the proof and public inputs.
///
/// Immutable after construction; the bridge never keeps it beyond a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    witness: PathBuf,
    zkey: PathBuf,
    proof: PathBuf,
    public: PathBuf,
}

impl ProofRequest {
    /// Build a request from its four paths.
    #[must_use]
    pub fn new(
        witness: impl Into<PathBuf>,
        zkey: impl Into<PathBuf>,
        proof: impl Into<PathBuf>,
        public: impl Into<PathBuf>,
    ) -> Self {
        Self {
            witness: witness.into(),
            zkey: zkey.into(),
            proof: proof.into(),
            public: public.into(),
        }
    }

    /// Build one request per witness, all sharing `zkey`.
    ///
    /// The three per-job lists must have equal length.
    pub fn batch<P: AsRef<Path>>(
        witnesses: &[P],
        zkey: &Path,
        proofs: &[P],
        publics: &[P],
    ) -> BridgeResult<Vec<Self>> {
        if witnesses.len() != proofs.len() || witnesses.len() != publics.len() {
            return Err(BridgeError::InputResolution(format!(
                "path lists differ in length: {} witnesses, {} proofs, {} publics",
                witnesses.len(),
                proofs.len(),
                publics.len()
            )));
        }
        Ok(witnesses
            .iter()
            .zip(proofs)
            .zip(publics)
            .map(|((w, p), q)| Self::new(w.as_ref(), zkey, p.as_ref(), q.as_ref()))
            .collect())
    }

    /// Witness file (input).
    #[must_use]
    pub fn witness(&self) -> &Path {
        &self.witness
    }

    /// Proving key file (input, shared read-only across a batch).
    #[must_use]
    pub fn zkey(&self) -> &Path {
        &self.zkey
    }

    /// Proof file (output).
    #[must_use]
    pub fn proof(&self) -> &Path {
        &self.proof
    }

    /// Public inputs file (output).
    #[must_use]
    pub fn public(&self) -> &Path {
        &self.public
    }
}

/// Outcome of one job as seen by the caller.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobResult {
    /// The job completed and its outputs were written.
    Success = 0,
    /// The job failed; see the error channel for a best-effort message.
    Failure = 1,
}

impl JobResult {
    /// Integer code placed in result arrays.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Whether this is [`JobResult::Success`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Compute device requested by the caller.
///
/// The set is closed. Values outside it, and values this build cannot
/// serve, are rejected by [`crate::DevicePolicy`] rather than coerced.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Plain CPU proving. Always available.
    Cpu = 0,
    /// GPU proving through Metal.
    Metal = 1,
    /// Hybrid CPU + Metal proving.
    CpuMetal = 2,
}

impl DeviceType {
    /// Every device value, in ABI order.
    pub const ALL: [Self; 3] = [Self::Cpu, Self::Metal, Self::CpuMetal];

    /// ABI integer for this device.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Whether the device needs an accelerator backend.
    #[inline]
    #[must_use]
    pub const fn is_accelerated(self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Stable lowercase name (`cpu`, `metal`, `cpu-metal`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Metal => "metal",
            Self::CpuMetal => "cpu-metal",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for DeviceType {
    type Error = BridgeError;

    fn try_from(raw: i64) -> BridgeResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| i64::from(d.raw()) == raw)
            .ok_or_else(|| {
                BridgeError::UnsupportedDevice(format!(
                    "unknown device type {raw} (expected 0=cpu, 1=metal, 2=cpu-metal)"
                ))
            })
    }
}

impl FromStr for DeviceType {
    type Err = BridgeError;

    fn from_str(s: &str) -> BridgeResult<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.name() == lower || (lower == "cpu_metal" && *d == Self::CpuMetal))
            .ok_or_else(|| BridgeError::UnsupportedDevice(format!("unknown device name `{s}`")))
    }
}

/// Concurrency limits for one batch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    max_batch_size: usize,
}

impl BatchConfig {
    /// Build from a caller-supplied size; `0` selects [`DEFAULT_MAX_BATCH_SIZE`].
    #[must_use]
    pub const fn new(max_batch_size: usize) -> Self {
        let max_batch_size = if max_batch_size == 0 {
            DEFAULT_MAX_BATCH_SIZE
        } else {
            max_batch_size
        };
        Self { max_batch_size }
    }

    /// Upper bound on jobs in flight at once. Always ≥ 1.
    #[inline]
    #[must_use]
    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of chunks `n` jobs are split into.
    #[inline]
    #[must_use]
    pub const fn chunk_count(&self, n: usize) -> usize {
        n.div_ceil(self.max_batch_size)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCH_SIZE)
    }
}
