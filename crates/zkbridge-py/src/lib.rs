// crates/zkbridge-py/src/lib.rs

//! `zkbridge-py`: Python bindings (off by default).
//!
//! The plain-Rust functions below are what the module wraps; they build
//! without Python so the workspace and its tests need no interpreter. Enable
//! the `python` feature to compile the `zkbridge` extension module:
//!
//! ```python
//! import zkbridge
//! zkbridge.prove("w.wtns", "circuit.zkey", "proof.json", "public.json")
//! codes = zkbridge.parallel_prove(ws, "circuit.zkey", proofs, publics, max_batch_size=4)
//! ok = zkbridge.verify("proof.json", "public.json", "vk.json")
//! ```
//!
//! Failures raise `RuntimeError` carrying the bridge's message. The GIL is
//! released while proofs run.

#![cfg_attr(not(feature = "python"), forbid(unsafe_code))]
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

use std::path::{Path, PathBuf};
use zkbridge_core::{BatchConfig, BridgeResult, DeviceType, JobResult, ProofRequest, Prover};
use zkbridge_digest::DigestProver;
use zkbridge_scheduler::{run_batch, Job};

/// Prove one witness. `device` is a name such as `"cpu"`.
pub fn prove_files(request: &ProofRequest, device: &str) -> BridgeResult<()> {
    let device: DeviceType = device.parse()?;
    Prover::new(&DigestProver).try_prove(request, device)
}

/// Verify one proof. `Ok(false)` is a rejection.
pub fn verify_files(proof: &Path, public: &Path, vk: &Path) -> BridgeResult<bool> {
    Prover::new(&DigestProver).try_verify(proof, public, vk)
}

/// Prove a batch and return one code per witness (0 success, 1 failure).
///
/// Only setup problems are errors; the first job failure is logged.
pub fn prove_many(
    witnesses: &[PathBuf],
    zkey: &Path,
    proofs: &[PathBuf],
    publics: &[PathBuf],
    device: &str,
    max_batch_size: usize,
) -> BridgeResult<Vec<i64>> {
    let device: DeviceType = device.parse()?;
    let jobs: Vec<Job> = ProofRequest::batch(witnesses, zkey, proofs, publics)?
        .into_iter()
        .map(Ok)
        .collect();
    let outcome = run_batch(&DigestProver, &jobs, device, BatchConfig::new(max_batch_size))?;
    if let Some(msg) = outcome.first_error() {
        tracing::warn!(failed = outcome.failed(), first = msg, "batch had failures");
    }
    Ok(outcome.into_results().into_iter().map(JobResult::code).collect())
}

#[cfg(feature = "python")]
mod py {
    use pyo3::exceptions::PyRuntimeError;
    use pyo3::prelude::*;
    use std::path::PathBuf;
    use zkbridge_core::{BridgeError, ProofRequest};

    fn raise(e: BridgeError) -> PyErr {
        PyRuntimeError::new_err(e.to_string())
    }

    /// Generate one proof; raises `RuntimeError` on failure.
    #[pyfunction]
    #[pyo3(signature = (witness, zkey, proof, public, device = "cpu".to_string()))]
    fn prove(
        py: Python<'_>,
        witness: PathBuf,
        zkey: PathBuf,
        proof: PathBuf,
        public: PathBuf,
        device: String,
    ) -> PyResult<()> {
        let request = ProofRequest::new(witness, zkey, proof, public);
        py.allow_threads(|| super::prove_files(&request, &device))
            .map_err(raise)
    }

    /// Verify one proof; `False` on rejection, raises if it cannot run.
    #[pyfunction]
    fn verify(py: Python<'_>, proof: PathBuf, public: PathBuf, vk: PathBuf) -> PyResult<bool> {
        py.allow_threads(|| super::verify_files(&proof, &public, &vk))
            .map_err(raise)
    }

    /// Prove many witnesses against one key; returns a list of codes.
    #[pyfunction]
    #[pyo3(signature = (witnesses, zkey, proofs, publics, device = "cpu".to_string(), max_batch_size = 0))]
    fn parallel_prove(
        py: Python<'_>,
        witnesses: Vec<PathBuf>,
        zkey: PathBuf,
        proofs: Vec<PathBuf>,
        publics: Vec<PathBuf>,
        device: String,
        max_batch_size: usize,
    ) -> PyResult<Vec<i64>> {
        py.allow_threads(|| {
            super::prove_many(&witnesses, &zkey, &proofs, &publics, &device, max_batch_size)
        })
        .map_err(raise)
    }

    /// Return the crate version as a Python string.
    #[pyfunction]
    fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Python module `zkbridge`.
    #[pymodule]
    fn zkbridge(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(prove, m)?)?;
        m.add_function(wrap_pyfunction!(verify, m)?)?;
        m.add_function(wrap_pyfunction!(parallel_prove, m)?)?;
        m.add_function(wrap_pyfunction!(version, m)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use zkbridge_digest::{encode_container, ContainerKind};

    #[test]
    fn batch_codes_and_single_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let zkey = root.join("c.zkey");
        fs::write(&zkey, encode_container(ContainerKind::ProvingKey, &[(1, &b"k"[..])])).unwrap();
        let good = root.join("good.wtns");
        fs::write(&good, encode_container(ContainerKind::Witness, &[(2, &b"v"[..])])).unwrap();
        let bad = root.join("bad.wtns");
        fs::write(&bad, b"??").unwrap();

        let ws = vec![good.clone(), bad];
        let proofs = vec![root.join("p0.json"), root.join("p1.json")];
        let publics = vec![root.join("q0.json"), root.join("q1.json")];
        let codes = prove_many(&ws, &zkey, &proofs, &publics, "cpu", 0).unwrap();
        assert_eq!(codes, vec![0, 1]);

        let vk = root.join("vk.json");
        DigestProver.export_vk(&zkey, &vk).unwrap();
        assert!(verify_files(&proofs[0], &publics[0], &vk).unwrap());

        let single = ProofRequest::new(&good, &zkey, root.join("p.json"), root.join("q.json"));
        prove_files(&single, "cpu").unwrap();
        assert!(prove_files(&single, "gpu").is_err());
    }

    #[test]
    fn mismatched_lists_are_rejected() {
        let err = prove_many(
            &[PathBuf::from("a")],
            Path::new("k"),
            &[],
            &[],
            "cpu",
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("differ"), "{err}");
    }
}
