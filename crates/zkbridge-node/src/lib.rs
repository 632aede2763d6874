//! `zkbridge-node`: Node.js (N-API) bindings.
//!
//! ## What this crate does
//! - By default it compiles as a plain Rust library exposing the functions the
//!   addon wraps, so the workspace builds without a Node toolchain.
//! - With the `node` feature it compiles an N-API addon exporting `prove`,
//!   `verify`, `parallelProve` and `version` to JavaScript.
//!
//! ```js
//! const zk = require('./zkbridge.node');
//! zk.prove('w.wtns', 'circuit.zkey', 'proof.json', 'public.json');
//! const codes = zk.parallelProve(ws, 'circuit.zkey', proofs, publics, 'cpu', 4);
//! ```
//!
//! Failures throw a JS `Error` with the bridge's message.

#![cfg_attr(not(feature = "node"), forbid(unsafe_code))]
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
use zkbridge_core::{BatchConfig, BridgeResult, DeviceType, ProofRequest, Prover};
use zkbridge_digest::DigestProver;
use zkbridge_scheduler::{run_batch, BatchOutcome, Job};

fn device_or_cpu(device: Option<&str>) -> BridgeResult<DeviceType> {
    device.map_or(Ok(DeviceType::Cpu), str::parse)
}

/// Prove one witness on `device` (default cpu).
pub fn prove_one(request: &ProofRequest, device: Option<&str>) -> BridgeResult<()> {
    Prover::new(&DigestProver).try_prove(request, device_or_cpu(device)?)
}

/// Verify one proof.
pub fn verify_one(proof: &Path, public: &Path, vk: &Path) -> BridgeResult<bool> {
    Prover::new(&DigestProver).try_verify(proof, public, vk)
}

/// Prove a batch sharing one key.
pub fn prove_batch(
    witnesses: &[PathBuf],
    zkey: &Path,
    proofs: &[PathBuf],
    publics: &[PathBuf],
    device: Option<&str>,
    max_batch_size: usize,
) -> BridgeResult<BatchOutcome> {
    let device = device_or_cpu(device)?;
    let jobs: Vec<Job> = ProofRequest::batch(witnesses, zkey, proofs, publics)?
        .into_iter()
        .map(Ok)
        .collect();
    run_batch(&DigestProver, &jobs, device, BatchConfig::new(max_batch_size))
}

#[cfg(feature = "node")]
mod node_api {
    use napi::bindgen_prelude::*;
    use napi_derive::napi;
    use std::path::PathBuf;
    use zkbridge_core::{BridgeError, ProofRequest};

    fn throw(e: &BridgeError) -> Error {
        Error::new(Status::GenericFailure, e.to_string())
    }

    fn paths(v: Vec<String>) -> Vec<PathBuf> {
        v.into_iter().map(PathBuf::from).collect()
    }

    /// Generate one proof. Throws on failure.
    #[napi]
    pub fn prove(
        witness: String,
        zkey: String,
        proof: String,
        public: String,
        device: Option<String>,
    ) -> Result<()> {
        let request = ProofRequest::new(witness, zkey, proof, public);
        super::prove_one(&request, device.as_deref()).map_err(|e| throw(&e))
    }

    /// Verify one proof; `false` on rejection.
    #[napi]
    pub fn verify(proof: String, public: String, vk: String) -> Result<bool> {
        super::verify_one(proof.as_ref(), public.as_ref(), vk.as_ref()).map_err(|e| throw(&e))
    }

    /// Prove many witnesses against one key; returns one code per witness.
    #[napi(js_name = "parallelProve")]
    pub fn parallel_prove(
        witnesses: Vec<String>,
        zkey: String,
        proofs: Vec<String>,
        publics: Vec<String>,
        device: Option<String>,
        max_batch_size: Option<u32>,
    ) -> Result<Vec<i64>> {
        let max = max_batch_size.map_or(0, |m| m as usize);
        let outcome = super::prove_batch(
            &paths(witnesses),
            zkey.as_ref(),
            &paths(proofs),
            &paths(publics),
            device.as_deref(),
            max,
        )
        .map_err(|e| throw(&e))?;
        Ok(outcome.results().iter().map(|r| r.code()).collect())
    }

    /// Return the crate version as a JavaScript string.
    #[napi]
    pub fn version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

#[cfg(feature = "node")]
pub use node_api::{parallel_prove, prove, verify, version};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use zkbridge_digest::{encode_container, ContainerKind};

    #[test]
    fn default_device_is_cpu() {
        assert_eq!(device_or_cpu(None), Ok(DeviceType::Cpu));
        assert_eq!(device_or_cpu(Some("cpu-metal")), Ok(DeviceType::CpuMetal));
        assert!(device_or_cpu(Some("tpu")).is_err());
    }

    #[test]
    fn batch_reports_first_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let zkey = root.join("c.zkey");
        fs::write(&zkey, encode_container(ContainerKind::ProvingKey, &[(1, &b"k"[..])])).unwrap();
        let ws: Vec<PathBuf> = (0..3).map(|i| root.join(format!("missing{i}.wtns"))).collect();
        let proofs: Vec<PathBuf> = (0..3).map(|i| root.join(format!("p{i}.json"))).collect();
        let publics: Vec<PathBuf> = (0..3).map(|i| root.join(format!("q{i}.json"))).collect();

        let out = prove_batch(&ws, &zkey, &proofs, &publics, None, 2).unwrap();
        assert_eq!(out.failed(), 3);
        assert!(out.first_error().unwrap().contains("missing"));
    }
}
