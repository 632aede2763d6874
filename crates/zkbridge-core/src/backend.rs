//! Backend abstraction for the external prover/verifier.
//!
//! Implementors wrap whatever library actually computes proofs. The bridge
//! only hands them paths: the backend opens the witness and proving key
//! itself and writes the proof and public inputs where the request says.
//!
//! ## Contracts implementors should uphold
//! - `prove` must either write both outputs or return `Err`.
//! - `prove` is called concurrently from several worker threads within one
//!   batch, all sharing the same proving key path. It must not write to the
//!   key, and it must not rely on per-call global state.
//! - `verify` returns `Ok(false)` for a well-formed but invalid proof and
//!   `Err` when inputs cannot be read or parsed. The bridge reports both as a
//!   failure; the distinction is only for logs.
//! - Neither function should panic for malformed inputs. A panic is still
//!   contained to its own job.

use crate::{DeviceType, ProofRequest};
use anyhow::Result;
use std::path::Path;

/// Minimal prover/verifier API the bridge depends on.
pub trait ProvingBackend: Send + Sync {
    /// Short identifier used in logs and messages.
    fn name(&self) -> &'static str;

    /// Whether this backend can run on `device`.
    fn supports(&self, device: DeviceType) -> bool {
        device == DeviceType::Cpu
    }

    /// Produce the proof and public inputs for one request.
    ///
    /// `device` has already passed the [`crate::DevicePolicy`] check.
    fn prove(&self, request: &ProofRequest, device: DeviceType) -> Result<()>;

    /// Check a proof against its public inputs and a verification key.
    fn verify(&self, proof: &Path, public: &Path, vk: &Path) -> Result<bool>;
}

impl<B: ProvingBackend + ?Sized> ProvingBackend for &B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn supports(&self, device: DeviceType) -> bool {
        (**self).supports(device)
    }

    fn prove(&self, request: &ProofRequest, device: DeviceType) -> Result<()> {
        (**self).prove(request, device)
    }

    fn verify(&self, proof: &Path, public: &Path, vk: &Path) -> Result<bool> {
        (**self).verify(proof, public, vk)
    }
}
