//! Single-job facade over a [`ProvingBackend`].
//!
//! Goals:
//! - One backend call per job, with device selection checked first.
//! - Every failure (bad input, unsupported device, backend error, panic)
//!   comes back as a [`BridgeError`]; nothing unwinds out of here.
//! - The `*_one` variants collapse that into a [`JobResult`] and a bounded
//!   message, which is what the C ABI hands to callers.

use crate::{
    BridgeError, BridgeResult, DevicePolicy, DeviceType, ErrorSink, JobResult, ProofRequest,
    ProvingBackend,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Prove/verify façade bound to one backend and one device policy.
pub struct Prover<'b, B: ?Sized> {
    backend: &'b B,
    policy: DevicePolicy,
}

impl<B: ?Sized> Clone for Prover<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for Prover<'_, B> {}

impl<'b, B: ProvingBackend + ?Sized> Prover<'b, B> {
    /// Use `backend` with the devices compiled into this build.
    #[must_use]
    pub const fn new(backend: &'b B) -> Self {
        Self::with_policy(backend, DevicePolicy::for_build())
    }

    /// Use `backend` with an explicit device policy.
    #[must_use]
    pub const fn with_policy(backend: &'b B, policy: DevicePolicy) -> Self {
        Self { backend, policy }
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn backend(&self) -> &'b B {
        self.backend
    }

    /// The device policy in force.
    #[must_use]
    pub const fn policy(&self) -> DevicePolicy {
        self.policy
    }

    /// Check that `device` can be used for proving with this backend.
    pub fn resolve_device(&self, device: DeviceType) -> BridgeResult<DeviceType> {
        self.policy.resolve(device, self.backend)
    }

    /// Run the backend prover once.
    pub fn try_prove(&self, request: &ProofRequest, device: DeviceType) -> BridgeResult<()> {
        let device = self.resolve_device(device)?;
        let started = Instant::now();
        let backend = self.backend;
        let outcome = match catch_unwind(AssertUnwindSafe(|| backend.prove(request, device))) {
            Ok(r) => r.map_err(|e| BridgeError::prover(&e)),
            Err(payload) => Err(BridgeError::panicked(payload.as_ref())),
        };

        let elapsed_ms = started.elapsed().as_millis();
        match &outcome {
            Ok(()) => debug!(
                backend = backend.name(),
                %device,
                witness = %request.witness().display(),
                elapsed_ms,
                "proof generated"
            ),
            Err(e) => warn!(
                backend = backend.name(),
                %device,
                witness = %request.witness().display(),
                elapsed_ms,
                error = %e,
                "proof generation failed"
            ),
        }
        outcome
    }

    /// Prove once and report through `sink`.
    ///
    /// The sink is cleared first so a stale message is never misattributed.
    pub fn prove_one(
        &self,
        request: &ProofRequest,
        device: DeviceType,
        sink: &mut ErrorSink<'_>,
    ) -> JobResult {
        sink.clear();
        sink.settle(self.try_prove(request, device))
    }

    /// Run the backend verifier once. `Ok(false)` means the proof was rejected.
    pub fn try_verify(&self, proof: &Path, public: &Path, vk: &Path) -> BridgeResult<bool> {
        let backend = self.backend;
        let outcome = match catch_unwind(AssertUnwindSafe(|| backend.verify(proof, public, vk))) {
            Ok(r) => r.map_err(|e| BridgeError::prover(&e)),
            Err(payload) => Err(BridgeError::panicked(payload.as_ref())),
        };

        match &outcome {
            Ok(true) => debug!(backend = backend.name(), proof = %proof.display(), "proof verified"),
            Ok(false) => warn!(backend = backend.name(), proof = %proof.display(), "proof rejected"),
            Err(e) => warn!(
                backend = backend.name(),
                proof = %proof.display(),
                error = %e,
                "verification could not run"
            ),
        }
        outcome
    }

    /// Verify once. Rejections and errors are both [`JobResult::Failure`];
    /// there is no message channel for verification.
    pub fn verify_one(&self, proof: &Path, public: &Path, vk: &Path) -> JobResult {
        match self.try_verify(proof, public, vk) {
            Ok(true) => JobResult::Success,
            Ok(false) | Err(_) => JobResult::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Scripted {
        calls: AtomicUsize,
    }

    impl ProvingBackend for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn prove(&self, request: &ProofRequest, _device: DeviceType) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.witness().to_str() {
                Some("ok") => Ok(()),
                Some("panic") => panic!("witness exploded"),
                _ => bail!("cannot parse witness {}", request.witness().display()),
            }
        }

        fn verify(&self, proof: &Path, _public: &Path, _vk: &Path) -> anyhow::Result<bool> {
            match proof.to_str() {
                Some("good") => Ok(true),
                Some("bad") => Ok(false),
                _ => bail!("unreadable proof"),
            }
        }
    }

    fn req(w: &str) -> ProofRequest {
        ProofRequest::new(w, "k.zkey", "p.json", "q.json")
    }

    fn c_str(buf: &[u8]) -> &str {
        let end = buf.iter().position(|&b| b == 0).unwrap();
        std::str::from_utf8(&buf[..end]).unwrap()
    }

    #[test]
    fn success_leaves_cleared_buffer() {
        let backend = Scripted::default();
        let mut buf = *b"stale message\0\0\0";
        let mut sink = ErrorSink::new(&mut buf);
        let r = Prover::new(&backend).prove_one(&req("ok"), DeviceType::Cpu, &mut sink);
        assert_eq!(r, JobResult::Success);
        assert_eq!(c_str(&buf), "");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backend_error_is_forwarded() {
        let backend = Scripted::default();
        let mut buf = [0u8; 128];
        let mut sink = ErrorSink::new(&mut buf);
        let r = Prover::new(&backend).prove_one(&req("junk"), DeviceType::Cpu, &mut sink);
        assert_eq!(r, JobResult::Failure);
        assert_eq!(c_str(&buf), "cannot parse witness junk");
    }

    #[test]
    fn panic_is_contained() {
        let backend = Scripted::default();
        let err = Prover::new(&backend)
            .try_prove(&req("panic"), DeviceType::Cpu)
            .unwrap_err();
        assert!(err.to_string().contains("witness exploded"));
    }

    #[test]
    fn unsupported_device_never_reaches_backend() {
        let backend = Scripted::default();
        let mut buf = [0u8; 128];
        let mut sink = ErrorSink::new(&mut buf);
        let r = Prover::with_policy(&backend, DevicePolicy::cpu_only()).prove_one(
            &req("ok"),
            DeviceType::Metal,
            &mut sink,
        );
        assert_eq!(r, JobResult::Failure);
        assert!(!c_str(&buf).is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn verify_maps_to_codes() {
        let backend = Scripted::default();
        let p = Prover::new(&backend);
        let vk = Path::new("vk.json");
        let public = Path::new("public.json");
        assert_eq!(p.verify_one(Path::new("good"), public, vk), JobResult::Success);
        assert_eq!(p.verify_one(Path::new("bad"), public, vk), JobResult::Failure);
        assert_eq!(p.verify_one(Path::new("???"), public, vk), JobResult::Failure);
    }
}
