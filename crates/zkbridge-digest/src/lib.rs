//! zkbridge reference backend.
//!
//! [`DigestProver`] stands in for the external proving library so the bridge
//! can be driven end-to-end without a curve/pairing stack. It reads real
//! circom containers (`.wtns`, `.zkey`), checks their framing, and emits
//! JSON files shaped like the ones snarkjs-compatible provers write:
//!
//! - `proof.json`: `{ protocol, curve, commitment }`
//! - `public.json`: `{ witness_digest }`
//! - `vk.json`: `{ protocol, key_digest }` (via [`DigestProver::export_vk`])
//!
//! The commitment binds the proving key and the witness through a Blake3
//! transcript; verification recomputes it from the vk and public file.
//! ⚠️ This is plumbing, **not** a zero-knowledge proof: the public file
//! reveals a digest of the witness.

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

pub mod container;
mod transcript;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use zkbridge_core::io::{read_json, write_json_pretty};
use zkbridge_core::{DeviceType, ProofRequest, ProvingBackend};

pub use container::{encode as encode_container, ContainerKind};
pub use transcript::Transcript;

/// Protocol tag written into every output file.
pub const PROTOCOL: &str = "zkbridge-digest-v1";
/// Curve tag; the reference prover uses none.
pub const CURVE: &str = "none";

const DOMAIN: &str = "zkbridge.digest.v1";

/// `proof.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    /// Always [`PROTOCOL`].
    pub protocol: String,
    /// Always [`CURVE`].
    pub curve: String,
    /// Hex transcript commitment over key and witness digests.
    pub commitment: String,
}

/// `public.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicFile {
    /// Hex Blake3 digest of the witness file.
    pub witness_digest: String,
}

/// `vk.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKeyFile {
    /// Always [`PROTOCOL`].
    pub protocol: String,
    /// Hex Blake3 digest of the proving key file.
    pub key_digest: String,
}

/// Reference prover/verifier (CPU only).
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProver;

fn commitment(key_digest: &[u8; 32], witness_digest: &[u8; 32]) -> [u8; 32] {
    let mut tr = Transcript::new(DOMAIN);
    tr.absorb("zkey", key_digest);
    tr.absorb("witness", witness_digest);
    tr.challenge("commitment")
}

fn decode_digest(hex_str: &str, what: &str) -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex_str, &mut out)
        .with_context(|| format!("{what} is not a 32-byte hex digest"))?;
    Ok(out)
}

fn key_digest(zkey: &Path) -> Result<[u8; 32]> {
    let bytes = container::read_checked(ContainerKind::ProvingKey, zkey)?;
    Ok(*blake3::hash(&bytes).as_bytes())
}

impl DigestProver {
    /// Derive `vk.json` from a proving key.
    pub fn export_vk(&self, zkey: &Path, vk_out: &Path) -> Result<()> {
        let digest = key_digest(zkey)?;
        let vk = VerificationKeyFile {
            protocol: PROTOCOL.to_string(),
            key_digest: hex::encode(digest),
        };
        write_json_pretty(vk_out, &vk)
    }
}

impl ProvingBackend for DigestProver {
    fn name(&self) -> &'static str {
        "digest"
    }

    fn prove(&self, request: &ProofRequest, device: DeviceType) -> Result<()> {
        ensure!(device == DeviceType::Cpu, "digest prover only runs on cpu, got {device}");

        let key = key_digest(request.zkey())?;
        let witness = container::read_checked(ContainerKind::Witness, request.witness())?;
        let witness = *blake3::hash(&witness).as_bytes();

        let proof = ProofFile {
            protocol: PROTOCOL.to_string(),
            curve: CURVE.to_string(),
            commitment: hex::encode(commitment(&key, &witness)),
        };
        let public = PublicFile {
            witness_digest: hex::encode(witness),
        };
        write_json_pretty(request.proof(), &proof)?;
        write_json_pretty(request.public(), &public)?;

        debug!(
            proof = %request.proof().display(),
            public = %request.public().display(),
            "digest proof written"
        );
        Ok(())
    }

    fn verify(&self, proof: &Path, public: &Path, vk: &Path) -> Result<bool> {
        let proof: ProofFile = read_json(proof)?;
        let public: PublicFile = read_json(public)?;
        let vk: VerificationKeyFile = read_json(vk)?;

        if proof.protocol != PROTOCOL || vk.protocol != PROTOCOL {
            return Ok(false);
        }
        let key = decode_digest(&vk.key_digest, "vk.key_digest")?;
        let witness = decode_digest(&public.witness_digest, "public.witness_digest")?;
        let claimed = decode_digest(&proof.commitment, "proof.commitment")?;
        Ok(commitment(&key, &witness) == claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_binds_both_inputs() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(commitment(&a, &b), commitment(&b, &a));
        assert_eq!(commitment(&a, &b), commitment(&a, &b));
    }

    #[test]
    fn only_cpu_is_supported() {
        assert!(DigestProver.supports(DeviceType::Cpu));
        assert!(!DigestProver.supports(DeviceType::Metal));
        assert!(!DigestProver.supports(DeviceType::CpuMetal));
    }

    #[test]
    fn bad_hex_is_an_error() {
        assert!(decode_digest("zz", "x").is_err());
        assert!(decode_digest(&"ab".repeat(31), "x").is_err());
        assert!(decode_digest(&"ab".repeat(32), "x").is_ok());
    }
}
