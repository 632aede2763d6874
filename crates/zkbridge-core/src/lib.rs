//! zkbridge-core: data model, error taxonomy, device policy, and the
//! single-job proving facade shared by every zkbridge frontend.
//!
//! This crate defines the **stable boundary** the other crates build on:
//! - canonical request/result types ([`ProofRequest`], [`JobResult`],
//!   [`DeviceType`], [`BatchConfig`]),
//! - the [`BridgeError`] taxonomy every failure is folded into,
//! - the [`ProvingBackend`] trait the external prover/verifier is reached through,
//! - the [`DevicePolicy`] deciding which devices a build may use, and
//! - the [`Prover`] facade plus the bounded [`ErrorSink`] it reports into.
//!
//! ```no_run
//! use std::path::Path;
//! use zkbridge_core::{DeviceType, ErrorSink, ProofRequest, Prover, ProvingBackend};
//! # struct Lib;
//! # impl ProvingBackend for Lib {
//! #   fn name(&self) -> &'static str { "lib" }
//! #   fn prove(&self, _r: &ProofRequest, _d: DeviceType) -> anyhow::Result<()> { Ok(()) }
//! #   fn verify(&self, _p: &Path, _q: &Path, _v: &Path) -> anyhow::Result<bool> { Ok(true) }
//! # }
//! let request = ProofRequest::new("w.wtns", "k.zkey", "proof.json", "public.json");
//! let mut buf = [0u8; 256];
//! let mut sink = ErrorSink::new(&mut buf);
//! let result = Prover::new(&Lib).prove_one(&request, DeviceType::Cpu, &mut sink);
//! assert!(result.is_success());
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Backend trait for the external prover/verifier.
pub mod backend;
/// File-based configuration with environment overrides.
pub mod config;
/// Device availability and selection rules.
pub mod device;
/// Error taxonomy for the bridge.
pub mod error;
/// JSON file helpers shared by backends and hosts.
pub mod io;
/// Single-job prove/verify facade.
pub mod prover;
/// Bounded, NUL-terminated error message sink.
pub mod sink;
/// Request/result data model.
pub mod types;

pub use backend::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use prover::*;
pub use sink::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use zkbridge_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        backend::ProvingBackend,
        device::DevicePolicy,
        error::{BridgeError, BridgeResult},
        prover::Prover,
        sink::ErrorSink,
        types::*,
    };
}
