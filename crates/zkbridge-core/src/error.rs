use std::any::Any;
use thiserror::Error;

/// Every failure the bridge can report.
///
/// The first three variants are recovered per job and surface as
/// [`crate::JobResult::Failure`] plus a message. `Allocation` is fatal to a
/// batch call. `ContractViolation` is a caller bug (for example a double free)
/// and is rejected rather than acted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A path or handle from the caller was missing or unusable.
    #[error("invalid input: {0}")]
    InputResolution(String),

    /// The requested device is unknown or not served by this build/backend.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    /// The prover/verifier library failed; its message is forwarded verbatim.
    #[error("{0}")]
    Prover(String),

    /// Result storage could not be allocated.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// The caller broke a lifetime or size contract.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

/// Convenience alias.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Wrap a backend error, keeping its whole context chain.
    #[must_use]
    pub fn prover(err: &anyhow::Error) -> Self {
        Self::Prover(format!("{err:#}"))
    }

    /// Wrap a caught panic payload.
    #[must_use]
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        Self::Prover(format!("prover panicked: {}", panic_message(payload)))
    }
}

/// Best-effort text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
