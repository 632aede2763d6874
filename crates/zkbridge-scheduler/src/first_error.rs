//! Shared single-message error slot for a batch.
//!
//! Many jobs may fail concurrently but the caller's buffer holds one message.
//! The first job to claim the flag writes it; later failures only lose the
//! race on one atomic and never format or store anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use zkbridge_core::BridgeError;

/// First-writer-wins error slot.
#[derive(Debug, Default)]
pub struct FirstError {
    claimed: AtomicBool,
    message: OnceLock<String>,
}

impl FirstError {
    /// An unclaimed slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the failure of job `index`. Returns whether it was recorded.
    pub fn offer(&self, index: usize, err: &BridgeError) -> bool {
        self.offer_with(|| format!("proof {index}: {err}"))
    }

    /// Offer a message built lazily, only if the slot is still free.
    pub fn offer_with<F: FnOnce() -> String>(&self, make: F) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.message.set(make()).is_ok()
    }

    /// Take the recorded message.
    #[must_use]
    pub fn into_message(self) -> Option<String> {
        self.message.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn first_offer_wins() {
        let slot = FirstError::new();
        assert!(slot.offer(4, &BridgeError::Prover("early".into())));
        assert!(!slot.offer(1, &BridgeError::Prover("late".into())));
        assert_eq!(slot.into_message().as_deref(), Some("proof 4: early"));
    }

    #[test]
    fn losers_do_not_build_messages() {
        let slot = FirstError::new();
        let built = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for i in 0..16 {
                let (slot, built) = (&slot, &built);
                s.spawn(move || {
                    slot.offer_with(|| {
                        built.fetch_add(1, Ordering::SeqCst);
                        format!("job {i}")
                    })
                });
            }
        });
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(slot.into_message().unwrap().starts_with("job "));
    }
}
