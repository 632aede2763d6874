//! Blake3 transcript with a labelled absorb/squeeze API.
//!
//! ⚠️ Models a domain-separated random oracle for the reference prover only.
//! It is not a proof system.

use blake3::Hasher;

/// Fixed domain prefix to seed transcripts.
const TRANSCRIPT_PREFIX: &[u8] = b"zkbridge.transcript.v1";

/// Deterministic, domain-separated Blake3 transcript.
#[derive(Clone, Debug)]
pub struct Transcript {
    st: Hasher,
}

impl Transcript {
    /// Create a new transcript with a domain separation string.
    #[must_use]
    pub fn new(domain_sep: &str) -> Self {
        let mut st = Hasher::new();
        st.update(TRANSCRIPT_PREFIX);
        st.update(&(domain_sep.len() as u64).to_le_bytes());
        st.update(domain_sep.as_bytes());
        Self { st }
    }

    /// Add `bytes` under `label`; both are length-prefixed.
    pub fn absorb(&mut self, label: &str, bytes: &[u8]) {
        self.st.update(b"absorb");
        self.st.update(&(label.len() as u64).to_le_bytes());
        self.st.update(label.as_bytes());
        self.st.update(&(bytes.len() as u64).to_le_bytes());
        self.st.update(bytes);
    }

    /// Squeeze 32 bytes under `label` and advance the state.
    #[must_use]
    pub fn challenge(&mut self, label: &str) -> [u8; 32] {
        let mut st = self.st.clone();
        st.update(b"challenge");
        st.update(&(label.len() as u64).to_le_bytes());
        st.update(label.as_bytes());
        let out = *st.finalize().as_bytes();

        self.st.update(b"after_challenge");
        self.st.update(&out);
        out
    }
}
