//! Bounded error-message sink.
//!
//! Callers that cannot receive exceptions hand the bridge a fixed byte buffer.
//! [`ErrorSink`] is the only thing that writes into it, and it enforces the
//! contract: at most `capacity - 1` message bytes followed by a NUL, and no
//! access at all when the buffer is absent or has capacity 0.

use crate::{BridgeResult, JobResult};

/// Write side of a caller-provided message buffer.
#[derive(Debug, Default)]
pub struct ErrorSink<'a> {
    buf: Option<&'a mut [u8]>,
}

impl<'a> ErrorSink<'a> {
    /// Wrap a buffer. An empty slice means "no reporting requested".
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        if buf.is_empty() {
            Self { buf: None }
        } else {
            Self { buf: Some(buf) }
        }
    }

    /// A sink that discards everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { buf: None }
    }

    /// Whether writes reach a buffer.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.buf.is_some()
    }

    /// Declared capacity in bytes, terminator included.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.as_ref().map_or(0, |b| b.len())
    }

    /// Make the buffer read as an empty string.
    pub fn clear(&mut self) {
        if let Some(buf) = self.buf.as_deref_mut() {
            buf[0] = 0;
        }
    }

    /// Write `msg`, truncated on a UTF-8 boundary to fit, then a NUL.
    ///
    /// Returns the number of message bytes written.
    pub fn write(&mut self, msg: &str) -> usize {
        let Some(buf) = self.buf.as_deref_mut() else {
            return 0;
        };
        let text = truncate_utf8(msg, buf.len() - 1);
        let n = text.len();
        buf[..n].copy_from_slice(text.as_bytes());
        buf[n] = 0;
        n
    }

    /// Turn an outcome into a result code, writing the message on failure.
    pub fn settle(&mut self, outcome: BridgeResult<()>) -> JobResult {
        match outcome {
            Ok(()) => JobResult::Success,
            Err(e) => {
                self.write(&e.to_string());
                JobResult::Failure
            }
        }
    }
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
#[must_use]
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
