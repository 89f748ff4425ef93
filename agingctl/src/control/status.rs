//! Fixed-size status messages
//!
//! Control callers hand in their own output buffer, so status text is
//! formatted into a bounded 64-byte array first and only ever copied out by
//! length. Text longer than 63 bytes is cut at a byte boundary and the
//! remainder of the array stays zero, like `snprintf` into `char[64]`.

use std::fmt::{self, Write as _};

use agingctl_common::STATUS_MSG_LEN;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    buf: [u8; STATUS_MSG_LEN],
    len: usize,
}

impl StatusMessage {
    /// Format into a fresh message, truncating to fit
    #[must_use]
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut msg = Self {
            buf: [0; STATUS_MSG_LEN],
            len: 0,
        };
        // Writer never fails; overflow is dropped.
        let _ = msg.write_fmt(args);
        msg
    }

    /// Message bytes without the zero padding
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Message text. Truncation may split a multi-byte character; the
    /// partial tail is dropped here.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) => s,
            Err(e) => {
                let valid = &self.buf[..e.valid_up_to()];
                std::str::from_utf8(valid).unwrap_or_default()
            }
        }
    }

    /// The whole zero-padded buffer, as handed across the control boundary
    #[must_use]
    pub fn raw(&self) -> &[u8; STATUS_MSG_LEN] {
        &self.buf
    }

    /// Copy into a caller buffer. Copies `min(out.len(), 64)` bytes of the
    /// padded buffer and returns that count.
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(STATUS_MSG_LEN);
        out[..n].copy_from_slice(&self.buf[..n]);
        n
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Write for StatusMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Last byte is reserved for the terminator.
        let room = STATUS_MSG_LEN - 1 - self.len;
        let n = s.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusMessage")
            .field(&self.as_str())
            .finish()
    }
}
