//! Bounds-checked big-endian reader over an immutable byte buffer.
//!
//! Every read either consumes exactly the requested bytes or fails with
//! [`CursorError::TruncatedInput`] and leaves the position untouched.

use crate::error::CursorError;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    mark: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            mark: 0,
        }
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the read offset and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Remember the current position for a later [`reset`](Self::reset).
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Return to the last marked position (the start if never marked).
    pub fn reset(&mut self) {
        self.pos = self.mark;
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian unsigned 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        self.take(n)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), CursorError> {
        self.take(n).map(|_| ())
    }

    /// Borrow everything after the read offset without consuming it.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        if n > self.remaining() {
            return Err(CursorError::TruncatedInput {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}
