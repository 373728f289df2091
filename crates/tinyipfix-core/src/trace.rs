//! Bounded human-readable trace of the last decode call.
//!
//! Each pipeline stage owns one log, clears it at the start of a top-level
//! call, and keeps only the trailing `capacity` characters so a long burst
//! of sets cannot grow it without bound.

use core::fmt::{self, Write as _};

use crate::constants::MAX_LOG_SIZE;

#[derive(Debug, Clone)]
pub struct DecodeLog {
    buf: String,
    chars: usize,
    capacity: usize,
}

impl DecodeLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::new(),
            chars: 0,
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.chars = 0;
    }

    /// Append one formatted line and drop the oldest text beyond the capacity.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        let start = self.buf.len();
        // Writing into a String cannot fail.
        let _ = self.buf.write_fmt(args);
        self.buf.push('\n');
        self.chars += self.buf[start..].chars().count();
        self.truncate_front();
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars
    }

    fn truncate_front(&mut self) {
        if self.chars <= self.capacity {
            return;
        }
        let excess = self.chars - self.capacity;
        let cut = self
            .buf
            .char_indices()
            .nth(excess)
            .map_or(self.buf.len(), |(i, _)| i);
        self.buf.drain(..cut);
        self.chars = self.capacity;
    }
}

impl Default for DecodeLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DecodeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}
