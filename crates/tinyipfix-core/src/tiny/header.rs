//! TinyIPFIX compressed header encoding and decoding.
//!
//! The compressed header replaces the 20-byte canonical prefix (message
//! header plus first set header) with 3 to 5 bytes:
//!
//! ```text
//! byte 0: FF SSSS LL   FF = flags, SSSS = set lookup, LL = length high bits
//! byte 1: length (the declared frame length is (byte0 & 0x03) + byte1)
//! then:   sequence number, 1 byte (flags 0, 2) or 2 bytes (flags 1, 3)
//! then:   extended set id byte (flags 2, 3)
//! ```

use crate::constants::{
    SET_LOOKUP_FIRST_DATA_SET, SET_LOOKUP_INLINE_HIGH, SET_LOOKUP_INLINE_LOW,
    SET_LOOKUP_TEMPLATE, TEMPLATE_SET_ID, TINY_LENGTH_HIGH_MASK, TINY_MAX_FRAME_LENGTH,
    TINY_SET_LOOKUP_MASK, TinyFlags,
};
use crate::cursor::ByteCursor;
use crate::error::{CursorError, DecodeError};

/// A parsed compressed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TinyHeader {
    pub flags: TinyFlags,
    pub set_lookup: u8,
    /// Declared total frame length, header included.
    pub length: usize,
    pub sequence: u16,
    pub extended_set_id: Option<u8>,
}

fn truncated(what: &str) -> impl FnOnce(CursorError) -> DecodeError + '_ {
    move |e| DecodeError::MalformedHeader {
        reason: format!("frame ends before the {what}"),
        source: Some(e),
    }
}

impl TinyHeader {
    /// Parse and validate the compressed header at the start of `frame`.
    pub fn parse(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut c = ByteCursor::new(frame);
        let byte0 = c.read_u8().map_err(truncated("length field"))?;
        let byte1 = c.read_u8().map_err(truncated("length field"))?;

        let length = usize::from(byte0 & TINY_LENGTH_HIGH_MASK) + usize::from(byte1);
        if length != frame.len() {
            return Err(DecodeError::malformed(format!(
                "declared length {length} does not match frame length {}",
                frame.len()
            )));
        }

        let flags = TinyFlags::from_bits(byte0 >> 6);
        let set_lookup = (byte0 & TINY_SET_LOOKUP_MASK) >> 2;

        if length < flags.header_size() {
            return Err(DecodeError::malformed(format!(
                "frame of {length} bytes is shorter than its {} byte header",
                flags.header_size()
            )));
        }

        let sequence = if flags.has_extended_sequence() {
            c.read_u16().map_err(truncated("sequence number"))?
        } else {
            u16::from(c.read_u8().map_err(truncated("sequence number"))?)
        };

        let extended_set_id = if flags.has_extended_set_id() {
            Some(c.read_u8().map_err(truncated("extended set id"))?)
        } else {
            None
        };

        Ok(TinyHeader {
            flags,
            set_lookup,
            length,
            sequence,
            extended_set_id,
        })
    }

    pub fn header_size(&self) -> usize {
        self.flags.header_size()
    }

    /// Bytes following the compressed header.
    pub fn payload_len(&self) -> usize {
        self.length - self.header_size()
    }

    /// Canonical sequence number: the transmitted bits padded with ones.
    pub fn sequence_number(&self) -> u32 {
        if self.flags.has_extended_sequence() {
            0xFFFF_0000 | u32::from(self.sequence)
        } else {
            0xFFFF_FF00 | u32::from(self.sequence & 0x00FF)
        }
    }

    /// Canonical set id selected by the set lookup code.
    pub fn set_id(&self) -> u16 {
        match (self.extended_set_id, self.set_lookup) {
            (Some(byte), SET_LOOKUP_INLINE_LOW) => u16::from(byte),
            (Some(byte), SET_LOOKUP_INLINE_HIGH) => u16::from(byte) << 8,
            (_, SET_LOOKUP_TEMPLATE) => TEMPLATE_SET_ID,
            (_, SET_LOOKUP_FIRST_DATA_SET) => 0x0100,
            _ => 0,
        }
    }
}

/// A compressed frame as a node would emit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TinyFrame {
    pub flags: TinyFlags,
    pub set_lookup: u8,
    pub sequence: u16,
    pub extended_set_id: u8,
    pub payload: Vec<u8>,
}

impl TinyFrame {
    /// A compact-header template set frame.
    pub fn template(sequence: u8, payload: Vec<u8>) -> Self {
        Self {
            flags: TinyFlags::Compact,
            set_lookup: SET_LOOKUP_TEMPLATE,
            sequence: u16::from(sequence),
            extended_set_id: 0,
            payload,
        }
    }

    /// A compact-header data set frame for template 256.
    pub fn data(sequence: u8, payload: Vec<u8>) -> Self {
        Self {
            flags: TinyFlags::Compact,
            set_lookup: SET_LOOKUP_FIRST_DATA_SET,
            sequence: u16::from(sequence),
            extended_set_id: 0,
            payload,
        }
    }

    pub fn with_flags(mut self, flags: TinyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_extended_set_id(mut self, set_lookup: u8, byte: u8) -> Self {
        self.set_lookup = set_lookup;
        self.extended_set_id = byte;
        self
    }

    pub fn with_sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    /// Serialize the frame, header first.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let length = self.flags.header_size() + self.payload.len();
        if length > TINY_MAX_FRAME_LENGTH {
            return Err(DecodeError::malformed(format!(
                "frame of {length} bytes exceeds the {TINY_MAX_FRAME_LENGTH} byte limit"
            )));
        }

        let mut out = Vec::with_capacity(length);
        out.push(((self.flags as u8) << 6) | ((self.set_lookup & 0x0F) << 2));
        out.push(length as u8);
        if self.flags.has_extended_sequence() {
            out.extend_from_slice(&self.sequence.to_be_bytes());
        } else {
            out.push(self.sequence as u8);
        }
        if self.flags.has_extended_set_id() {
            out.push(self.extended_set_id);
        }
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}
