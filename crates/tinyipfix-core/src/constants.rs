//! Protocol constants for IPFIX (RFC 5101) and the TinyIPFIX header compression.

// Canonical IPFIX framing
pub const IPFIX_VERSION: u16 = 0x000A;
pub const MESSAGE_HEADER_SIZE: usize = 16;
pub const SET_HEADER_SIZE: usize = 4;
/// Message header plus the header of the first set.
pub const CANONICAL_PREFIX_SIZE: usize = MESSAGE_HEADER_SIZE + SET_HEADER_SIZE;

// Set identifiers
pub const TEMPLATE_SET_ID: u16 = 2;
/// Data sets carry their template id as set id; everything below is reserved.
pub const MIN_DATA_SET_ID: u16 = 256;

/// Field ids above this value carry a trailing 32-bit enterprise number.
pub const ENTERPRISE_BIT_THRESHOLD: u16 = 0x8000;

/// A template sequence number equal to this value has never been checked.
pub const SEQUENCE_UNSET: u32 = u32::MAX;

/// Smallest template message: header, set header and one template record header.
pub const MIN_TEMPLATE_MESSAGE_SIZE: usize = 24;

/// Characters of the human-readable decode log kept per call.
pub const MAX_LOG_SIZE: usize = 4096;

// TinyIPFIX header layout
pub const TINY_LENGTH_HIGH_MASK: u8 = 0x03;
pub const TINY_SET_LOOKUP_MASK: u8 = 0x3F;
/// A compressed frame of this length can carry a first short that reads as `IPFIX_VERSION`.
pub const TINY_AMBIGUOUS_FRAME_LENGTH: usize = 10;
/// Longest frame whose length the compressed header can express.
pub const TINY_MAX_FRAME_LENGTH: usize = 255;

// Set lookup codes carried in bits 5..2 of the first compressed header byte
pub const SET_LOOKUP_INLINE_HIGH: u8 = 0x00;
pub const SET_LOOKUP_TEMPLATE: u8 = 0x01;
pub const SET_LOOKUP_FIRST_DATA_SET: u8 = 0x02;
pub const SET_LOOKUP_INLINE_LOW: u8 = 0x0F;

/// Address hextet that carries the compact node identifier.
pub const NODE_ID_HEXTET: usize = 3;

/// TinyIPFIX header variant selected by the two high bits of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TinyFlags {
    /// 8-bit sequence number, no extended set id.
    Compact = 0,
    /// 16-bit sequence number.
    ExtendedSequence = 1,
    /// Extended set id byte present.
    ExtendedSetId = 2,
    /// Both extensions present.
    Extended = 3,
}

impl TinyFlags {
    /// Decode the two flag bits (`byte0 >> 6`).
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => TinyFlags::Compact,
            1 => TinyFlags::ExtendedSequence,
            2 => TinyFlags::ExtendedSetId,
            _ => TinyFlags::Extended,
        }
    }

    /// Size of the compressed header in bytes.
    pub fn header_size(self) -> usize {
        match self {
            TinyFlags::Compact => 3,
            TinyFlags::ExtendedSequence | TinyFlags::ExtendedSetId => 4,
            TinyFlags::Extended => 5,
        }
    }

    pub fn has_extended_sequence(self) -> bool {
        matches!(self, TinyFlags::ExtendedSequence | TinyFlags::Extended)
    }

    pub fn has_extended_set_id(self) -> bool {
        matches!(self, TinyFlags::ExtendedSetId | TinyFlags::Extended)
    }
}
