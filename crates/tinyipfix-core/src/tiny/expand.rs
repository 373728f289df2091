//! Compressed frame detection and expansion to canonical IPFIX.

use std::borrow::Cow;
use std::net::Ipv6Addr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{
    CANONICAL_PREFIX_SIZE, IPFIX_VERSION, MESSAGE_HEADER_SIZE, NODE_ID_HEXTET,
    TINY_AMBIGUOUS_FRAME_LENGTH,
};
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::wire::{MessageHeader, SetHeader};

use super::header::TinyHeader;

/// Turns whatever arrives on the wire into a canonical IPFIX message.
pub trait HeaderNormalizer {
    /// Normalize `frame`, received from `source`, to a canonical message.
    fn normalize<'a>(&self, frame: &'a [u8], source: Ipv6Addr) -> Result<Cow<'a, [u8]>, DecodeError>;
}

/// Passes every frame through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalOnly;

impl HeaderNormalizer for CanonicalOnly {
    fn normalize<'a>(&self, frame: &'a [u8], _source: Ipv6Addr) -> Result<Cow<'a, [u8]>, DecodeError> {
        Ok(Cow::Borrowed(frame))
    }
}

/// Whether `frame` carries a compressed header.
///
/// A frame starting with the IPFIX version word is canonical, except a
/// 10-byte frame, which is too short to be canonical and is treated as
/// compressed even when its first word happens to be 0x000A.
pub fn is_compressed(frame: &[u8]) -> bool {
    let mut c = ByteCursor::new(frame);
    match c.read_u16() {
        Ok(word) => word != IPFIX_VERSION || frame.len() == TINY_AMBIGUOUS_FRAME_LENGTH,
        Err(_) => false,
    }
}

/// Node id derived from a source address: its fourth 16-bit group.
pub fn node_id_from_address(source: Ipv6Addr) -> u16 {
    source.segments()[NODE_ID_HEXTET]
}

/// Expand a compressed frame into a canonical message stamped with `export_time`.
///
/// The output is `CANONICAL_PREFIX_SIZE + payload` bytes: a message header
/// whose observation domain is the node id taken from `source`, then a set
/// header with the set id chosen by the lookup code, then the payload copied
/// verbatim.
pub fn expand(frame: &[u8], source: Ipv6Addr, export_time: u32) -> Result<Vec<u8>, DecodeError> {
    let header = TinyHeader::parse(frame)?;
    let payload_len = header.payload_len();
    let total = CANONICAL_PREFIX_SIZE + payload_len;

    let mut out = Vec::with_capacity(total);
    MessageHeader {
        version: IPFIX_VERSION,
        length: total as u16,
        export_time,
        sequence_number: header.sequence_number(),
        observation_domain_id: u32::from(node_id_from_address(source)),
    }
    .write(&mut out);
    SetHeader {
        set_id: header.set_id(),
        length: (total - MESSAGE_HEADER_SIZE) as u16,
    }
    .write(&mut out);
    out.extend_from_slice(&frame[frame.len() - payload_len..]);

    tracing::trace!(
        source = %source,
        flags = ?header.flags,
        set_id = header.set_id(),
        canonical = %hex::encode(&out),
        "expanded compressed frame"
    );
    Ok(out)
}

/// Expands compressed frames and passes canonical ones through.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinyHeaderExpander {
    export_time: Option<u32>,
}

impl TinyHeaderExpander {
    /// Stamp expanded messages with the wall-clock time.
    pub fn new() -> Self {
        Self { export_time: None }
    }

    /// Stamp expanded messages with a fixed export time.
    pub fn with_export_time(export_time: u32) -> Self {
        Self {
            export_time: Some(export_time),
        }
    }

    pub fn expand(&self, frame: &[u8], source: Ipv6Addr) -> Result<Vec<u8>, DecodeError> {
        expand(frame, source, self.export_time())
    }

    fn export_time(&self) -> u32 {
        self.export_time.unwrap_or_else(wall_clock_seconds)
    }
}

impl HeaderNormalizer for TinyHeaderExpander {
    fn normalize<'a>(&self, frame: &'a [u8], source: Ipv6Addr) -> Result<Cow<'a, [u8]>, DecodeError> {
        if is_compressed(frame) {
            self.expand(frame, source).map(Cow::Owned)
        } else {
            Ok(Cow::Borrowed(frame))
        }
    }
}

fn wall_clock_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u16) -> Ipv6Addr {
        Ipv6Addr::new(0xaaaa, 0, 0, id, 0x0212, 0x7401, 0x0001, 0x0101)
    }

    #[test]
    fn test_detection() {
        assert!(!is_compressed(&[]));
        assert!(!is_compressed(&[0x00]));
        assert!(is_compressed(&[0x00, 0x0B, 0x01]));
        assert!(!is_compressed(&[0x00, 0x0A, 0x00, 0x14, 0, 0, 0, 0, 0, 0, 0, 0]));
        // Ten bytes starting with the version word are still compressed.
        let mut ten = [0u8; 10];
        ten[1] = 0x0A;
        assert!(is_compressed(&ten));
    }

    #[test]
    fn test_node_id_from_address() {
        assert_eq!(node_id_from_address(node(0x1c)), 0x1c);
        let addr: Ipv6Addr = "fe80::1:2:3:4:5".parse().unwrap();
        assert_eq!(node_id_from_address(addr), 0x0001);
    }

    #[test]
    fn test_expand_compact_frame() {
        let frame = [0x00, 0x0B, 0x01, 1, 2, 3, 4, 5, 6, 7, 8];
        let out = expand(&frame, node(7), 0x1234_5678).unwrap();

        assert_eq!(out.len(), 28);
        assert_eq!(&out[0..2], &[0x00, 0x0A]);
        assert_eq!(&out[2..4], &[0x00, 0x1C]);
        assert_eq!(&out[4..8], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&out[8..12], &[0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(&out[12..16], &[0x00, 0x00, 0x00, 0x07]);
        assert_eq!(&out[16..18], &[0x00, 0x00]);
        assert_eq!(&out[18..20], &[0x00, 0x0C]);
        assert_eq!(&out[20..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_expand_extended_frame() {
        // flags 3, lookup 0x0F: two sequence bytes and an inline set id
        let frame = [0xFC, 0x07, 0xAB, 0xCD, 0x05, 0x11, 0x22];
        let out = expand(&frame, node(0x9F1C), 0).unwrap();
        assert_eq!(out.len(), 22);
        assert_eq!(&out[8..12], &[0xFF, 0xFF, 0xAB, 0xCD]);
        assert_eq!(&out[14..16], &[0x9F, 0x1C]);
        assert_eq!(&out[16..18], &[0x00, 0x05]);
        assert_eq!(&out[18..20], &[0x00, 0x06]);
        assert_eq!(&out[20..], &[0x11, 0x22]);
    }

    #[test]
    fn test_expand_rejects_bad_length() {
        let frame = [0x00, 0x20, 0x01, 0x02];
        assert!(matches!(
            expand(&frame, node(1), 0),
            Err(DecodeError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_normalizers() {
        let canonical = [0x00, 0x0A, 0x00, 0x14, 0, 0, 0, 0, 0, 0, 0, 0];
        let expander = TinyHeaderExpander::with_export_time(1);
        assert!(matches!(
            expander.normalize(&canonical, node(1)).unwrap(),
            Cow::Borrowed(_)
        ));

        let frame = [0x04, 0x03, 0xFF];
        let expanded = expander.normalize(&frame, node(1)).unwrap();
        assert_eq!(expanded.len(), 20);
        assert_eq!(&expanded[16..18], &[0x00, 0x02]);

        let passthrough = CanonicalOnly.normalize(&frame, node(1)).unwrap();
        assert_eq!(&*passthrough, &frame);
    }

    #[test]
    fn test_wall_clock_export_time_is_recent() {
        let out = TinyHeaderExpander::new()
            .expand(&[0x00, 0x03, 0x00], node(1))
            .unwrap();
        let stamped = u32::from_be_bytes([out[4], out[5], out[6], out[7]]);
        assert!(stamped > 1_600_000_000);
    }
}
