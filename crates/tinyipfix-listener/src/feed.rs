//! Frames out of tunslip6 verbose output.
//!
//! With `-v5` the bridge announces every datagram it hands to the tun device
//! with a line ending in `write TUN`, followed by a line holding a 5
//! character prefix and a space separated hex dump of the datagram. The
//! dump starts with the 40 byte IPv6 header and the 8 byte UDP header; the
//! sensor's address sits at offset 16 of it.

use std::net::Ipv6Addr;

use crate::error::FeedError;

pub const IP_UDP_HEADER_SIZE: usize = 48;
pub const SOURCE_ADDRESS_OFFSET: usize = 16;
pub const DUMP_PREFIX_LEN: usize = 5;
pub const WRITE_TUN_MARKER: &str = "write TUN";

/// A UDP payload and the address of the node that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Vec<u8>,
    pub source: Ipv6Addr,
}

/// Split a dumped datagram into its source address and UDP payload.
pub fn extract_frame(datagram: &[u8]) -> Result<Frame, FeedError> {
    if datagram.len() <= IP_UDP_HEADER_SIZE {
        return Err(FeedError::NoPayload {
            len: datagram.len(),
            header: IP_UDP_HEADER_SIZE,
        });
    }
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&datagram[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + 16]);
    Ok(Frame {
        payload: datagram[IP_UDP_HEADER_SIZE..].to_vec(),
        source: Ipv6Addr::from(octets),
    })
}

/// Hex-decode a dump line, skipping its prefix and all whitespace.
pub fn decode_dump_line(line: &str) -> Result<Vec<u8>, FeedError> {
    let dump = line
        .get(DUMP_PREFIX_LEN..)
        .ok_or_else(|| FeedError::ShortDumpLine(line.to_string()))?;
    let compact: String = dump.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(compact)?)
}

/// Line-at-a-time state machine over the bridge's output.
#[derive(Debug, Default)]
pub struct TunslipLineParser {
    awaiting_dump: bool,
}

impl TunslipLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns a result only for the dump line that follows a
    /// `write TUN` announcement; every other line is ignored.
    pub fn push_line(&mut self, line: &str) -> Option<Result<Frame, FeedError>> {
        if self.awaiting_dump {
            self.awaiting_dump = false;
            return Some(decode_dump_line(line).and_then(|d| extract_frame(&d)));
        }
        if line.trim_end().ends_with(WRITE_TUN_MARKER) {
            self.awaiting_dump = true;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram(source: Ipv6Addr, payload: &[u8]) -> Vec<u8> {
        let mut d = vec![0u8; IP_UDP_HEADER_SIZE];
        d[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + 16].copy_from_slice(&source.octets());
        d.extend_from_slice(payload);
        d
    }

    fn dump_line(d: &[u8]) -> String {
        let bytes: Vec<String> = d.iter().map(|b| format!("{b:02x}")).collect();
        format!("0000 {}", bytes.join(" "))
    }

    #[test]
    fn extract_frame_splits_header() {
        let source: Ipv6Addr = "aaaa::212:7401:1:101".parse().unwrap();
        let frame = extract_frame(&datagram(source, &[1, 2, 3])).unwrap();
        assert_eq!(frame.source, source);
        assert_eq!(frame.payload, vec![1, 2, 3]);
    }

    #[test]
    fn extract_frame_needs_payload() {
        assert!(matches!(
            extract_frame(&[0; IP_UDP_HEADER_SIZE]),
            Err(FeedError::NoPayload { len: 48, .. })
        ));
    }

    #[test]
    fn decode_dump_line_strips_prefix_and_spaces() {
        assert_eq!(decode_dump_line("0000 0a 0B  ff").unwrap(), vec![0x0a, 0x0b, 0xff]);
        assert!(matches!(decode_dump_line("00"), Err(FeedError::ShortDumpLine(_))));
        assert!(matches!(decode_dump_line("0000 0g"), Err(FeedError::InvalidHex(_))));
        assert!(matches!(decode_dump_line("0000 abc"), Err(FeedError::InvalidHex(_))));
    }

    #[test]
    fn parser_pairs_marker_with_dump() {
        let source = Ipv6Addr::new(0xaaaa, 0, 0, 0x1c, 0, 0, 0, 1);
        let d = datagram(source, &[0xAB]);
        let mut parser = TunslipLineParser::new();

        assert!(parser.push_line("slip started on ``/dev/ttyUSB0''").is_none());
        assert!(parser.push_line(&dump_line(&d)).is_none());
        assert!(parser.push_line("Packet from SLIP of length 49 - write TUN").is_none());
        let frame = parser.push_line(&dump_line(&d)).unwrap().unwrap();
        assert_eq!(frame.source, source);
        assert_eq!(frame.payload, vec![0xAB]);
        // Back to waiting for a marker.
        assert!(parser.push_line(&dump_line(&d)).is_none());
    }

    #[test]
    fn parser_reports_bad_dumps_and_recovers() {
        let mut parser = TunslipLineParser::new();
        parser.push_line("write TUN\r");
        assert!(parser.push_line("0000 zz").unwrap().is_err());
        assert!(parser.push_line("0000 00").is_none());
    }
}
