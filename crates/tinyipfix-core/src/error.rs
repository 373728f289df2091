//! Error types for the tinyipfix-core crate.

use crate::types::NodeId;

/// Failure of a bounds-checked read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("truncated input: need {needed} bytes at offset {offset}, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
}

/// Errors that abort the decoding of a whole packet.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("read past the end of the packet")]
    TruncatedInput(#[from] CursorError),

    #[error("unsupported IPFIX version: expected 0x000a, got {0:#06x}")]
    UnsupportedVersion(u16),

    #[error("malformed TinyIPFIX header: {reason}")]
    MalformedHeader {
        reason: String,
        #[source]
        source: Option<CursorError>,
    },

    #[error("truncated packet: need {expected} bytes, got {actual}")]
    TruncatedPacket { expected: usize, actual: usize },

    #[error("invalid set id {set_id}: expected {expected}")]
    InvalidSetId { set_id: u16, expected: &'static str },

    #[error(
        "data set for template {template_id} from node {node_id} does not fit its template: \
         set carries {actual} bytes, template expects {expected}"
    )]
    SchemaMismatch {
        node_id: NodeId,
        template_id: u16,
        expected: usize,
        actual: usize,
    },

    #[error("stale packet from node {node_id}: sequence {sequence} <= last accepted {last}")]
    ReplayedOrStalePacket {
        node_id: NodeId,
        sequence: u32,
        last: u32,
    },
}

impl DecodeError {
    /// Build a `MalformedHeader` without a lower-level cause.
    pub fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::MalformedHeader {
            reason: reason.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_cursor_error_display() {
        let err = CursorError::TruncatedInput {
            offset: 4,
            needed: 2,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "truncated input: need 2 bytes at offset 4, 1 remaining"
        );
    }

    #[test]
    fn test_decode_error_display() {
        assert_eq!(
            DecodeError::UnsupportedVersion(9).to_string(),
            "unsupported IPFIX version: expected 0x000a, got 0x0009"
        );
        assert_eq!(
            DecodeError::TruncatedPacket {
                expected: 40,
                actual: 30
            }
            .to_string(),
            "truncated packet: need 40 bytes, got 30"
        );
        assert_eq!(
            DecodeError::InvalidSetId {
                set_id: 3,
                expected: "2"
            }
            .to_string(),
            "invalid set id 3: expected 2"
        );
        assert_eq!(
            DecodeError::ReplayedOrStalePacket {
                node_id: NodeId::new(7),
                sequence: 5,
                last: 5
            }
            .to_string(),
            "stale packet from node 7: sequence 5 <= last accepted 5"
        );
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = DecodeError::SchemaMismatch {
            node_id: NodeId::new(1),
            template_id: 256,
            expected: 6,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("template 256"));
        assert!(msg.contains("node 1"));
        assert!(msg.contains("set carries 4 bytes, template expects 6"));
    }

    #[test]
    fn test_malformed_header_keeps_cause() {
        let cause = CursorError::TruncatedInput {
            offset: 2,
            needed: 1,
            remaining: 0,
        };
        let err = DecodeError::MalformedHeader {
            reason: "missing sequence number".into(),
            source: Some(cause.clone()),
        };
        assert_eq!(
            err.to_string(),
            "malformed TinyIPFIX header: missing sequence number"
        );
        let source = err.source().expect("cause should be chained");
        assert_eq!(source.to_string(), cause.to_string());

        assert!(DecodeError::malformed("bad length").source().is_none());
    }

    #[test]
    fn test_decode_error_from_cursor_error() {
        let ce = CursorError::TruncatedInput {
            offset: 0,
            needed: 2,
            remaining: 0,
        };
        let de: DecodeError = ce.into();
        assert!(matches!(de, DecodeError::TruncatedInput(_)));
        assert_eq!(de.to_string(), "read past the end of the packet");
        let source = de.source().expect("cursor error should be the source");
        assert!(source.to_string().contains("need 2 bytes"));
    }
}
