//! Canonical IPFIX packet decoding.
//!
//! A packet is either a template message, which updates the registry and
//! yields nothing, or a data message, which is split into one [`RawField`]
//! per template field. Every call clears the decoder's [`DecodeLog`] first,
//! so after a call the log describes exactly that packet.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use serde::Serialize;

use crate::constants::{
    IPFIX_VERSION, MESSAGE_HEADER_SIZE, MIN_DATA_SET_ID,
    MIN_TEMPLATE_MESSAGE_SIZE, TEMPLATE_SET_ID,
};
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::template::{ReplayPolicy, Template, TemplateField, TemplateRegistry};
use crate::tiny::{HeaderNormalizer, TinyHeaderExpander};
use crate::trace::DecodeLog;
use crate::types::NodeId;
use crate::wire::{MessageHeader, SetHeader, parse_field_descriptor};

/// One undecoded value cut out of a data record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawField {
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
    pub node_id: NodeId,
    pub template_field: TemplateField,
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

/// Fields of one data message, grouped per exporting node in record order.
pub type DecodedFields = BTreeMap<NodeId, Vec<RawField>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    pub replay_policy: ReplayPolicy,
}

/// Decodes canonical IPFIX packets against a caller-owned [`TemplateRegistry`].
///
/// The normalizer runs first in [`decode_frame`](Self::decode_frame) and
/// decides whether the frame needs header expansion.
#[derive(Debug)]
pub struct PacketDecoder<N = TinyHeaderExpander> {
    normalizer: N,
    options: DecoderOptions,
    log: DecodeLog,
}

impl PacketDecoder<TinyHeaderExpander> {
    pub fn new() -> Self {
        Self::with_normalizer(TinyHeaderExpander::new())
    }
}

impl Default for PacketDecoder<TinyHeaderExpander> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: HeaderNormalizer> PacketDecoder<N> {
    pub fn with_normalizer(normalizer: N) -> Self {
        Self {
            normalizer,
            options: DecoderOptions::default(),
            log: DecodeLog::new(),
        }
    }

    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// Human-readable trace of the last call.
    pub fn log(&self) -> &DecodeLog {
        &self.log
    }

    /// Normalize a received frame, then decode it.
    pub fn decode_frame(
        &mut self,
        registry: &mut TemplateRegistry,
        frame: &[u8],
        source: Ipv6Addr,
    ) -> Result<Option<DecodedFields>, DecodeError> {
        self.log.clear();
        let canonical = match self.normalizer.normalize(frame, source) {
            Ok(canonical) => canonical,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };
        self.decode_canonical(registry, &canonical)
    }

    /// Decode one canonical packet.
    ///
    /// Returns `None` for template messages. A data set whose template is
    /// unknown ends set processing without an error; fields decoded from
    /// earlier sets are still returned.
    pub fn decode(
        &mut self,
        registry: &mut TemplateRegistry,
        packet: &[u8],
    ) -> Result<Option<DecodedFields>, DecodeError> {
        self.log.clear();
        self.decode_canonical(registry, packet)
    }

    fn decode_canonical(
        &mut self,
        registry: &mut TemplateRegistry,
        packet: &[u8],
    ) -> Result<Option<DecodedFields>, DecodeError> {
        let result = self.dispatch(registry, packet);
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    fn record_failure(&mut self, e: &DecodeError) {
        self.log.line(format_args!("error: {e}"));
        tracing::debug!(error = %e, "packet rejected");
    }

    fn dispatch(
        &mut self,
        registry: &mut TemplateRegistry,
        packet: &[u8],
    ) -> Result<Option<DecodedFields>, DecodeError> {
        let mut c = ByteCursor::new(packet);
        let version = c.read_u16()?;
        if version != IPFIX_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let declared = usize::from(c.read_u16()?);
        if declared > packet.len() {
            return Err(DecodeError::TruncatedPacket {
                expected: declared,
                actual: packet.len(),
            });
        }

        // Nothing past the declared length is ever looked at.
        let message = &packet[..declared];
        let mut c = ByteCursor::new(message);
        c.skip(MESSAGE_HEADER_SIZE)?;
        let set_id = c.read_u16()?;

        if set_id == TEMPLATE_SET_ID {
            self.decode_template_message(registry, message)?;
            Ok(None)
        } else {
            self.decode_data_message(registry, message).map(Some)
        }
    }

    fn decode_template_message(
        &mut self,
        registry: &mut TemplateRegistry,
        message: &[u8],
    ) -> Result<(), DecodeError> {
        if message.len() < MIN_TEMPLATE_MESSAGE_SIZE {
            return Err(DecodeError::TruncatedPacket {
                expected: MIN_TEMPLATE_MESSAGE_SIZE,
                actual: message.len(),
            });
        }

        let mut c = ByteCursor::new(message);
        let header = MessageHeader::parse(&mut c)?;
        let node_id = NodeId::from(header.observation_domain_id);
        self.log.line(format_args!(
            "template message: node {node_id}, sequence {:#010x}, export time {}",
            header.sequence_number, header.export_time
        ));

        while !c.is_empty() {
            let set = SetHeader::parse(&mut c)?;
            if set.set_id != TEMPLATE_SET_ID {
                return Err(DecodeError::InvalidSetId {
                    set_id: set.set_id,
                    expected: "template set id 2",
                });
            }

            let mut records = ByteCursor::new(c.read_bytes(set.payload_len())?);
            while !records.is_empty() {
                let template_id = records.read_u16()?;
                let field_count = records.read_u16()?;
                let mut template = Template::new(node_id, template_id, header.sequence_number);
                for _ in 0..field_count {
                    template.add_field(parse_field_descriptor(&mut records)?);
                }
                self.log_template(&template);
                registry.upsert(template);
            }
        }
        Ok(())
    }

    fn log_template(&mut self, template: &Template) {
        self.log.line(format_args!(
            "template {}: {} fields, {} bytes per record",
            template.template_id,
            template.fields.len(),
            template.expected_length()
        ));
        for field in &template.fields {
            match field.enterprise_number {
                Some(en) => self.log.line(format_args!(
                    "  field {:#06x} length {} enterprise {en}",
                    field.field_id, field.length
                )),
                None => self.log.line(format_args!(
                    "  field {:#06x} length {}",
                    field.field_id, field.length
                )),
            }
        }
        tracing::info!(
            node_id = %template.node_id,
            template_id = template.template_id,
            fields = template.fields.len(),
            sequence = template.last_sequence_number,
            "template defined"
        );
    }

    fn decode_data_message(
        &mut self,
        registry: &mut TemplateRegistry,
        message: &[u8],
    ) -> Result<DecodedFields, DecodeError> {
        let mut c = ByteCursor::new(message);
        let header = MessageHeader::parse(&mut c)?;
        let node_id = NodeId::from(header.observation_domain_id);
        let sequence = header.sequence_number;
        self.log.line(format_args!(
            "data message: node {node_id}, sequence {sequence:#010x}, export time {}",
            header.export_time
        ));

        let mut decoded = DecodedFields::new();
        while !c.is_empty() {
            let set = SetHeader::parse(&mut c)?;
            if set.set_id < MIN_DATA_SET_ID {
                return Err(DecodeError::InvalidSetId {
                    set_id: set.set_id,
                    expected: "data set id >= 256",
                });
            }
            let fields_length = set.payload_len();

            let Some(template) = registry.lookup_mut(node_id, set.set_id) else {
                let rest = c.peek_rest();
                let rest = &rest[..fields_length.min(rest.len())];
                self.log.line(format_args!(
                    "no template {} for node {node_id}, skipping: {}",
                    set.set_id,
                    hex_dump(rest)
                ));
                tracing::debug!(node_id = %node_id, template_id = set.set_id, "unknown template");
                break;
            };

            let expected = template.expected_length() as usize;
            if fields_length != expected {
                return Err(DecodeError::SchemaMismatch {
                    node_id,
                    template_id: set.set_id,
                    expected,
                    actual: fields_length,
                });
            }
            if fields_length > c.remaining() {
                return Err(DecodeError::TruncatedPacket {
                    expected: fields_length,
                    actual: c.remaining(),
                });
            }
            if !template.accepts_sequence(sequence, self.options.replay_policy) {
                return Err(DecodeError::ReplayedOrStalePacket {
                    node_id,
                    sequence,
                    last: template.last_sequence_number,
                });
            }

            let fields = decoded.entry(node_id).or_default();
            for field in &template.fields {
                let value = c.read_bytes(usize::from(field.length))?;
                self.log.line(format_args!(
                    "  field {:#06x}: {}",
                    field.field_id,
                    hex_dump(value)
                ));
                fields.push(RawField {
                    value: value.to_vec(),
                    node_id,
                    template_field: *field,
                });
            }
            template.advance_sequence(sequence);

            tracing::debug!(
                node_id = %node_id,
                template_id = set.set_id,
                sequence,
                fields = template.fields.len(),
                "data set decoded"
            );
        }
        Ok(decoded)
    }
}

/// `"0A 1B "` style dump used in the decode log.
fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X} ")).collect()
}
