//! Canonical IPFIX message and set header codecs.
//!
//! ```text
//! Message header (16 bytes)
//!   0..2   version (0x000A)
//!   2..4   total message length
//!   4..8   export time, seconds
//!   8..12  sequence number
//!   12..16 observation domain id (node id)
//! Set header (4 bytes)
//!   0..2   set id (2 = template set, >= 256 = data set for that template id)
//!   2..4   set length including this header
//! Template field descriptor
//!   field id (u16), length (u16), enterprise number (u32) if field id > 0x8000
//! ```

use crate::constants::{IPFIX_VERSION, MESSAGE_HEADER_SIZE, SET_HEADER_SIZE, TEMPLATE_SET_ID};
use crate::cursor::ByteCursor;
use crate::error::CursorError;
use crate::template::TemplateField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u16,
    pub length: u16,
    pub export_time: u32,
    pub sequence_number: u32,
    pub observation_domain_id: u32,
}

impl MessageHeader {
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self, CursorError> {
        Ok(MessageHeader {
            version: cursor.read_u16()?,
            length: cursor.read_u16()?,
            export_time: cursor.read_u32()?,
            sequence_number: cursor.read_u32()?,
            observation_domain_id: cursor.read_u32()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.export_time.to_be_bytes());
        out.extend_from_slice(&self.sequence_number.to_be_bytes());
        out.extend_from_slice(&self.observation_domain_id.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeader {
    pub set_id: u16,
    pub length: u16,
}

impl SetHeader {
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self, CursorError> {
        Ok(SetHeader {
            set_id: cursor.read_u16()?,
            length: cursor.read_u16()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.set_id.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
    }

    /// Payload bytes after the set header; zero when the declared length is too small.
    pub fn payload_len(&self) -> usize {
        usize::from(self.length).saturating_sub(SET_HEADER_SIZE)
    }
}

/// Parse one template field descriptor.
pub fn parse_field_descriptor(cursor: &mut ByteCursor<'_>) -> Result<TemplateField, CursorError> {
    let field_id = cursor.read_u16()?;
    let length = cursor.read_u16()?;
    let mut field = TemplateField::new(field_id, length);
    if field.has_enterprise_bit() {
        field.enterprise_number = Some(cursor.read_u32()?);
    }
    Ok(field)
}

/// Append one template field descriptor.
pub fn write_field_descriptor(field: &TemplateField, out: &mut Vec<u8>) {
    out.extend_from_slice(&field.field_id.to_be_bytes());
    out.extend_from_slice(&field.length.to_be_bytes());
    if field.has_enterprise_bit() {
        out.extend_from_slice(&field.enterprise_number.unwrap_or(0).to_be_bytes());
    }
}

/// Builds canonical IPFIX messages carrying a single set.
#[derive(Debug, Clone, Copy)]
pub struct MessageBuilder {
    pub node_id: u32,
    pub sequence_number: u32,
    pub export_time: u32,
}

impl MessageBuilder {
    pub fn new(node_id: u32, sequence_number: u32) -> Self {
        Self {
            node_id,
            sequence_number,
            export_time: 0,
        }
    }

    pub fn export_time(mut self, export_time: u32) -> Self {
        self.export_time = export_time;
        self
    }

    /// A template-set message defining each `(template id, fields)` record.
    pub fn template_message(&self, templates: &[(u16, &[TemplateField])]) -> Vec<u8> {
        let mut records = Vec::new();
        for (template_id, fields) in templates {
            records.extend_from_slice(&template_id.to_be_bytes());
            records.extend_from_slice(&(fields.len() as u16).to_be_bytes());
            for field in *fields {
                write_field_descriptor(field, &mut records);
            }
        }
        self.message(TEMPLATE_SET_ID, &records)
    }

    /// A data-set message for `template_id` carrying the concatenated records.
    pub fn data_message(&self, template_id: u16, records: &[u8]) -> Vec<u8> {
        self.message(template_id, records)
    }

    fn message(&self, set_id: u16, payload: &[u8]) -> Vec<u8> {
        let total = MESSAGE_HEADER_SIZE + SET_HEADER_SIZE + payload.len();
        let mut out = Vec::with_capacity(total);
        MessageHeader {
            version: IPFIX_VERSION,
            length: total as u16,
            export_time: self.export_time,
            sequence_number: self.sequence_number,
            observation_domain_id: self.node_id,
        }
        .write(&mut out);
        SetHeader {
            set_id,
            length: (SET_HEADER_SIZE + payload.len()) as u16,
        }
        .write(&mut out);
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_header_parse() {
        let raw = [
            0x00, 0x0A, 0x00, 0x20, 0x5F, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x00,
            0x9F, 0x1C,
        ];
        let mut c = ByteCursor::new(&raw);
        let h = MessageHeader::parse(&mut c).unwrap();
        assert_eq!(h.version, IPFIX_VERSION);
        assert_eq!(h.length, 32);
        assert_eq!(h.export_time, 0x5F00_0001);
        assert_eq!(h.sequence_number, 0xFFFF_FF07);
        assert_eq!(h.observation_domain_id, 0x9F1C);
        assert!(c.is_empty());

        let mut out = Vec::new();
        h.write(&mut out);
        assert_eq!(out, raw);
    }

    #[test]
    fn test_message_header_truncated() {
        let raw = [0x00, 0x0A, 0x00];
        let mut c = ByteCursor::new(&raw);
        assert!(MessageHeader::parse(&mut c).is_err());
    }

    #[test]
    fn test_set_header_payload_len() {
        assert_eq!(SetHeader { set_id: 256, length: 10 }.payload_len(), 6);
        assert_eq!(SetHeader { set_id: 256, length: 2 }.payload_len(), 0);
    }

    #[test]
    fn test_field_descriptor_with_enterprise_number() {
        let field = TemplateField::with_enterprise(0x8005, 4, 0x0000_BEEF);
        let mut out = Vec::new();
        write_field_descriptor(&field, &mut out);
        assert_eq!(hex::encode(&out), "800500040000beef");

        let mut c = ByteCursor::new(&out);
        assert_eq!(parse_field_descriptor(&mut c).unwrap(), field);
    }

    #[test]
    fn test_field_descriptor_without_enterprise_number() {
        let raw = [0x00, 0x01, 0x00, 0x02];
        let mut c = ByteCursor::new(&raw);
        let field = parse_field_descriptor(&mut c).unwrap();
        assert_eq!(field, TemplateField::new(1, 2));
        assert!(c.is_empty());
    }

    #[test]
    fn test_template_message_layout() {
        let fields = [TemplateField::new(1, 2), TemplateField::new(2, 1)];
        let msg = MessageBuilder::new(7, 3).template_message(&[(256, &fields[..])]);
        // header 16 + set header 4 + template record header 4 + 2 descriptors * 4
        assert_eq!(msg.len(), 32);
        assert_eq!(&msg[2..4], &[0x00, 0x20]);
        assert_eq!(&msg[16..20], &[0x00, 0x02, 0x00, 0x10]);
        assert_eq!(&msg[20..24], &[0x01, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_data_message_layout() {
        let msg = MessageBuilder::new(7, 9)
            .export_time(100)
            .data_message(256, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(msg.len(), 23);
        let mut c = ByteCursor::new(&msg);
        let h = MessageHeader::parse(&mut c).unwrap();
        assert_eq!(h.sequence_number, 9);
        assert_eq!(h.export_time, 100);
        let s = SetHeader::parse(&mut c).unwrap();
        assert_eq!(s, SetHeader { set_id: 256, length: 7 });
        assert_eq!(c.peek_rest(), &[0xAA, 0xBB, 0xCC]);
    }
}
