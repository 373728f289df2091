//! Template schema types.

use serde::Serialize;

use crate::constants::{ENTERPRISE_BIT_THRESHOLD, SEQUENCE_UNSET};
use crate::types::{NodeId, TemplateKey};

/// Layout of one value inside a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateField {
    pub field_id: u16,
    pub length: u16,
    pub enterprise_number: Option<u32>,
}

impl TemplateField {
    pub const fn new(field_id: u16, length: u16) -> Self {
        Self {
            field_id,
            length,
            enterprise_number: None,
        }
    }

    pub const fn with_enterprise(field_id: u16, length: u16, enterprise_number: u32) -> Self {
        Self {
            field_id,
            length,
            enterprise_number: Some(enterprise_number),
        }
    }

    /// Whether the wire descriptor of this field carries an enterprise number.
    pub fn has_enterprise_bit(&self) -> bool {
        self.field_id > ENTERPRISE_BIT_THRESHOLD
    }
}

/// How a template's stored sequence number gates incoming data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// A stored `SEQUENCE_UNSET` accepts every sequence number, always.
    ///
    /// Anyone able to inject one data set with sequence `0xFFFFFFFF` reopens
    /// the template to arbitrary replays.
    #[default]
    Compatible,
    /// `SEQUENCE_UNSET` is only honoured until the first data set is accepted.
    ///
    /// Nodes re-announce their templates every 16 seconds with sequence
    /// `0xFFFF`, which expands to `SEQUENCE_UNSET`. Each re-announcement
    /// replaces the template and re-opens it, so the extra protection only
    /// covers the window between two announcements. Inside that window a node
    /// whose 8-bit sequence number wraps (`0xFF` to `0x00`) has its data sets
    /// rejected until the next announcement.
    Strict,
}

/// Field schema announced by one node for one template id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub node_id: NodeId,
    pub template_id: u16,
    pub last_sequence_number: u32,
    pub fields: Vec<TemplateField>,
    data_seen: bool,
}

impl Template {
    /// Create a template announced in a message with `sequence_number`.
    pub fn new(node_id: NodeId, template_id: u16, sequence_number: u32) -> Self {
        Self {
            node_id,
            template_id,
            last_sequence_number: sequence_number,
            fields: Vec::new(),
            data_seen: false,
        }
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = TemplateField>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn add_field(&mut self, field: TemplateField) {
        self.fields.push(field);
    }

    pub fn key(&self) -> TemplateKey {
        TemplateKey::new(self.node_id, self.template_id)
    }

    /// Byte length of a data record that fits this template.
    pub fn expected_length(&self) -> u32 {
        self.fields.iter().map(|f| u32::from(f.length)).sum()
    }

    pub fn is_sequence_unset(&self) -> bool {
        self.last_sequence_number == SEQUENCE_UNSET
    }

    /// Whether a data set carrying `sequence` passes the replay check.
    pub fn accepts_sequence(&self, sequence: u32, policy: ReplayPolicy) -> bool {
        if sequence > self.last_sequence_number {
            return true;
        }
        match policy {
            ReplayPolicy::Compatible => self.is_sequence_unset(),
            ReplayPolicy::Strict => self.is_sequence_unset() && !self.data_seen,
        }
    }

    /// Record that a data set with `sequence` was decoded with this template.
    pub fn advance_sequence(&mut self, sequence: u32) {
        self.last_sequence_number = sequence;
        self.data_seen = true;
    }
}
