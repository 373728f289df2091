//! Field metadata descriptors.

use core::fmt;
use std::collections::BTreeMap;

/// High byte of a field id that aggregation reuses for framing.
pub const FIELD_ID_MASK: u16 = 0x00FF;

/// Catalog key: a field id within an enterprise namespace (0 = IANA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldQualifier {
    pub enterprise_number: u64,
    pub field_id: u16,
}

impl FieldQualifier {
    pub const fn new(enterprise_number: u64, field_id: u16) -> Self {
        Self {
            enterprise_number,
            field_id,
        }
    }

    /// The same qualifier with the field id's high byte stripped.
    pub const fn masked(self) -> Self {
        Self::new(self.enterprise_number, self.field_id & FIELD_ID_MASK)
    }
}

impl fmt::Display for FieldQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.field_id, self.enterprise_number)
    }
}

/// Name, type, unit and value transform for one field.
///
/// `references` maps an alias usable inside `expression` to the type of
/// another field whose value it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnricherDescriptor {
    pub field_id: u16,
    pub enterprise_number: u64,
    pub name: String,
    pub field_type: String,
    pub unit: Option<String>,
    pub expression: Option<String>,
    pub references: BTreeMap<String, String>,
}

impl EnricherDescriptor {
    pub fn new(field_id: u16, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            field_id,
            name: name.into(),
            field_type: field_type.into(),
            ..Self::default()
        }
    }

    pub fn enterprise_number(mut self, enterprise_number: u64) -> Self {
        self.enterprise_number = enterprise_number;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the value transform. Blank expressions are ignored.
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        self.expression = if expression.trim().is_empty() {
            None
        } else {
            Some(expression)
        };
        self
    }

    pub fn reference(mut self, alias: impl Into<String>, field_type: impl Into<String>) -> Self {
        self.references.insert(alias.into(), field_type.into());
        self
    }

    pub fn qualifier(&self) -> FieldQualifier {
        FieldQualifier::new(self.enterprise_number, self.field_id)
    }
}
