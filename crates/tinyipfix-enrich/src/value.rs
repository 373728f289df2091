//! Enriched output values.

use core::fmt;

use serde::{Serialize, Serializer};
use tinyipfix_core::{NodeId, TemplateField};

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Bytes(#[serde(serialize_with = "hex_string")] Vec<u8>),
}

fn hex_string<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl FieldValue {
    /// Integral floats collapse to `Integer`; anything else stays a float.
    pub fn from_float(value: f64) -> Self {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            FieldValue::Integer(value as i64)
        } else {
            FieldValue::Float(value)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Bytes(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bytes(b) => write!(f, "0x{}", hex::encode_upper(b)),
        }
    }
}

/// A raw field after metadata lookup and value conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedField {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub unit: Option<String>,
    pub value: FieldValue,
    pub template_field: TemplateField,
    pub node_id: NodeId,
}

impl EnrichedField {
    /// Name if known, else type, else the numeric field id.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.field_type.clone())
            .unwrap_or_else(|| format!("{:#06x}", self.template_field.field_id))
    }
}

impl fmt::Display for EnrichedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] ({} - {}): {}",
            self.label(),
            self.template_field.length,
            self.template_field.enterprise_number.unwrap_or(0),
            self.template_field.field_id,
            self.value
        )?;
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        Ok(())
    }
}
