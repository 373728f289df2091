//! Raw field to enriched field conversion.

use std::collections::BTreeMap;
use std::sync::Arc;

use tinyipfix_core::{ByteCursor, DecodeLog, DecodedFields, NodeId, RawField};

use crate::catalog::EnrichmentCatalog;
use crate::descriptor::EnricherDescriptor;
use crate::error::EnrichError;
use crate::expression::ExpressionEvaluator;
use crate::history::ReferenceHistory;
use crate::value::{EnrichedField, FieldValue};

/// Value bound to a reference alias when nothing better is known.
pub const REFERENCE_PLACEHOLDER: f64 = 1.0;

/// How expression reference aliases are bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceMode {
    /// Last value seen for the referenced type on the same node,
    /// [`REFERENCE_PLACEHOLDER`] until one is seen.
    #[default]
    LastObserved,
    /// Always [`REFERENCE_PLACEHOLDER`].
    Placeholder,
}

/// Enriches raw fields against a shared [`EnrichmentCatalog`].
///
/// One engine per decoding pipeline: it owns the expression cache, the
/// reference history and its [`DecodeLog`].
#[derive(Debug)]
pub struct EnrichmentEngine {
    catalog: Arc<EnrichmentCatalog>,
    evaluator: ExpressionEvaluator,
    history: ReferenceHistory,
    reference_mode: ReferenceMode,
    log: DecodeLog,
}

impl EnrichmentEngine {
    pub fn new(catalog: Arc<EnrichmentCatalog>) -> Self {
        Self {
            catalog,
            evaluator: ExpressionEvaluator::new(),
            history: ReferenceHistory::new(),
            reference_mode: ReferenceMode::default(),
            log: DecodeLog::new(),
        }
    }

    pub fn with_reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.reference_mode = mode;
        self
    }

    pub fn catalog(&self) -> &Arc<EnrichmentCatalog> {
        &self.catalog
    }

    pub fn history(&self) -> &ReferenceHistory {
        &self.history
    }

    /// Trace of the last batch call.
    pub fn log(&self) -> &DecodeLog {
        &self.log
    }

    /// Enrich one field.
    ///
    /// Without a descriptor the raw bytes pass through with no metadata.
    /// Without an expression, 1, 2 and 4 byte values become unsigned integers.
    /// With one, the value is bound as `x` next to the descriptor's reference
    /// aliases and the expression result becomes the value.
    pub fn enrich(&mut self, field: &RawField) -> Result<EnrichedField, EnrichError> {
        let tf = field.template_field;
        let enterprise_number = u64::from(tf.enterprise_number.unwrap_or(0));
        let Some(descriptor) = self.catalog.lookup(tf.field_id, enterprise_number) else {
            return Ok(build(field, None, FieldValue::Bytes(field.value.clone())));
        };

        let value = match &descriptor.expression {
            None => match unsigned_value(&field.value) {
                Some(v) => FieldValue::Integer(i64::from(v)),
                None => FieldValue::Bytes(field.value.clone()),
            },
            Some(expression) => {
                let x = unsigned_value(&field.value).ok_or(EnrichError::UnsupportedFieldWidth {
                    width: field.value.len(),
                })?;
                let mut bindings = Vec::with_capacity(descriptor.references.len() + 1);
                for (alias, referenced_type) in &descriptor.references {
                    let bound = match self.reference_mode {
                        ReferenceMode::Placeholder => REFERENCE_PLACEHOLDER,
                        ReferenceMode::LastObserved => self
                            .history
                            .get(field.node_id, referenced_type)
                            .unwrap_or(REFERENCE_PLACEHOLDER),
                    };
                    bindings.push((alias.as_str(), bound));
                }
                bindings.push(("x", f64::from(x)));
                self.evaluator.evaluate(expression, &bindings)?
            }
        };

        if let Some(v) = value.as_f64() {
            self.history.record(field.node_id, &descriptor.field_type, v);
        }
        Ok(build(field, Some(descriptor), value))
    }

    /// Enrich a batch, clearing the log first.
    ///
    /// A field that fails to enrich is still returned, with its metadata and
    /// raw bytes; the failure is logged.
    pub fn enrich_all(&mut self, fields: &[RawField]) -> Vec<EnrichedField> {
        self.log.clear();
        self.enrich_batch(fields)
    }

    /// Enrich every node's fields of one decoded packet, clearing the log first.
    pub fn enrich_decoded(&mut self, decoded: &DecodedFields) -> BTreeMap<NodeId, Vec<EnrichedField>> {
        self.log.clear();
        decoded
            .iter()
            .map(|(node_id, fields)| (*node_id, self.enrich_batch(fields)))
            .collect()
    }

    fn enrich_batch(&mut self, fields: &[RawField]) -> Vec<EnrichedField> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            let enriched = match self.enrich(field) {
                Ok(enriched) => enriched,
                Err(e) => {
                    tracing::warn!(
                        node_id = %field.node_id,
                        field_id = field.template_field.field_id,
                        error = %e,
                        "field enrichment failed"
                    );
                    self.log.line(format_args!("error: {e}"));
                    let tf = field.template_field;
                    let descriptor = self
                        .catalog
                        .lookup(tf.field_id, u64::from(tf.enterprise_number.unwrap_or(0)));
                    build(field, descriptor, FieldValue::Bytes(field.value.clone()))
                }
            };
            tracing::trace!(node_id = %field.node_id, field = %enriched, "field enriched");
            self.log.line(format_args!("{enriched}"));
            out.push(enriched);
        }
        out
    }
}

fn build(field: &RawField, descriptor: Option<&EnricherDescriptor>, value: FieldValue) -> EnrichedField {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    EnrichedField {
        name: descriptor.and_then(|d| non_empty(&d.name)),
        field_type: descriptor.and_then(|d| non_empty(&d.field_type)),
        unit: descriptor.and_then(|d| d.unit.clone()),
        value,
        template_field: field.template_field,
        node_id: field.node_id,
    }
}

/// Big-endian unsigned value of a 1, 2 or 4 byte field.
fn unsigned_value(bytes: &[u8]) -> Option<u32> {
    let mut c = ByteCursor::new(bytes);
    match bytes.len() {
        1 => c.read_u8().ok().map(u32::from),
        2 => c.read_u16().ok().map(u32::from),
        4 => c.read_u32().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyipfix_core::TemplateField;

    fn raw(field_id: u16, value: &[u8]) -> RawField {
        RawField {
            value: value.to_vec(),
            node_id: NodeId::new(28),
            template_field: TemplateField::new(field_id, value.len() as u16),
        }
    }

    fn engine(descriptors: Vec<EnricherDescriptor>) -> EnrichmentEngine {
        EnrichmentEngine::new(Arc::new(EnrichmentCatalog::from_descriptors(descriptors)))
    }

    #[test]
    fn test_unknown_field_keeps_raw_bytes() {
        let mut e = engine(vec![]);
        let out = e.enrich(&raw(0x0042, &[0x01, 0x02])).unwrap();
        assert_eq!(out.value, FieldValue::Bytes(vec![0x01, 0x02]));
        assert!(out.name.is_none() && out.field_type.is_none() && out.unit.is_none());
    }

    #[test]
    fn test_plain_descriptor_converts_widths() {
        let mut e = engine(vec![
            EnricherDescriptor::new(1, "a", "a"),
            EnricherDescriptor::new(2, "b", "b").unit("lx"),
        ]);
        assert_eq!(e.enrich(&raw(1, &[0xFF])).unwrap().value, FieldValue::Integer(255));
        assert_eq!(e.enrich(&raw(1, &[0x01, 0x00])).unwrap().value, FieldValue::Integer(256));
        let wide = e.enrich(&raw(2, &[0xFF, 0xFF, 0xFF, 0xFF])).unwrap();
        assert_eq!(wide.value, FieldValue::Integer(4_294_967_295));
        assert_eq!(wide.unit.as_deref(), Some("lx"));
        assert_eq!(
            e.enrich(&raw(2, &[1, 2, 3])).unwrap().value,
            FieldValue::Bytes(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_expression_result() {
        let mut e = engine(vec![
            EnricherDescriptor::new(1, "temperature", "temperature").expression("x / 100"),
        ]);
        let out = e.enrich(&raw(1, &[0x09, 0x29])).unwrap();
        assert_eq!(out.value, FieldValue::Float(23.45));
        assert_eq!(out.name.as_deref(), Some("temperature"));
    }

    #[test]
    fn test_expression_on_wide_field_fails() {
        let mut e = engine(vec![EnricherDescriptor::new(1, "t", "t").expression("x")]);
        assert_eq!(
            e.enrich(&raw(1, &[0; 8])).unwrap_err(),
            EnrichError::UnsupportedFieldWidth { width: 8 }
        );
    }

    #[test]
    fn test_reference_modes() {
        let descriptors = vec![
            EnricherDescriptor::new(1, "humidity", "humidity"),
            EnricherDescriptor::new(2, "dew", "dew")
                .expression("x + h")
                .reference("h", "humidity"),
        ];

        let mut observed = engine(descriptors.clone());
        assert_eq!(observed.enrich(&raw(2, &[10])).unwrap().value, FieldValue::Integer(11));
        observed.enrich(&raw(1, &[40])).unwrap();
        assert_eq!(observed.enrich(&raw(2, &[10])).unwrap().value, FieldValue::Integer(50));

        let mut placeholder = engine(descriptors).with_reference_mode(ReferenceMode::Placeholder);
        placeholder.enrich(&raw(1, &[40])).unwrap();
        assert_eq!(placeholder.enrich(&raw(2, &[10])).unwrap().value, FieldValue::Integer(11));
    }

    #[test]
    fn test_batch_failure_is_field_local() {
        let mut e = engine(vec![
            EnricherDescriptor::new(1, "broken", "broken").expression("x + missing"),
            EnricherDescriptor::new(2, "ok", "ok"),
        ]);
        let out = e.enrich_all(&[raw(1, &[5]), raw(2, &[6])]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value, FieldValue::Bytes(vec![5]));
        assert_eq!(out[0].name.as_deref(), Some("broken"));
        assert_eq!(out[1].value, FieldValue::Integer(6));
        assert!(e.log().as_str().contains("error: failed to evaluate `x + missing`"));
        assert!(e.log().as_str().contains("ok[1] (0 - 2): 6"));
    }

    #[test]
    fn test_enrich_decoded_covers_every_node() {
        let mut e = engine(vec![EnricherDescriptor::new(1, "a", "a")]);
        let mut decoded = DecodedFields::new();
        decoded.insert(NodeId::new(1), vec![raw(1, &[1])]);
        let mut other = raw(1, &[2]);
        other.node_id = NodeId::new(2);
        decoded.insert(NodeId::new(2), vec![other]);

        let out = e.enrich_decoded(&decoded);
        assert_eq!(out.len(), 2);
        assert_eq!(out[&NodeId::new(2)][0].value, FieldValue::Integer(2));
        assert_eq!(e.log().as_str().lines().count(), 2);
    }
}
