//! Last observed value per node and field type.

use std::collections::HashMap;

use tinyipfix_core::NodeId;

/// Feeds expression references with the most recent value of a field type.
#[derive(Debug, Clone, Default)]
pub struct ReferenceHistory {
    values: HashMap<(NodeId, String), f64>,
}

impl ReferenceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node_id: NodeId, field_type: &str, value: f64) {
        self.values.insert((node_id, field_type.to_string()), value);
    }

    #[must_use]
    pub fn get(&self, node_id: NodeId, field_type: &str) -> Option<f64> {
        self.values.get(&(node_id, field_type.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
