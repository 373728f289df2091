//! Per-node template store.

use std::collections::HashMap;

use crate::types::{NodeId, TemplateKey};

use super::types::Template;

/// Templates keyed by `(node, template id)`; redefinition always wins.
#[must_use]
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<TemplateKey, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Insert or replace the template for its key, returning the previous one.
    ///
    /// No ordering check applies to template (re)definition.
    pub fn upsert(&mut self, template: Template) -> Option<Template> {
        self.templates.insert(template.key(), template)
    }

    #[must_use]
    pub fn lookup(&self, node_id: NodeId, template_id: u16) -> Option<&Template> {
        self.templates.get(&TemplateKey::new(node_id, template_id))
    }

    pub fn lookup_mut(&mut self, node_id: NodeId, template_id: u16) -> Option<&mut Template> {
        self.templates
            .get_mut(&TemplateKey::new(node_id, template_id))
    }

    /// Byte length of a data record for `template`.
    #[must_use]
    pub fn expected_length(template: &Template) -> u32 {
        template.expected_length()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::TemplateField;

    fn template(node: u64, id: u16, seq: u32, fields: &[TemplateField]) -> Template {
        Template::new(NodeId::new(node), id, seq).with_fields(fields.iter().copied())
    }

    #[test]
    fn test_new_registry_is_empty() {
        let reg = TemplateRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.lookup(NodeId::new(1), 256).is_none());
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut reg = TemplateRegistry::new();
        assert!(reg.upsert(template(1, 256, 0, &[TemplateField::new(1, 2)])).is_none());

        let t = reg.lookup(NodeId::new(1), 256).unwrap();
        assert_eq!(t.fields.len(), 1);
        assert_eq!(TemplateRegistry::expected_length(t), 2);
        assert!(reg.lookup(NodeId::new(2), 256).is_none());
        assert!(reg.lookup(NodeId::new(1), 257).is_none());
    }

    #[test]
    fn test_upsert_replaces_unconditionally() {
        let mut reg = TemplateRegistry::new();
        reg.upsert(template(1, 256, 100, &[TemplateField::new(1, 2)]));

        // A redefinition with an older sequence number still replaces.
        let previous = reg.upsert(template(
            1,
            256,
            3,
            &[TemplateField::new(1, 4), TemplateField::new(2, 4)],
        ));
        assert_eq!(previous.unwrap().last_sequence_number, 100);

        let t = reg.lookup(NodeId::new(1), 256).unwrap();
        assert_eq!(t.last_sequence_number, 3);
        assert_eq!(t.expected_length(), 8);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_lookup_mut_advances_state() {
        let mut reg = TemplateRegistry::new();
        reg.upsert(template(9, 300, 5, &[]));
        reg.lookup_mut(NodeId::new(9), 300).unwrap().advance_sequence(6);
        assert_eq!(
            reg.lookup(NodeId::new(9), 300).unwrap().last_sequence_number,
            6
        );
    }
}
