//! Descriptor lookup table.

use std::collections::HashMap;

use crate::descriptor::{EnricherDescriptor, FieldQualifier};

/// Immutable table of [`EnricherDescriptor`]s, built once and shared.
///
/// Lookup tries, in order: the exact qualifier, the raw field id masked with
/// `0x00FF`, and finally descriptors whose own masked id matches the masked
/// raw id. The enterprise number must always match exactly.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentCatalog {
    exact: HashMap<FieldQualifier, EnricherDescriptor>,
    masked: HashMap<FieldQualifier, FieldQualifier>,
}

impl EnrichmentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptors in order; a later duplicate qualifier wins.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = EnricherDescriptor>) -> Self {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            catalog.insert(descriptor);
        }
        catalog
    }

    /// Add or replace a descriptor, returning the one it replaced.
    pub fn insert(&mut self, descriptor: EnricherDescriptor) -> Option<EnricherDescriptor> {
        let qualifier = descriptor.qualifier();
        self.masked.insert(qualifier.masked(), qualifier);
        let previous = self.exact.insert(qualifier, descriptor);
        if previous.is_some() {
            tracing::debug!(%qualifier, "descriptor replaced");
        }
        previous
    }

    #[must_use]
    pub fn lookup(&self, field_id: u16, enterprise_number: u64) -> Option<&EnricherDescriptor> {
        let qualifier = FieldQualifier::new(enterprise_number, field_id);
        let masked = qualifier.masked();
        self.exact
            .get(&qualifier)
            .or_else(|| self.exact.get(&masked))
            .or_else(|| self.masked.get(&masked).and_then(|q| self.exact.get(q)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl FromIterator<EnricherDescriptor> for EnrichmentCatalog {
    fn from_iter<I: IntoIterator<Item = EnricherDescriptor>>(iter: I) -> Self {
        Self::from_descriptors(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> EnrichmentCatalog {
        EnrichmentCatalog::from_descriptors([
            EnricherDescriptor::new(0x0105, "light", "light"),
            EnricherDescriptor::new(0x0006, "battery", "voltage"),
            EnricherDescriptor::new(0x8001, "temperature", "temperature").enterprise_number(0xBEEF),
        ])
    }

    #[test]
    fn test_exact_lookup() {
        let c = catalog();
        assert_eq!(c.lookup(0x0105, 0).unwrap().name, "light");
        assert_eq!(c.lookup(0x8001, 0xBEEF).unwrap().name, "temperature");
        assert!(c.lookup(0x8001, 0).is_none());
    }

    #[test]
    fn test_masked_raw_id() {
        // 0x0306 & 0x00FF = 0x0006, registered exactly.
        assert_eq!(catalog().lookup(0x0306, 0).unwrap().name, "battery");
    }

    #[test]
    fn test_masked_descriptor_id() {
        let c = catalog();
        assert_eq!(c.lookup(0x0205, 0).unwrap().name, "light");
        assert!(c.lookup(0x0205, 1).is_none());
    }

    #[test]
    fn test_unknown_field() {
        assert!(catalog().lookup(0x0042, 0).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let c: EnrichmentCatalog = [
            EnricherDescriptor::new(1, "first", "t"),
            EnricherDescriptor::new(1, "second", "t"),
        ]
        .into_iter()
        .collect();
        assert_eq!(c.len(), 1);
        assert_eq!(c.lookup(1, 0).unwrap().name, "second");
    }

    #[test]
    fn test_empty_catalog() {
        let c = EnrichmentCatalog::new();
        assert!(c.is_empty());
        assert!(c.lookup(1, 0).is_none());
    }
}
