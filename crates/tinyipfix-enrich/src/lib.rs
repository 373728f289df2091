//! Metadata-driven enrichment of decoded IPFIX fields.
//!
//! An [`EnrichmentCatalog`] maps `(enterprise number, field id)` to a name,
//! type, unit and optional value expression. The [`EnrichmentEngine`] turns
//! each [`tinyipfix_core::RawField`] into an [`EnrichedField`] using it.

pub mod catalog;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod expression;
pub mod history;
pub mod value;

pub use catalog::EnrichmentCatalog;
pub use descriptor::{EnricherDescriptor, FIELD_ID_MASK, FieldQualifier};
pub use engine::{EnrichmentEngine, REFERENCE_PLACEHOLDER, ReferenceMode};
pub use error::EnrichError;
pub use expression::ExpressionEvaluator;
pub use history::ReferenceHistory;
pub use value::{EnrichedField, FieldValue};
