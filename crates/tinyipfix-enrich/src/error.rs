//! Error types for the tinyipfix-enrich crate.

/// Field-local enrichment failures. The rest of the packet is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    #[error("unsupported field width: {width} bytes, expressions take 1, 2 or 4 byte values")]
    UnsupportedFieldWidth { width: usize },

    #[error("failed to evaluate `{expression}`: {reason}")]
    ExpressionEvaluation { expression: String, reason: String },
}
