//! Per-packet decode and enrichment pipeline.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::sync::Arc;

use serde::Serialize;
use tinyipfix_core::{DecoderOptions, NodeId, PacketDecoder, TemplateRegistry};
use tinyipfix_enrich::{EnrichedField, EnrichmentCatalog, EnrichmentEngine, ReferenceMode};

use crate::error::ListenerError;

/// Everything produced for one received frame.
#[derive(Debug, Clone, Serialize)]
pub struct PacketReport {
    pub source: Ipv6Addr,
    pub decode_log: String,
    pub enrich_log: String,
    /// `None` for template messages.
    pub fields: Option<BTreeMap<NodeId, Vec<EnrichedField>>>,
}

impl PacketReport {
    pub fn field_count(&self) -> usize {
        self.fields
            .as_ref()
            .map_or(0, |nodes| nodes.values().map(Vec::len).sum())
    }
}

/// Owns one decoder, its private template registry and an enrichment engine.
///
/// Collectors never share templates; only the catalog is shared.
#[derive(Debug)]
pub struct Collector {
    decoder: PacketDecoder,
    registry: TemplateRegistry,
    engine: EnrichmentEngine,
}

impl Collector {
    pub fn new(catalog: Arc<EnrichmentCatalog>) -> Self {
        Self {
            decoder: PacketDecoder::new(),
            registry: TemplateRegistry::new(),
            engine: EnrichmentEngine::new(catalog),
        }
    }

    pub fn with_decoder_options(mut self, options: DecoderOptions) -> Self {
        self.decoder = self.decoder.with_options(options);
        self
    }

    pub fn with_reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.engine = self.engine.with_reference_mode(mode);
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Expand, decode and enrich one frame.
    pub fn process(&mut self, frame: &[u8], source: Ipv6Addr) -> Result<PacketReport, ListenerError> {
        let decoded = self.decoder.decode_frame(&mut self.registry, frame, source)?;
        let fields = decoded.map(|decoded| self.engine.enrich_decoded(&decoded));
        let enrich_log = if fields.is_some() {
            self.engine.log().to_string()
        } else {
            String::new()
        };

        let report = PacketReport {
            source,
            decode_log: self.decoder.log().to_string(),
            enrich_log,
            fields,
        };
        tracing::debug!(
            source = %source,
            template = report.fields.is_none(),
            fields = report.field_count(),
            "packet processed"
        );
        Ok(report)
    }
}
