//! Wire decoding for IPFIX and TinyIPFIX telemetry.
//!
//! This crate expands compressed TinyIPFIX headers, keeps the per-node
//! template registry, enforces sequence-number replay protection, and cuts
//! data records into raw fields ready for enrichment.

pub mod constants;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod template;
pub mod tiny;
pub mod trace;
pub mod types;
pub mod wire;

pub use constants::TinyFlags;
pub use cursor::ByteCursor;
pub use decoder::{DecodedFields, DecoderOptions, PacketDecoder, RawField};
pub use error::{CursorError, DecodeError};
pub use template::{ReplayPolicy, Template, TemplateField, TemplateRegistry};
pub use tiny::{CanonicalOnly, HeaderNormalizer, TinyFrame, TinyHeaderExpander};
pub use trace::DecodeLog;
pub use types::{NodeId, TemplateKey};
pub use wire::MessageBuilder;
