//! TinyIPFIX header compression.
//!
//! Constrained nodes send a 3 to 5 byte header in place of the canonical
//! 20-byte prefix. [`expand`] rebuilds the canonical message so the rest of
//! the pipeline only ever sees full IPFIX.

pub mod expand;
pub mod header;

pub use expand::{
    CanonicalOnly, HeaderNormalizer, TinyHeaderExpander, expand, is_compressed,
    node_id_from_address,
};
pub use header::{TinyFrame, TinyHeader};
