//! Template schemas and the per-node template registry.

pub mod registry;
pub mod types;

pub use registry::TemplateRegistry;
pub use types::{ReplayPolicy, Template, TemplateField};
