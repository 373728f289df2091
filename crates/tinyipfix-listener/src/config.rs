//! TOML-based configuration for the listener.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tinyipfix_core::{DecoderOptions, ReplayPolicy};
use tinyipfix_enrich::{EnricherDescriptor, EnrichmentCatalog, ReferenceMode};

use crate::error::ListenerError;
use crate::sink::OutputFormat;

/// Top-level listener configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ListenerConfig {
    #[serde(default)]
    pub listener: ListenerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub decoder: DecoderSection,
    #[serde(default)]
    pub output: OutputSection,
    /// Field metadata, one `[[fields]]` table per descriptor.
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

impl ListenerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ListenerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ListenerError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Field ids are checked here so a bad `[[fields]]` entry fails early.
    pub fn parse(s: &str) -> Result<Self, ListenerError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| ListenerError::Config(format!("failed to parse config: {e}")))?;
        config.descriptors()?;
        Ok(config)
    }

    /// The `[[fields]]` entries as enrichment descriptors, in file order.
    pub fn descriptors(&self) -> Result<Vec<EnricherDescriptor>, ListenerError> {
        self.fields.iter().map(FieldEntry::to_descriptor).collect()
    }

    pub fn catalog(&self) -> Result<EnrichmentCatalog, ListenerError> {
        Ok(EnrichmentCatalog::from_descriptors(self.descriptors()?))
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            replay_policy: self.decoder.replay_policy.into(),
        }
    }

    pub fn reference_mode(&self) -> ReferenceMode {
        self.decoder.reference_mode.into()
    }
}

/// The `[listener]` section: where frames come from.
///
/// `command` wins over `input`; with neither, stdin is read.
#[derive(Debug, Default, Deserialize)]
pub struct ListenerSection {
    /// Bridge command whose stdout is parsed, e.g. `tunslip6 -s /dev/ttyUSB0 aaaa::1/64 -v5`.
    pub command: Option<String>,
    /// Captured bridge output to replay.
    pub input: Option<PathBuf>,
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `[decoder]` section.
#[derive(Debug, Default, Deserialize)]
pub struct DecoderSection {
    #[serde(default)]
    pub replay_policy: ReplayPolicySetting,
    #[serde(default)]
    pub reference_mode: ReferenceModeSetting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicySetting {
    #[default]
    Compatible,
    Strict,
}

impl From<ReplayPolicySetting> for ReplayPolicy {
    fn from(setting: ReplayPolicySetting) -> Self {
        match setting {
            ReplayPolicySetting::Compatible => ReplayPolicy::Compatible,
            ReplayPolicySetting::Strict => ReplayPolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceModeSetting {
    #[default]
    LastObserved,
    Placeholder,
}

impl From<ReferenceModeSetting> for ReferenceMode {
    fn from(setting: ReferenceModeSetting) -> Self {
        match setting {
            ReferenceModeSetting::LastObserved => ReferenceMode::LastObserved,
            ReferenceModeSetting::Placeholder => ReferenceMode::Placeholder,
        }
    }
}

/// The `[output]` section. Console output is always on.
#[derive(Debug, Default, Deserialize)]
pub struct OutputSection {
    /// File the reports are appended to.
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// A numeric id written either as an integer or as a string, `0x` for hex.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumericId {
    Int(u64),
    Text(String),
}

impl NumericId {
    pub fn resolve(&self) -> Result<u64, ListenerError> {
        match self {
            NumericId::Int(v) => Ok(*v),
            NumericId::Text(s) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse(),
                };
                parsed.map_err(|e| ListenerError::Config(format!("invalid numeric id {s:?}: {e}")))
            }
        }
    }
}

/// A `[[fields]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    pub field_id: NumericId,
    pub enterprise_number: Option<NumericId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: String,
    pub unit: Option<String>,
    pub expression: Option<String>,
    /// Expression alias -> type of the referenced field.
    #[serde(default)]
    pub references: BTreeMap<String, String>,
}

impl FieldEntry {
    pub fn to_descriptor(&self) -> Result<EnricherDescriptor, ListenerError> {
        let raw_id = self.field_id.resolve()?;
        let field_id = u16::try_from(raw_id).map_err(|_| {
            ListenerError::Config(format!("field id {raw_id} does not fit in 16 bits"))
        })?;
        let enterprise_number = match &self.enterprise_number {
            Some(en) => en.resolve()?,
            None => 0,
        };

        let mut descriptor = EnricherDescriptor::new(field_id, &self.name, &self.field_type)
            .enterprise_number(enterprise_number);
        if let Some(unit) = &self.unit {
            descriptor = descriptor.unit(unit);
        }
        if let Some(expression) = &self.expression {
            descriptor = descriptor.expression(expression);
        }
        for (alias, field_type) in &self.references {
            descriptor = descriptor.reference(alias, field_type);
        }
        Ok(descriptor)
    }
}
