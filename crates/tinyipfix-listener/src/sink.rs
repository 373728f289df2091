//! Console and file output of packet reports.

use std::path::Path;

use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::collector::PacketReport;
use crate::error::ListenerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Decode log followed by one line per enriched field.
    #[default]
    Text,
    /// One JSON object per packet.
    Json,
}

/// Writes every report to each configured writer in turn.
pub struct Sink {
    format: OutputFormat,
    writers: Vec<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl Sink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            writers: Vec::new(),
        }
    }

    pub fn with_stdout(self) -> Self {
        self.with_writer(tokio::io::stdout())
    }

    pub fn with_writer(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.writers.push(Box::new(writer));
        self
    }

    /// Also append to `path`, creating it if needed.
    pub async fn with_file(self, path: &Path) -> Result<Self, ListenerError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(self.with_writer(file))
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(&self, report: &PacketReport) -> Result<String, ListenerError> {
        match self.format {
            OutputFormat::Text => {
                let mut out = String::with_capacity(report.decode_log.len() + report.enrich_log.len() + 1);
                out.push_str(&report.decode_log);
                out.push_str(&report.enrich_log);
                out.push('\n');
                Ok(out)
            }
            OutputFormat::Json => {
                let mut out = serde_json::to_string(report)?;
                out.push('\n');
                Ok(out)
            }
        }
    }

    pub async fn write(&mut self, report: &PacketReport) -> Result<(), ListenerError> {
        let rendered = self.render(report)?;
        for writer in &mut self.writers {
            writer.write_all(rendered.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("format", &self.format)
            .field("writers", &self.writers.len())
            .finish()
    }
}
