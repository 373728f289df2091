//! TinyIPFIX collector for sensor networks bridged with tunslip6.
//!
//! Reads the bridge's verbose output, pulls the UDP payload and source
//! address out of every forwarded datagram, decodes it and writes the
//! enriched fields to the console and an optional dump file.

pub mod collector;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod runner;
pub mod sink;

use std::sync::Arc;

pub use collector::{Collector, PacketReport};
pub use config::ListenerConfig;
pub use error::{FeedError, ListenerError};
pub use feed::{Frame, TunslipLineParser};
pub use runner::{FeedSource, RunStats, Runner};
pub use sink::{OutputFormat, Sink};

/// Build the collector and sink described by `config` and run until the
/// feed closes or Ctrl-C is received.
pub async fn run(config: ListenerConfig) -> Result<RunStats, ListenerError> {
    let catalog = Arc::new(config.catalog()?);
    tracing::info!(descriptors = catalog.len(), "enrichment catalog loaded");

    let collector = Collector::new(catalog)
        .with_decoder_options(config.decoder_options())
        .with_reference_mode(config.reference_mode());

    let mut sink = Sink::new(config.output.format).with_stdout();
    if let Some(path) = &config.output.path {
        sink = sink.with_file(path).await?;
        tracing::info!(path = %path.display(), "appending reports");
    }

    let mut runner = Runner::new(collector, sink);
    runner.run(FeedSource::from_config(&config.listener)).await
}
