//! Async line pump from the bridge to the sink.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::collector::Collector;
use crate::config::ListenerSection;
use crate::error::ListenerError;
use crate::feed::TunslipLineParser;
use crate::sink::Sink;

/// Where bridge output is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Spawn the bridge and read its stdout.
    Command(String),
    /// Replay captured bridge output.
    File(PathBuf),
    Stdin,
}

impl FeedSource {
    pub fn from_config(section: &ListenerSection) -> Self {
        match (&section.command, &section.input) {
            (Some(command), _) => FeedSource::Command(command.clone()),
            (None, Some(path)) => FeedSource::File(path.clone()),
            (None, None) => FeedSource::Stdin,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub lines: u64,
    pub frames: u64,
    pub reports: u64,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct Runner {
    collector: Collector,
    sink: Sink,
    parser: TunslipLineParser,
}

impl Runner {
    pub fn new(collector: Collector, sink: Sink) -> Self {
        Self {
            collector,
            sink,
            parser: TunslipLineParser::new(),
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Read `source` until EOF or Ctrl-C.
    pub async fn run(&mut self, source: FeedSource) -> Result<RunStats, ListenerError> {
        tracing::info!(?source, "listening");
        let stats = match source {
            FeedSource::Command(command) => {
                let mut parts = command.split_whitespace();
                let program = parts
                    .next()
                    .ok_or_else(|| ListenerError::Config("empty bridge command".into()))?;
                let mut child = Command::new(program)
                    .args(parts)
                    .stdout(Stdio::piped())
                    .stdin(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()?;
                let stdout = child
                    .stdout
                    .take()
                    .ok_or_else(|| ListenerError::Config("bridge stdout not captured".into()))?;
                let result = self.pump(BufReader::new(stdout)).await;
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "bridge already exited");
                }
                result?
            }
            FeedSource::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                self.pump(BufReader::new(file)).await?
            }
            FeedSource::Stdin => self.pump(BufReader::new(tokio::io::stdin())).await?,
        };
        tracing::info!(
            lines = stats.lines,
            frames = stats.frames,
            reports = stats.reports,
            dropped = stats.dropped,
            "feed closed"
        );
        Ok(stats)
    }

    /// Process lines from `reader` until EOF or Ctrl-C.
    pub async fn pump<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<RunStats, ListenerError> {
        let mut lines = reader.lines();
        let mut stats = RunStats::default();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut ctrl_c => {
                    tracing::info!("received SIGINT, shutting down");
                    break;
                }
            };
            let Some(line) = line else { break };
            stats.lines += 1;
            self.handle_line(&line, &mut stats).await?;
        }
        Ok(stats)
    }

    async fn handle_line(&mut self, line: &str, stats: &mut RunStats) -> Result<(), ListenerError> {
        let frame = match self.parser.push_line(line) {
            None => return Ok(()),
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "skipping unreadable datagram dump");
                stats.dropped += 1;
                return Ok(());
            }
        };

        stats.frames += 1;
        tracing::trace!(source = %frame.source, payload = %hex::encode(&frame.payload), "frame received");
        match self.collector.process(&frame.payload, frame.source) {
            Ok(report) => {
                self.sink.write(&report).await?;
                stats.reports += 1;
            }
            Err(e) => {
                tracing::warn!(source = %frame.source, error = %e, "packet dropped");
                stats.dropped += 1;
            }
        }
        Ok(())
    }
}
