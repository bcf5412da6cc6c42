//! Metric delivery
//!
//! This module provides sinks that accept one named, timestamped integer at a
//! time. The Graphite sink writes the plaintext protocol to a TCP stream; the
//! logging sink renders the same lines to the log for dry runs.

mod logging;
mod stream;


pub use logging::LoggingSink;
pub use stream::{StreamSink, DEFAULT_CONNECT_TIMEOUT};

use crate::error::Result;
use crate::models::Metric;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

pub use async_trait::async_trait;

/// Trait for metric sink implementations
#[async_trait]
pub trait MetricSink: Send {
    /// Deliver a single metric
    async fn write_metric(&mut self, name: &str, value: i64, timestamp: DateTime<Utc>)
        -> Result<()>;

    /// Release the sink's resources. Calling it again is a no-op.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write(&mut self, metric: &Metric) -> Result<()> {
        self.write_metric(&metric.name, metric.value, metric.timestamp)
            .await
    }
}

/// Render one plaintext protocol line: `<path> <value> <unix-seconds>\n`
///
/// Every sink formats through here so their output is byte-identical.
pub fn format_line(name: &str, value: i64, timestamp: DateTime<Utc>) -> String {
    format!("{} {} {}\n", name, value, timestamp.timestamp())
}

/// Where a run delivers its metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Carbon plaintext listener, `host:port`
    Graphite {
        addr: String,
        connect_timeout: Duration,
    },
    /// Log lines locally instead of sending them
    Log,
}

impl SinkTarget {
    pub fn graphite(addr: impl Into<String>) -> Self {
        SinkTarget::Graphite {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Open the sink this target describes
    pub async fn open(&self) -> Result<Box<dyn MetricSink>> {
        match self {
            SinkTarget::Graphite {
                addr,
                connect_timeout,
            } => {
                tracing::info!(addr = %addr, "Connecting to Graphite");
                let sink = StreamSink::connect(addr, *connect_timeout).await?;
                Ok(Box::new(sink))
            }
            SinkTarget::Log => {
                tracing::info!("Dry run, metrics will only be logged");
                Ok(Box::new(LoggingSink::new()))
            }
        }
    }
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Graphite { addr, .. } => write!(f, "graphite://{}", addr),
            SinkTarget::Log => write!(f, "log"),
        }
    }
}

/// Write metrics in order, stopping at the first failure
pub async fn emit_all(sink: &mut dyn MetricSink, metrics: &[Metric]) -> Result<usize> {
    for metric in metrics {
        sink.write(metric).await?;
    }
    Ok(metrics.len())
}
