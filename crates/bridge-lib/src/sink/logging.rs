//! Log-only sink for dry runs

use super::{format_line, MetricSink};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// Sink that records lines to the log and never fails
#[derive(Debug, Default)]
pub struct LoggingSink {
    lines: Vec<String>,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines rendered so far, exactly as a network sink would send them
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[async_trait]
impl MetricSink for LoggingSink {
    async fn write_metric(
        &mut self,
        name: &str,
        value: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let line = format_line(name, value, timestamp);
        info!(event = "metric_logged", line = %line.trim_end(), "Metric");
        self.lines.push(line);
        Ok(())
    }
}
