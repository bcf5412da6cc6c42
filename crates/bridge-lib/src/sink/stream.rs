//! Graphite plaintext sink over TCP

use super::{format_line, MetricSink};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Bound on establishing the collector connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink holding one outbound connection for the lifetime of a run
///
/// The connection is released by `close()` or, failing that, when the sink
/// is dropped.
pub struct StreamSink {
    addr: String,
    stream: Option<TcpStream>,
    lines_written: usize,
}

impl StreamSink {
    /// Resolve `addr` and connect, giving up after `connect_timeout`
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(BridgeError::Connect {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(BridgeError::Connect {
                    addr: addr.to_string(),
                    source: io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no connection after {:?}", connect_timeout),
                    ),
                })
            }
        };

        debug!(addr = %addr, "Connected to metrics collector");

        Ok(Self {
            addr: addr.to_string(),
            stream: Some(stream),
            lines_written: 0,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }
}

#[async_trait]
impl MetricSink for StreamSink {
    async fn write_metric(
        &mut self,
        name: &str,
        value: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let line = format_line(name, value, timestamp);
        debug!(line = %line.trim_end(), "Writing metric");

        let stream = self.stream.as_mut().ok_or_else(|| BridgeError::Delivery {
            metric: name.to_string(),
            source: io::Error::new(io::ErrorKind::NotConnected, "sink already closed"),
        })?;

        let delivery = |source: io::Error| BridgeError::Delivery {
            metric: name.to_string(),
            source,
        };
        stream.write_all(line.as_bytes()).await.map_err(delivery)?;
        stream.flush().await.map_err(delivery)?;

        self.lines_written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        match stream.shutdown().await {
            Ok(()) => {
                debug!(addr = %self.addr, lines = self.lines_written, "Closed collector connection");
                Ok(())
            }
            // Peer already went away; the socket is released either way
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                warn!(addr = %self.addr, error = %e, "Collector connection already closed");
                Ok(())
            }
            Err(source) => Err(BridgeError::Delivery {
                metric: "<close>".to_string(),
                source,
            }),
        }
    }
}
