//! One bridge run: query Nomad, account, emit
//!
//! A run is strictly sequential. Everything that can fail while talking to
//! Nomad happens before the sink is opened, so a run either reaches the
//! collector with its full metric set or never touches it.

#[cfg(test)]
mod tests;

use crate::accountant::{compute_allocated, compute_total_available, RUNNING_STATUS};
use crate::error::Result;
use crate::models::{Metric, NodeIdentity, ResourceSnapshot};
use crate::naming::{build_metrics, MetricPrefix};
use crate::nomad::ClusterApi;
use crate::observability::StructuredLogger;
use crate::sink::{emit_all, MetricSink, SinkTarget};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub identity: NodeIdentity,
    pub metrics_written: usize,
    pub observed_at: DateTime<Utc>,
}

/// Drives a run for the local host
pub struct Pipeline {
    hostname: String,
    logger: StructuredLogger,
}

impl Pipeline {
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let logger = StructuredLogger::new(hostname.clone());
        Self { hostname, logger }
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Resolve the node and compute its figures
    ///
    /// The observation instant is taken after every query has returned.
    pub async fn collect(&self, api: &dyn ClusterApi) -> Result<ResourceSnapshot> {
        let identity = api.self_info().await?.node_identity()?;
        self.logger.log_identity(&identity);

        let node = api.node_info(&identity.node_id).await?;
        let allocations = api.node_allocations(&identity.node_id).await?;
        let observed_at = Utc::now();

        for alloc in &allocations {
            debug!(
                alloc_id = alloc.id.as_deref().unwrap_or("-"),
                status = %alloc.client_status,
                cpu = alloc.resources.cpu,
                memory_mb = alloc.resources.memory_mb,
                "Allocation on node"
            );
        }

        let total = compute_total_available(&node.resources, node.reserved.as_ref());
        let allocated = compute_allocated(&allocations);

        let running = allocations
            .iter()
            .filter(|a| a.client_status == RUNNING_STATUS)
            .count();
        self.logger.log_resources(
            &identity.node_id,
            &total,
            &allocated,
            allocations.len(),
            running,
        );

        Ok(ResourceSnapshot {
            identity,
            total,
            allocated,
            observed_at,
        })
    }

    /// Metrics for a snapshot, named for this host
    pub fn metrics(&self, snapshot: &ResourceSnapshot) -> Vec<Metric> {
        let prefix = MetricPrefix::new(&snapshot.identity, &self.hostname);
        debug!(prefix = %prefix.as_str(), "Built metric prefix");
        build_metrics(snapshot, &prefix)
    }

    /// Write a snapshot's metrics to an open sink
    pub async fn emit(
        &self,
        snapshot: &ResourceSnapshot,
        sink: &mut dyn MetricSink,
    ) -> Result<usize> {
        let metrics = self.metrics(snapshot);
        emit_all(sink, &metrics).await
    }

    /// Full run against the given target
    ///
    /// The sink is closed on every path once it has been opened.
    pub async fn run(&self, api: &dyn ClusterApi, target: &SinkTarget) -> Result<RunSummary> {
        let snapshot = self.collect(api).await?;

        let mut sink = target.open().await?;
        let emitted = self.emit(&snapshot, sink.as_mut()).await;
        if let Err(e) = sink.close().await {
            warn!(error = %e, "Failed to close metric sink");
        }
        let metrics_written = emitted?;

        self.logger.log_run_complete(
            &snapshot.identity.node_id,
            metrics_written,
            snapshot.observed_at.timestamp(),
        );

        Ok(RunSummary {
            identity: snapshot.identity,
            metrics_written,
            observed_at: snapshot.observed_at,
        })
    }
}
