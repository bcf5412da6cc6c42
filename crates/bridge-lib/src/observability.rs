//! Structured run events
//!
//! Every event carries an `event` field so JSON log output can be filtered
//! without parsing messages.

use crate::models::{NodeIdentity, ResourceQuantity};
use tracing::{error, info};

/// Structured logger for bridge run events
#[derive(Clone)]
pub struct StructuredLogger {
    hostname: String,
}

impl StructuredLogger {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    /// Log the start of a run
    pub fn log_startup(&self, version: &str, nomad_addr: &str, destination: &str) {
        info!(
            event = "run_started",
            host = %self.hostname,
            version = %version,
            nomad_addr = %nomad_addr,
            destination = %destination,
            "Starting nomad-graphite run"
        );
    }

    pub fn log_identity(&self, identity: &NodeIdentity) {
        info!(
            event = "identity_resolved",
            host = %self.hostname,
            node_id = %identity.node_id,
            region = %identity.region,
            datacenter = %identity.datacenter,
            "Resolved Nomad client node"
        );
    }

    /// Log the computed figures before they are emitted
    pub fn log_resources(
        &self,
        node_id: &str,
        total: &ResourceQuantity,
        allocated: &ResourceQuantity,
        allocations_seen: usize,
        allocations_running: usize,
    ) {
        info!(
            event = "resources_computed",
            host = %self.hostname,
            node_id = %node_id,
            total_cpu = total.cpu,
            total_memory_mb = total.memory_mb,
            total_disk_mb = total.disk_mb,
            total_iops = total.iops,
            allocated_cpu = allocated.cpu,
            allocated_memory_mb = allocated.memory_mb,
            allocated_disk_mb = allocated.disk_mb,
            allocated_iops = allocated.iops,
            allocations_seen = allocations_seen,
            allocations_running = allocations_running,
            "Computed node resources"
        );
    }

    pub fn log_run_complete(&self, node_id: &str, metrics_written: usize, observed_at: i64) {
        info!(
            event = "run_completed",
            host = %self.hostname,
            node_id = %node_id,
            metrics_written = metrics_written,
            observed_at = observed_at,
            "Run complete"
        );
    }

    /// Log a fatal failure, including the cause chain
    pub fn log_failure(&self, err: &(dyn std::error::Error + 'static)) {
        let mut chain = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        error!(
            event = "run_failed",
            host = %self.hostname,
            error = %chain.join(": "),
            "Run failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[test]
    fn test_logger_creation() {
        let logger = StructuredLogger::new("worker-1");
        assert_eq!(logger.hostname, "worker-1");
    }

    #[test]
    fn test_log_methods_do_not_panic() {
        let logger = StructuredLogger::new("worker-1");
        let identity = NodeIdentity {
            node_id: "n1".to_string(),
            region: "global".to_string(),
            datacenter: "dc1".to_string(),
        };

        logger.log_startup("0.1.0", "http://127.0.0.1:4646", "127.0.0.1:2003");
        logger.log_identity(&identity);
        logger.log_resources(
            "n1",
            &ResourceQuantity::new(3900, 7680, 100000, 0),
            &ResourceQuantity::new(500, 1024, 0, 0),
            2,
            1,
        );
        logger.log_run_complete("n1", 8, 1_700_000_000);

        let err = BridgeError::query("node", "API error (500): boom");
        logger.log_failure(&err);
    }
}
