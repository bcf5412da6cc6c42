//! Metric path construction
//!
//! Paths follow the dot hierarchy
//! `nomad.<region>.<datacenter>.<host>.<Field>_<category>`.

use crate::models::{Category, Metric, NodeIdentity, ResourceField, ResourceSnapshot};

/// Leading path segment of every metric
pub const METRIC_NAMESPACE: &str = "nomad";

/// Replace dots so a FQDN stays a single path segment
pub fn sanitize_hostname(hostname: &str) -> String {
    hostname.replace('.', "_")
}

/// Prefix shared by the metrics of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPrefix(String);

impl MetricPrefix {
    pub fn new(identity: &NodeIdentity, hostname: &str) -> Self {
        Self(format!(
            "{}.{}.{}.{}",
            METRIC_NAMESPACE,
            identity.region,
            identity.datacenter,
            sanitize_hostname(hostname)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn metric_name(&self, field: ResourceField, category: Category) -> String {
        format!("{}.{}_{}", self.0, field.label(), category.label())
    }
}

/// The eight metrics of a run: totals first, then allocated
pub fn build_metrics(snapshot: &ResourceSnapshot, prefix: &MetricPrefix) -> Vec<Metric> {
    [
        (Category::Total, &snapshot.total),
        (Category::Allocated, &snapshot.allocated),
    ]
    .iter()
    .flat_map(|(category, quantity)| {
        quantity.fields().into_iter().map(move |(field, value)| {
            Metric::new(
                prefix.metric_name(field, *category),
                value,
                snapshot.observed_at,
            )
        })
    })
    .collect()
}
