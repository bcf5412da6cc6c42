//! Library behind the Nomad to Graphite bridge
//!
//! This crate provides the core functionality for:
//! - Querying a local Nomad client agent for its node and allocations
//! - Computing available and allocated node resources
//! - Naming and delivering metrics over the Graphite plaintext protocol
//! - Structured logging of run events

pub mod accountant;
pub mod error;
pub mod models;
pub mod naming;
pub mod nomad;
pub mod observability;
pub mod pipeline;
pub mod sink;

pub use error::{BridgeError, Result};
pub use models::*;
pub use nomad::{ClusterApi, NomadClient, TlsSettings};
pub use observability::StructuredLogger;
pub use pipeline::{Pipeline, RunSummary};
pub use sink::{LoggingSink, MetricSink, SinkTarget, StreamSink};
