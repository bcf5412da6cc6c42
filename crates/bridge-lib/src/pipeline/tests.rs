//! End-to-end run tests with a fake Nomad agent

use super::*;
use crate::error::BridgeError;
use crate::models::{Allocation, NodeResources, ResourceQuantity};
use crate::nomad::AgentSelf;
use async_trait::async_trait;
use serde_json::json;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// In-memory agent that records the queries it answers
struct FakeApi {
    agent: AgentSelf,
    node: NodeResources,
    allocations: Vec<Allocation>,
    fail_allocations: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn scenario() -> Self {
        Self {
            agent: AgentSelf {
                stats: json!({"client": {"node_id": "n1"}}),
                config: json!({"Region": "us-east", "Datacenter": "dc1"}),
            },
            node: NodeResources {
                resources: ResourceQuantity::new(4000, 8192, 100000, 0),
                reserved: Some(ResourceQuantity::new(100, 512, 0, 0)),
            },
            allocations: vec![
                Allocation::new("running", ResourceQuantity::new(500, 1024, 0, 0)),
                Allocation::new("complete", ResourceQuantity::new(9999, 4096, 2000, 50)),
            ],
            fail_allocations: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterApi for FakeApi {
    async fn self_info(&self) -> Result<AgentSelf> {
        self.calls.lock().unwrap().push("self".to_string());
        Ok(self.agent.clone())
    }

    async fn node_info(&self, node_id: &str) -> Result<NodeResources> {
        self.calls.lock().unwrap().push(format!("node:{}", node_id));
        Ok(self.node.clone())
    }

    async fn node_allocations(&self, node_id: &str) -> Result<Vec<Allocation>> {
        self.calls.lock().unwrap().push(format!("allocations:{}", node_id));
        if self.fail_allocations {
            return Err(BridgeError::query(
                "node allocations",
                "API error (500 Internal Server Error): rpc error",
            ));
        }
        Ok(self.allocations.clone())
    }
}

/// Sink that keeps every metric and optionally fails at a given write
#[derive(Default)]
struct RecordingSink {
    metrics: Vec<Metric>,
    fail_at: Option<usize>,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn write_metric(
        &mut self,
        name: &str,
        value: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_at == Some(self.metrics.len()) {
            return Err(BridgeError::Delivery {
                metric: name.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"),
            });
        }
        self.metrics.push(Metric::new(name, value, timestamp));
        Ok(())
    }
}

#[tokio::test]
async fn test_collect_scenario() {
    let api = FakeApi::scenario();
    let snapshot = Pipeline::new("host1").collect(&api).await.unwrap();

    assert_eq!(snapshot.identity.node_id, "n1");
    assert_eq!(snapshot.identity.region, "us-east");
    assert_eq!(snapshot.identity.datacenter, "dc1");
    assert_eq!(snapshot.total, ResourceQuantity::new(3900, 7680, 100000, 0));
    assert_eq!(snapshot.allocated, ResourceQuantity::new(500, 1024, 0, 0));
    assert_eq!(api.calls(), vec!["self", "node:n1", "allocations:n1"]);
}

#[tokio::test]
async fn test_collect_without_reservation() {
    let mut api = FakeApi::scenario();
    api.node.reserved = None;
    let snapshot = Pipeline::new("host1").collect(&api).await.unwrap();
    assert_eq!(snapshot.total, ResourceQuantity::new(4000, 8192, 100000, 0));
}

#[tokio::test]
async fn test_collect_with_identified_allocations() {
    let mut api = FakeApi::scenario();
    api.allocations = serde_json::from_value(json!([
        {"ID": "a1", "ClientStatus": "running", "Resources": {"CPU": 500, "MemoryMB": 1024}},
        {"ID": "a2", "ClientStatus": "complete", "Resources": {"CPU": 9999}},
        {"ClientStatus": "running", "Resources": {"CPU": 250, "IOPS": 5}}
    ]))
    .unwrap();

    let snapshot = Pipeline::new("host1").collect(&api).await.unwrap();
    assert_eq!(snapshot.allocated, ResourceQuantity::new(750, 1024, 0, 5));
}

#[tokio::test]
async fn test_emit_writes_eight_metrics_with_one_timestamp() {
    let api = FakeApi::scenario();
    let pipeline = Pipeline::new("worker.example.com");
    let snapshot = pipeline.collect(&api).await.unwrap();

    let mut sink = RecordingSink::default();
    let written = pipeline.emit(&snapshot, &mut sink).await.unwrap();

    assert_eq!(written, 8);
    assert_eq!(sink.metrics.len(), 8);
    assert!(sink
        .metrics
        .iter()
        .all(|m| m.timestamp == snapshot.observed_at));
    assert!(sink
        .metrics
        .iter()
        .all(|m| m.name.starts_with("nomad.us-east.dc1.worker_example_com.")));
    assert_eq!(sink.metrics[0].name, "nomad.us-east.dc1.worker_example_com.CPU_total");
    assert_eq!(sink.metrics[0].value, 3900);
    assert_eq!(sink.metrics[5].name, "nomad.us-east.dc1.worker_example_com.MemoryMB_allocated");
    assert_eq!(sink.metrics[5].value, 1024);
}

#[tokio::test]
async fn test_missing_node_id_aborts_before_sink_is_touched() {
    let mut api = FakeApi::scenario();
    api.agent.stats = json!({"client": {}});
    let pipeline = Pipeline::new("host1");

    let (listener, addr) = bind().await;
    let target = SinkTarget::Graphite {
        addr,
        connect_timeout: Duration::from_secs(5),
    };

    let err = pipeline.run(&api, &target).await.unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
    assert_eq!(api.calls(), vec!["self"]);

    // The collector never saw a connection, so it received zero writes
    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err());
}

#[tokio::test]
async fn test_query_failure_aborts_before_sink_is_opened() {
    let mut api = FakeApi::scenario();
    api.fail_allocations = true;

    let (listener, addr) = bind().await;
    let target = SinkTarget::Graphite {
        addr,
        connect_timeout: Duration::from_secs(5),
    };

    let err = Pipeline::new("host1").run(&api, &target).await.unwrap_err();
    assert!(matches!(err, BridgeError::Query { .. }));

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err());
}

#[tokio::test]
async fn test_delivery_failure_stops_the_sequence() {
    let api = FakeApi::scenario();
    let pipeline = Pipeline::new("host1");
    let snapshot = pipeline.collect(&api).await.unwrap();

    let mut sink = RecordingSink {
        fail_at: Some(3),
        ..Default::default()
    };
    let err = pipeline.emit(&snapshot, &mut sink).await.unwrap_err();

    assert_eq!(sink.metrics.len(), 3);
    match err {
        BridgeError::Delivery { metric, .. } => {
            assert_eq!(metric, "nomad.us-east.dc1.host1.IOPS_total")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_run_delivers_full_metric_set_to_collector() {
    let api = FakeApi::scenario();
    let (listener, addr) = bind().await;
    let target = SinkTarget::Graphite {
        addr,
        connect_timeout: Duration::from_secs(5),
    };

    let reader = tokio::spawn(async move {
        let (mut peer, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        received
    });

    let summary = Pipeline::new("host1").run(&api, &target).await.unwrap();
    let received = reader.await.unwrap();

    assert_eq!(summary.metrics_written, 8);
    assert_eq!(summary.identity.node_id, "n1");

    let ts = summary.observed_at.timestamp();
    let expected: String = [
        ("CPU_total", 3900),
        ("MemoryMB_total", 7680),
        ("DiskMB_total", 100000),
        ("IOPS_total", 0),
        ("CPU_allocated", 500),
        ("MemoryMB_allocated", 1024),
        ("DiskMB_allocated", 0),
        ("IOPS_allocated", 0),
    ]
    .iter()
    .map(|(suffix, value)| format!("nomad.us-east.dc1.host1.{} {} {}\n", suffix, value, ts))
    .collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_run_with_log_target() {
    let api = FakeApi::scenario();
    let summary = Pipeline::new("host1")
        .run(&api, &SinkTarget::Log)
        .await
        .unwrap();
    assert_eq!(summary.metrics_written, 8);
}

#[tokio::test]
async fn test_unreachable_collector_after_successful_queries() {
    let api = FakeApi::scenario();
    let (listener, addr) = bind().await;
    drop(listener);

    let err = Pipeline::new("host1")
        .run(&api, &SinkTarget::graphite(addr))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Connect { .. }));
    assert_eq!(api.calls().len(), 3);
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}
