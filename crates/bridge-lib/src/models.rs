//! Core data models for the bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// Resource figures in the shape Nomad reports them
///
/// Values are signed: a node reserving more than it declares yields a
/// negative available figure, which is passed through as-is. Arithmetic
/// wraps on overflow in every build profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantity {
    #[serde(rename = "CPU", default)]
    pub cpu: i64,
    #[serde(rename = "MemoryMB", default)]
    pub memory_mb: i64,
    #[serde(rename = "DiskMB", default)]
    pub disk_mb: i64,
    #[serde(rename = "IOPS", default)]
    pub iops: i64,
}

impl ResourceQuantity {
    pub fn new(cpu: i64, memory_mb: i64, disk_mb: i64, iops: i64) -> Self {
        Self {
            cpu,
            memory_mb,
            disk_mb,
            iops,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Each dimension paired with its field, in reporting order
    pub fn fields(&self) -> [(ResourceField, i64); 4] {
        [
            (ResourceField::Cpu, self.cpu),
            (ResourceField::MemoryMb, self.memory_mb),
            (ResourceField::DiskMb, self.disk_mb),
            (ResourceField::Iops, self.iops),
        ]
    }
}

impl Add for ResourceQuantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cpu: self.cpu.wrapping_add(rhs.cpu),
            memory_mb: self.memory_mb.wrapping_add(rhs.memory_mb),
            disk_mb: self.disk_mb.wrapping_add(rhs.disk_mb),
            iops: self.iops.wrapping_add(rhs.iops),
        }
    }
}

impl AddAssign for ResourceQuantity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ResourceQuantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            cpu: self.cpu.wrapping_sub(rhs.cpu),
            memory_mb: self.memory_mb.wrapping_sub(rhs.memory_mb),
            disk_mb: self.disk_mb.wrapping_sub(rhs.disk_mb),
            iops: self.iops.wrapping_sub(rhs.iops),
        }
    }
}

/// One reported resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceField {
    Cpu,
    MemoryMb,
    DiskMb,
    Iops,
}

impl ResourceField {
    /// Label used in the metric path
    pub fn label(&self) -> &'static str {
        match self {
            ResourceField::Cpu => "CPU",
            ResourceField::MemoryMb => "MemoryMB",
            ResourceField::DiskMb => "DiskMB",
            ResourceField::Iops => "IOPS",
        }
    }
}

/// Whether a figure is node capacity or the running allocations' share of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Total,
    Allocated,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Total => "total",
            Category::Allocated => "allocated",
        }
    }
}

/// Which Nomad client node this run reports for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_id: String,
    pub region: String,
    pub datacenter: String,
}

/// Declared and reserved capacity from the node record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeResources {
    #[serde(rename = "Resources", default)]
    pub resources: ResourceQuantity,
    #[serde(rename = "Reserved", default)]
    pub reserved: Option<ResourceQuantity>,
}

/// Allocation placed on the node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "ClientStatus", default)]
    pub client_status: String,
    #[serde(rename = "Resources", default)]
    pub resources: ResourceQuantity,
}

impl Allocation {
    pub fn new(client_status: impl Into<String>, resources: ResourceQuantity) -> Self {
        Self {
            id: None,
            client_status: client_status.into(),
            resources,
        }
    }
}

/// A single named, timestamped sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: String,
    pub value: i64,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }

    /// Plaintext protocol line, newline terminated
    pub fn line(&self) -> String {
        crate::sink::format_line(&self.name, self.value, self.timestamp)
    }
}

/// Figures computed for one node in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub identity: NodeIdentity,
    pub total: ResourceQuantity,
    pub allocated: ResourceQuantity,
    /// Observation instant shared by every metric of the run
    pub observed_at: DateTime<Utc>,
}
