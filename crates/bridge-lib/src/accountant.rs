//! Resource accounting for a single node
//!
//! Turns the node record and its allocation list into the two figures the
//! bridge reports: capacity available to schedulers, and the share of it held
//! by allocations that are actually running.

use crate::models::{Allocation, ResourceQuantity};

/// The only client status counted towards allocated capacity
pub const RUNNING_STATUS: &str = "running";

/// Declared capacity minus reserved capacity
///
/// An absent reservation counts as zero. Results are not clamped, so an
/// over-reserved node reports negative figures.
pub fn compute_total_available(
    resources: &ResourceQuantity,
    reserved: Option<&ResourceQuantity>,
) -> ResourceQuantity {
    let reserved = reserved.copied().unwrap_or_default();
    *resources - reserved
}

/// Component-wise sum over allocations whose status is exactly `running`
///
/// Pending, complete, failed, lost and any status not known today are
/// skipped.
pub fn compute_allocated(allocations: &[Allocation]) -> ResourceQuantity {
    allocations
        .iter()
        .filter(|alloc| alloc.client_status == RUNNING_STATUS)
        .fold(ResourceQuantity::zero(), |acc, alloc| acc + alloc.resources)
}
