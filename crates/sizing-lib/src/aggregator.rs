//! Workload aggregation
//!
//! Reduces enumerated workloads to cluster-wide request and limit totals.
//! An enumeration error anywhere in the sequence aborts the aggregation:
//! totals over a partial workload list would understate demand.

use crate::error::{Result, SizingError};
use crate::models::{
    AggregateTotals, ResourceTotals, WorkloadDescriptor, WorkloadKind, WorkloadResourceUsage,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Collaborator that lists workloads from a cluster (or a snapshot of one)
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    async fn list_workloads(&self) -> anyhow::Result<Vec<WorkloadDescriptor>>;
}

/// Workload source backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticWorkloads(pub Vec<WorkloadDescriptor>);

#[async_trait]
impl WorkloadSource for StaticWorkloads {
    async fn list_workloads(&self) -> anyhow::Result<Vec<WorkloadDescriptor>> {
        Ok(self.0.clone())
    }
}

/// Result of aggregating a workload list
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub totals: AggregateTotals,
    /// Per-workload usage, in enumeration order
    pub usages: Vec<WorkloadResourceUsage>,
    /// `namespace/name` of workloads declaring no CPU or memory requests
    pub zero_request_workloads: Vec<String>,
    /// DaemonSets counted with a single replica
    pub daemonset_count: usize,
}

/// Integer accumulator so totals do not depend on summation order.
///
/// Saturates at `u64::MAX` rather than wrapping.
#[derive(Default, Clone, Copy)]
struct Accumulator {
    cpu_millicores: u64,
    memory_bytes: u64,
}

impl Accumulator {
    fn add(&mut self, cpu_millicores: u64, memory_bytes: u64, replicas: u64) {
        self.cpu_millicores = self
            .cpu_millicores
            .saturating_add(cpu_millicores.saturating_mul(replicas));
        self.memory_bytes = self
            .memory_bytes
            .saturating_add(memory_bytes.saturating_mul(replicas));
    }

    fn totals(self) -> ResourceTotals {
        ResourceTotals {
            cpu_cores: self.cpu_millicores as f64 / 1000.0,
            memory_bytes: self.memory_bytes,
        }
    }
}

/// Aggregate a lazy sequence of workloads.
///
/// The first `Err` item aborts with [`SizingError::WorkloadEnumeration`].
pub fn aggregate<I>(workloads: I) -> Result<Aggregation>
where
    I: IntoIterator<Item = anyhow::Result<WorkloadDescriptor>>,
{
    let mut requested = Accumulator::default();
    let mut limits = Accumulator::default();
    let mut by_kind: BTreeMap<WorkloadKind, Accumulator> = BTreeMap::new();
    let mut aggregation = Aggregation::default();

    for workload in workloads {
        let workload = workload.map_err(SizingError::WorkloadEnumeration)?;
        let usage = WorkloadResourceUsage::from_descriptor(&workload);
        let replicas = u64::from(usage.effective_replica_count);

        requested.add(
            usage.cpu_request_millicores,
            usage.memory_request_bytes,
            replicas,
        );
        limits.add(usage.cpu_limit_millicores, usage.memory_limit_bytes, replicas);
        by_kind.entry(usage.kind).or_default().add(
            usage.cpu_request_millicores,
            usage.memory_request_bytes,
            replicas,
        );

        if usage.kind == WorkloadKind::DaemonSet {
            aggregation.daemonset_count += 1;
        }
        if usage.has_zero_requests() {
            debug!(workload = %usage.qualified_name(), kind = %usage.kind, "Workload declares no resource requests");
            aggregation.zero_request_workloads.push(usage.qualified_name());
        }

        aggregation.usages.push(usage);
    }

    aggregation.totals = AggregateTotals {
        workload_count: aggregation.usages.len(),
        requested: requested.totals(),
        limits: limits.totals(),
        by_kind: by_kind.into_iter().map(|(k, acc)| (k, acc.totals())).collect(),
    };

    Ok(aggregation)
}

/// Enumerate from a source and aggregate
pub async fn collect(source: &dyn WorkloadSource) -> Result<Aggregation> {
    let workloads = source
        .list_workloads()
        .await
        .map_err(SizingError::WorkloadEnumeration)?;
    aggregate(workloads.into_iter().map(Ok))
}
