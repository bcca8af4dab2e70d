//! Core data models for cluster sizing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bytes in one GiB
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Workload controller kinds that contribute to cluster demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    /// Number of pod copies counted toward cluster demand.
    ///
    /// DaemonSets are counted once per workload object, not once per node they
    /// are scheduled on. This undercounts DaemonSet demand on multi-node
    /// clusters and is reported as a notice rather than corrected.
    pub fn effective_replica_count(self, declared_replicas: u32) -> u32 {
        match self {
            WorkloadKind::Deployment | WorkloadKind::StatefulSet => declared_replicas,
            WorkloadKind::DaemonSet => 1,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        };
        f.write_str(name)
    }
}

/// Resource declarations of a single container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerResources {
    #[serde(default)]
    pub cpu_request_millicores: u64,
    #[serde(default)]
    pub cpu_limit_millicores: u64,
    #[serde(default)]
    pub memory_request_bytes: u64,
    #[serde(default)]
    pub memory_limit_bytes: u64,
}

/// A workload as enumerated from the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDescriptor {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    /// Declared replicas (ignored for DaemonSets)
    #[serde(default = "default_replica_count")]
    pub replica_count: u32,
    #[serde(default)]
    pub containers: Vec<ContainerResources>,
}

fn default_replica_count() -> u32 {
    1
}

/// Per-workload resource usage after replica scaling rules are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadResourceUsage {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub effective_replica_count: u32,
    /// Per-pod sums across all containers
    pub cpu_request_millicores: u64,
    pub cpu_limit_millicores: u64,
    pub memory_request_bytes: u64,
    pub memory_limit_bytes: u64,
}

impl WorkloadResourceUsage {
    /// Sum container declarations of a workload's pod template
    pub fn from_descriptor(workload: &WorkloadDescriptor) -> Self {
        let mut usage = Self {
            kind: workload.kind,
            namespace: workload.namespace.clone(),
            name: workload.name.clone(),
            effective_replica_count: workload.kind.effective_replica_count(workload.replica_count),
            cpu_request_millicores: 0,
            cpu_limit_millicores: 0,
            memory_request_bytes: 0,
            memory_limit_bytes: 0,
        };

        // Snapshot input is untrusted; sums saturate instead of wrapping
        for container in &workload.containers {
            usage.cpu_request_millicores = usage
                .cpu_request_millicores
                .saturating_add(container.cpu_request_millicores);
            usage.cpu_limit_millicores = usage
                .cpu_limit_millicores
                .saturating_add(container.cpu_limit_millicores);
            usage.memory_request_bytes = usage
                .memory_request_bytes
                .saturating_add(container.memory_request_bytes);
            usage.memory_limit_bytes = usage
                .memory_limit_bytes
                .saturating_add(container.memory_limit_bytes);
        }

        usage
    }

    /// True when no container declares a CPU or memory request
    pub fn has_zero_requests(&self) -> bool {
        self.cpu_request_millicores == 0 && self.memory_request_bytes == 0
    }

    /// `namespace/name` identifier
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// CPU and memory pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTotals {
    pub cpu_cores: f64,
    pub memory_bytes: u64,
}

impl ResourceTotals {
    pub fn memory_gib(&self) -> f64 {
        self.memory_bytes as f64 / BYTES_PER_GIB
    }
}

/// Cluster-wide demand summed over all workloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    pub workload_count: usize,
    pub requested: ResourceTotals,
    pub limits: ResourceTotals,
    pub by_kind: BTreeMap<WorkloadKind, ResourceTotals>,
}

/// A node pool as reported by the node-group collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    pub instance_type: String,
    pub current_nodes: u32,
    pub desired_capacity: u32,
    pub min_size: u32,
    pub max_size: u32,
}

/// Current cluster capacity derived from node groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterCapacity {
    pub total_cpu_cores: f64,
    pub total_memory_bytes: u64,
    pub by_nodegroup: Vec<NodeGroup>,
    /// Node groups excluded from the totals because their instance type is not in the catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_nodegroups: Vec<NodeGroup>,
}

impl ClusterCapacity {
    pub fn total_memory_gib(&self) -> f64 {
        self.total_memory_bytes as f64 / BYTES_PER_GIB
    }

    pub fn is_undercounted(&self) -> bool {
        !self.excluded_nodegroups.is_empty()
    }
}

/// A candidate machine shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypeSpec {
    pub name: String,
    pub vcpu: u32,
    pub memory_gib: f64,
    pub family_prefix: String,
}

impl InstanceTypeSpec {
    pub fn new(name: impl Into<String>, vcpu: u32, memory_gib: f64) -> Self {
        let name = name.into();
        let family_prefix = name.split('.').next().unwrap_or_default().to_string();
        Self {
            name,
            vcpu,
            memory_gib,
            family_prefix,
        }
    }

    /// Shape size used to prefer larger (or smaller) shapes on ties
    pub fn shape_size(&self) -> f64 {
        self.vcpu as f64 * self.memory_gib
    }
}

/// Where a price quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingSource {
    Authoritative,
    Community,
    Unavailable,
}

impl fmt::Display for PricingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PricingSource::Authoritative => "authoritative",
            PricingSource::Community => "community",
            PricingSource::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// On-demand hourly rate for one instance type in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingQuote {
    pub instance_type: String,
    pub region: String,
    pub hourly_usd: f64,
    pub source: PricingSource,
}

impl PricingQuote {
    pub fn unavailable(instance_type: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            region: region.into(),
            hourly_usd: 0.0,
            source: PricingSource::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        self.source != PricingSource::Unavailable
    }
}

/// Headroom-adjusted demand the recommendation must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequiredResources {
    pub cpu_cores: f64,
    pub memory_gib: f64,
    pub headroom_fraction: f64,
}

impl RequiredResources {
    /// `required = requested * (1 + headroom_fraction)`
    pub fn from_requested(requested: &ResourceTotals, headroom_fraction: f64) -> Self {
        let factor = 1.0 + headroom_fraction;
        Self {
            cpu_cores: requested.cpu_cores * factor,
            memory_gib: requested.memory_gib() * factor,
            headroom_fraction,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.cpu_cores <= 0.0 && self.memory_gib <= 0.0
    }
}

/// A sized and priced node-pool option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub instance_type: String,
    pub node_count: u32,
    pub total_cpu_cores: f64,
    pub total_memory_gib: f64,
    pub cpu_waste_pct: f64,
    pub memory_waste_pct: f64,
    pub avg_waste_pct: f64,
    pub pricing: PricingQuote,
    pub hourly_cost: f64,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
}

/// The engine's output: best candidate plus ranked alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended: RecommendationCandidate,
    /// Top-ranked candidates in order, the recommended one first
    pub alternatives: Vec<RecommendationCandidate>,
}
