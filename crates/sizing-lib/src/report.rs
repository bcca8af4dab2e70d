//! Report assembly
//!
//! Turns run results into plain serializable structures. Every exclusion
//! or fallback that affects accuracy becomes a [`Notice`], so nothing is
//! dropped silently between the engine and the presentation layer.

use crate::aggregator::Aggregation;
use crate::models::{
    AggregateTotals, ClusterCapacity, Recommendation, RequiredResources, WorkloadResourceUsage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a notice affects the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The run completed but its accuracy is reduced
    Degraded,
    /// No effect on the result
    Informational,
}

/// An accuracy-relevant observation made during the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Node group excluded from current capacity
    UnknownInstanceType {
        nodegroup: String,
        instance_type: String,
        current_nodes: u32,
    },
    /// Surfaced candidate reported at zero cost because no price was found
    PricingUnavailable { instance_type: String },
    /// DaemonSets counted with a single replica each
    DaemonsetApproximation { daemonsets: usize },
    /// Workloads that declare no requests and contribute nothing
    ZeroRequestWorkloads { workloads: Vec<String> },
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Notice::UnknownInstanceType { .. } | Notice::PricingUnavailable { .. } => {
                Severity::Degraded
            }
            Notice::DaemonsetApproximation { .. } | Notice::ZeroRequestWorkloads { .. } => {
                Severity::Informational
            }
        }
    }

    /// One-line human description
    pub fn message(&self) -> String {
        match self {
            Notice::UnknownInstanceType {
                nodegroup,
                instance_type,
                current_nodes,
            } => format!(
                "node group {} ({} x {}) excluded from capacity: instance type not in catalog",
                nodegroup, current_nodes, instance_type
            ),
            Notice::PricingUnavailable { instance_type } => format!(
                "no price found for {}, costs reported as zero",
                instance_type
            ),
            Notice::DaemonsetApproximation { daemonsets } => format!(
                "{} DaemonSet(s) counted once each, per-node demand is undercounted",
                daemonsets
            ),
            Notice::ZeroRequestWorkloads { workloads } => format!(
                "{} workload(s) declare no resource requests",
                workloads.len()
            ),
        }
    }
}

/// Requested resources as a fraction of current capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub cpu_pct: f64,
    pub memory_pct: f64,
}

impl Utilization {
    /// `None` when the cluster reports no countable capacity
    pub fn of(totals: &AggregateTotals, capacity: &ClusterCapacity) -> Option<Self> {
        if capacity.total_cpu_cores <= 0.0 || capacity.total_memory_bytes == 0 {
            return None;
        }
        Some(Self {
            cpu_pct: totals.requested.cpu_cores / capacity.total_cpu_cores,
            memory_pct: totals.requested.memory_bytes as f64 / capacity.total_memory_bytes as f64,
        })
    }
}

/// Demand and capacity without a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub generated_at: DateTime<Utc>,
    pub cluster: String,
    pub headroom_fraction: f64,
    pub totals: AggregateTotals,
    pub capacity: ClusterCapacity,
    pub required: RequiredResources,
    pub current_utilization: Option<Utilization>,
    pub notices: Vec<Notice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workloads: Option<Vec<WorkloadResourceUsage>>,
}

/// Full output of a sizing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingReport {
    pub generated_at: DateTime<Utc>,
    pub cluster: String,
    pub region: String,
    pub headroom_fraction: f64,
    pub totals: AggregateTotals,
    pub capacity: ClusterCapacity,
    pub required: RequiredResources,
    pub current_utilization: Option<Utilization>,
    pub recommendation: Recommendation,
    pub notices: Vec<Notice>,
    /// True when any notice is of the degraded class
    pub degraded: bool,
    /// Per-workload usage, only in detailed mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workloads: Option<Vec<WorkloadResourceUsage>>,
}

impl SizingReport {
    pub fn notices_with(&self, severity: Severity) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.severity() == severity)
    }
}

/// Notices derived from aggregation and capacity, in a stable order
fn input_notices(aggregation: &Aggregation, capacity: &ClusterCapacity) -> Vec<Notice> {
    let mut notices: Vec<Notice> = capacity
        .excluded_nodegroups
        .iter()
        .map(|group| Notice::UnknownInstanceType {
            nodegroup: group.name.clone(),
            instance_type: group.instance_type.clone(),
            current_nodes: group.current_nodes,
        })
        .collect();

    if aggregation.daemonset_count > 0 {
        notices.push(Notice::DaemonsetApproximation {
            daemonsets: aggregation.daemonset_count,
        });
    }
    if !aggregation.zero_request_workloads.is_empty() {
        notices.push(Notice::ZeroRequestWorkloads {
            workloads: aggregation.zero_request_workloads.clone(),
        });
    }

    notices
}

/// Assemble the capacity-only report
pub fn assemble_capacity(
    cluster: &str,
    aggregation: Aggregation,
    capacity: ClusterCapacity,
    headroom_fraction: f64,
    detailed: bool,
) -> CapacityReport {
    let notices = input_notices(&aggregation, &capacity);
    let required = RequiredResources::from_requested(&aggregation.totals.requested, headroom_fraction);

    CapacityReport {
        generated_at: Utc::now(),
        cluster: cluster.to_string(),
        headroom_fraction,
        current_utilization: Utilization::of(&aggregation.totals, &capacity),
        required,
        notices,
        workloads: detailed.then_some(aggregation.usages),
        totals: aggregation.totals,
        capacity,
    }
}

/// Assemble the full sizing report
pub fn assemble(
    cluster: &str,
    region: &str,
    aggregation: Aggregation,
    capacity: ClusterCapacity,
    required: RequiredResources,
    recommendation: Recommendation,
    detailed: bool,
) -> SizingReport {
    let mut notices = input_notices(&aggregation, &capacity);
    notices.extend(
        recommendation
            .alternatives
            .iter()
            .filter(|c| !c.pricing.is_available())
            .map(|c| Notice::PricingUnavailable {
                instance_type: c.instance_type.clone(),
            }),
    );

    let degraded = notices.iter().any(|n| n.severity() == Severity::Degraded);

    SizingReport {
        generated_at: Utc::now(),
        cluster: cluster.to_string(),
        region: region.to_string(),
        headroom_fraction: required.headroom_fraction,
        current_utilization: Utilization::of(&aggregation.totals, &capacity),
        required,
        recommendation,
        notices,
        degraded,
        workloads: detailed.then_some(aggregation.usages),
        totals: aggregation.totals,
        capacity,
    }
}
