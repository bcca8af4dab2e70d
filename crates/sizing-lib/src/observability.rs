//! Structured logging for sizing runs
//!
//! Every event carries an `event` field and the cluster it concerns so
//! JSON logs can be filtered per run. Pricing outcomes are always logged:
//! a zero cost must be distinguishable from a failed lookup.

use crate::models::{AggregateTotals, ClusterCapacity, PricingQuote, RecommendationCandidate};
use tracing::{info, warn};

/// Structured logger for sizing events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Log the start of a sizing run
    pub fn log_run_started(&self, region: &str, headroom_fraction: f64, families: &[String]) {
        info!(
            event = "sizing_started",
            cluster = %self.cluster,
            region = %region,
            headroom_fraction = headroom_fraction,
            families = %families.join(","),
            "Starting cluster sizing run"
        );
    }

    /// Log aggregated workload demand
    pub fn log_aggregation(
        &self,
        totals: &AggregateTotals,
        zero_request_workloads: usize,
        daemonsets: usize,
    ) {
        info!(
            event = "workloads_aggregated",
            cluster = %self.cluster,
            workloads = totals.workload_count,
            requested_cpu_cores = totals.requested.cpu_cores,
            requested_memory_bytes = totals.requested.memory_bytes,
            zero_request_workloads = zero_request_workloads,
            daemonsets = daemonsets,
            "Aggregated workload resource requests"
        );

        if daemonsets > 0 {
            info!(
                event = "daemonset_approximation",
                cluster = %self.cluster,
                daemonsets = daemonsets,
                "DaemonSets counted once each, per-node demand is undercounted"
            );
        }
    }

    /// Log current capacity, warning when node groups were excluded
    pub fn log_capacity(&self, capacity: &ClusterCapacity) {
        if capacity.is_undercounted() {
            warn!(
                event = "capacity_undercounted",
                cluster = %self.cluster,
                excluded_nodegroups = capacity.excluded_nodegroups.len(),
                total_cpu_cores = capacity.total_cpu_cores,
                total_memory_bytes = capacity.total_memory_bytes,
                "Current capacity excludes node groups with unknown instance types"
            );
        } else {
            info!(
                event = "capacity_computed",
                cluster = %self.cluster,
                nodegroups = capacity.by_nodegroup.len(),
                total_cpu_cores = capacity.total_cpu_cores,
                total_memory_bytes = capacity.total_memory_bytes,
                "Computed current cluster capacity"
            );
        }
    }

    /// Log a single failed pricing source attempt
    pub fn log_pricing_attempt_failed(
        &self,
        source: &str,
        instance_type: &str,
        region: &str,
        error: &anyhow::Error,
    ) {
        warn!(
            event = "pricing_attempt_failed",
            cluster = %self.cluster,
            source = %source,
            instance_type = %instance_type,
            region = %region,
            error = %format!("{:#}", error),
            "Pricing source failed"
        );
    }

    /// Log the final outcome of a pricing lookup
    pub fn log_pricing_outcome(&self, quote: &PricingQuote) {
        if quote.is_available() {
            info!(
                event = "pricing_resolved",
                cluster = %self.cluster,
                source = %quote.source,
                instance_type = %quote.instance_type,
                region = %quote.region,
                hourly_usd = quote.hourly_usd,
                "Resolved on-demand price"
            );
        } else {
            warn!(
                event = "pricing_unavailable",
                cluster = %self.cluster,
                source = %quote.source,
                instance_type = %quote.instance_type,
                region = %quote.region,
                "All pricing sources failed, reporting zero cost"
            );
        }
    }

    /// Log a pricing lookup abandoned at the run deadline
    pub fn log_pricing_timed_out(&self, instance_type: &str, region: &str) {
        warn!(
            event = "pricing_timed_out",
            cluster = %self.cluster,
            instance_type = %instance_type,
            region = %region,
            "Pricing lookup did not finish before the run deadline"
        );
    }

    /// Log the produced recommendation
    pub fn log_recommendation(&self, recommended: &RecommendationCandidate, alternatives: usize) {
        info!(
            event = "recommendation_produced",
            cluster = %self.cluster,
            instance_type = %recommended.instance_type,
            node_count = recommended.node_count,
            avg_waste_pct = recommended.avg_waste_pct,
            monthly_cost = recommended.monthly_cost,
            pricing_source = %recommended.pricing.source,
            alternatives = alternatives,
            "Produced node pool recommendation"
        );
    }
}
