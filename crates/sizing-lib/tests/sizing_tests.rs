//! End-to-end sizing runs against in-memory collaborators

use async_trait::async_trait;
use sizing_lib::{
    aggregator::{StaticWorkloads, WorkloadSource},
    capacity::{NodeGroupSource, StaticNodeGroups},
    pricing::{PriceSource, PricingResolver},
    Analyzer, ContainerResources, NodeGroup, Notice, PricingSource, SizingConfig, SizingError,
    WorkloadDescriptor, WorkloadKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const GI: u64 = 1024 * 1024 * 1024;

fn deployment(name: &str, replicas: u32, cpu_m: u64, mem: u64) -> WorkloadDescriptor {
    WorkloadDescriptor {
        kind: WorkloadKind::Deployment,
        namespace: "default".to_string(),
        name: name.to_string(),
        replica_count: replicas,
        containers: vec![ContainerResources {
            cpu_request_millicores: cpu_m,
            cpu_limit_millicores: cpu_m,
            memory_request_bytes: mem,
            memory_limit_bytes: mem,
        }],
    }
}

fn daemonset(name: &str, cpu_m: u64) -> WorkloadDescriptor {
    WorkloadDescriptor {
        kind: WorkloadKind::DaemonSet,
        namespace: "kube-system".to_string(),
        name: name.to_string(),
        replica_count: 0,
        containers: vec![ContainerResources {
            cpu_request_millicores: cpu_m,
            ..Default::default()
        }],
    }
}

fn node_group(name: &str, instance_type: &str, nodes: u32) -> NodeGroup {
    NodeGroup {
        name: name.to_string(),
        instance_type: instance_type.to_string(),
        current_nodes: nodes,
        desired_capacity: nodes,
        min_size: 1,
        max_size: 10,
    }
}

/// Price table that fails for every type not listed
struct TablePrices {
    prices: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl TablePrices {
    fn new(prices: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            prices: prices.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PriceSource for TablePrices {
    fn name(&self) -> &str {
        "table"
    }

    async fn hourly_price(&self, instance_type: &str, _region: &str) -> anyhow::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(instance_type)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("AccessDeniedException: not authorized"))
    }
}

struct CountingWorkloads {
    inner: StaticWorkloads,
    calls: AtomicUsize,
}

#[async_trait]
impl WorkloadSource for CountingWorkloads {
    async fn list_workloads(&self) -> anyhow::Result<Vec<WorkloadDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_workloads().await
    }
}

struct BrokenWorkloads;

#[async_trait]
impl WorkloadSource for BrokenWorkloads {
    async fn list_workloads(&self) -> anyhow::Result<Vec<WorkloadDescriptor>> {
        anyhow::bail!("the server has asked for the client to provide credentials")
    }
}

struct BrokenNodeGroups;

#[async_trait]
impl NodeGroupSource for BrokenNodeGroups {
    async fn list_node_groups(&self) -> anyhow::Result<Vec<NodeGroup>> {
        anyhow::bail!("ExpiredTokenException")
    }
}

fn sample_workloads() -> Vec<WorkloadDescriptor> {
    vec![
        deployment("web", 6, 500, GI),
        deployment("api", 4, 1500, 3 * GI),
        daemonset("fluent-bit", 100),
    ]
}

fn analyzer_with(
    workloads: Vec<WorkloadDescriptor>,
    groups: Vec<NodeGroup>,
    resolver: PricingResolver,
) -> Analyzer {
    Analyzer::builder()
        .config(SizingConfig::default())
        .workload_source(Arc::new(StaticWorkloads(workloads)))
        .node_group_source(Arc::new(StaticNodeGroups(groups)))
        .pricing(resolver)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_daemonset_counted_once_in_totals() {
    let workloads = vec![deployment("web", 4, 500, 0), daemonset("agent", 200)];
    let groups = vec![node_group("general", "m5.large", 5)];

    let report = analyzer_with(workloads, groups, PricingResolver::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.totals.requested.cpu_cores, 2.2);
    assert!(report
        .notices
        .contains(&Notice::DaemonsetApproximation { daemonsets: 1 }));
}

#[tokio::test]
async fn test_community_fallback_for_surfaced_candidate() {
    let authoritative = TablePrices::new(&[]);
    let community = TablePrices::new(&[("m6i.2xlarge", 0.4032)]);
    let resolver = PricingResolver::default()
        .with_authoritative(authoritative)
        .with_community(community);

    let quote = resolver.resolve("m6i.2xlarge", "us-east-1").await;

    assert_eq!(quote.source, PricingSource::Community);
    assert_eq!(quote.hourly_usd, 0.4032);
}

#[tokio::test]
async fn test_all_pricing_failed_still_recommends() {
    let authoritative = TablePrices::new(&[]);
    let community = TablePrices::new(&[]);
    let resolver = PricingResolver::default()
        .with_authoritative(authoritative.clone())
        .with_community(community.clone());

    let report = analyzer_with(
        sample_workloads(),
        vec![node_group("general", "m5.xlarge", 4)],
        resolver,
    )
    .run()
    .await
    .unwrap();

    let alternatives = &report.recommendation.alternatives;
    assert_eq!(alternatives.len(), 5);
    for candidate in alternatives {
        assert_eq!(candidate.pricing.source, PricingSource::Unavailable);
        assert_eq!(candidate.hourly_cost, 0.0);
        assert_eq!(candidate.monthly_cost, 0.0);
        assert_eq!(candidate.yearly_cost, 0.0);
    }
    // Only surfaced candidates are priced, each source tried once per candidate
    assert_eq!(authoritative.calls.load(Ordering::SeqCst), 5);
    assert_eq!(community.calls.load(Ordering::SeqCst), 5);

    assert!(report.degraded);
    let unpriced = report
        .notices
        .iter()
        .filter(|n| matches!(n, Notice::PricingUnavailable { .. }))
        .count();
    assert_eq!(unpriced, 5);
}

#[tokio::test]
async fn test_priced_costs() {
    let workloads = vec![deployment("api", 3, 2000, 4 * GI)];
    let community = TablePrices::new(&[
        ("c5.large", 0.085),
        ("c6g.large", 0.068),
        ("c6i.large", 0.085),
        ("c7i.large", 0.08925),
        ("t3.medium", 0.0416),
    ]);

    let resolver = PricingResolver::default().with_community(community);
    let report = analyzer_with(workloads, Vec::new(), resolver)
        .run()
        .await
        .unwrap();

    // 7.2 vCPU / 14.4 GiB: 2 vCPU x 4 GiB shapes need 4 nodes (8 vCPU / 16 GiB)
    let recommended = &report.recommendation.recommended;
    assert_eq!(recommended.instance_type, "c5.large");
    assert_eq!(recommended.node_count, 4);
    assert_eq!(recommended.pricing.source, PricingSource::Community);
    assert_eq!(recommended.pricing.hourly_usd, 0.085);
    assert_eq!(recommended.hourly_cost, 0.085 * 4.0);
    assert_eq!(recommended.monthly_cost, recommended.hourly_cost * 730.0);
    assert_eq!(recommended.yearly_cost, recommended.hourly_cost * 8760.0);
}

#[tokio::test]
async fn test_workload_failure_aborts_run() {
    let err = Analyzer::builder()
        .workload_source(Arc::new(BrokenWorkloads))
        .node_group_source(Arc::new(StaticNodeGroups(vec![node_group("g", "m5.large", 3)])))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SizingError::WorkloadEnumeration(_)));
    assert!(err.to_string().contains("provide credentials"));
}

#[tokio::test]
async fn test_node_group_failure_aborts_run() {
    let err = Analyzer::builder()
        .workload_source(Arc::new(StaticWorkloads(sample_workloads())))
        .node_group_source(Arc::new(BrokenNodeGroups))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SizingError::NodeGroupEnumeration(_)));
}

#[tokio::test]
async fn test_empty_allow_list_fails_before_enumeration() {
    let workloads = Arc::new(CountingWorkloads {
        inner: StaticWorkloads(sample_workloads()),
        calls: AtomicUsize::new(0),
    });
    let config = SizingConfig {
        allowed_families: vec!["inf2".to_string()],
        ..Default::default()
    };

    let err = Analyzer::builder()
        .config(config)
        .workload_source(workloads.clone())
        .node_group_source(Arc::new(StaticNodeGroups::default()))
        .build()
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SizingError::EmptyCatalog { .. }));
    assert_eq!(workloads.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_instance_type_is_degraded_not_fatal() {
    let groups = vec![
        node_group("general", "m5.2xlarge", 3),
        node_group("gpu", "g5.12xlarge", 2),
    ];

    let report = analyzer_with(sample_workloads(), groups, PricingResolver::default())
        .run()
        .await
        .unwrap();

    assert_eq!(report.capacity.total_cpu_cores, 24.0);
    assert_eq!(report.capacity.excluded_nodegroups.len(), 1);
    assert!(report.degraded);
    assert!(report.notices.iter().any(|n| matches!(
        n,
        Notice::UnknownInstanceType { instance_type, .. } if instance_type == "g5.12xlarge"
    )));
}

#[tokio::test]
async fn test_recommendation_is_deterministic() {
    let prices = [("m5.2xlarge", 0.384), ("m6i.2xlarge", 0.384), ("c5.2xlarge", 0.34)];

    let mut runs = Vec::new();
    for _ in 0..3 {
        let resolver = PricingResolver::default().with_community(TablePrices::new(&prices));
        let report = analyzer_with(sample_workloads(), Vec::new(), resolver)
            .run()
            .await
            .unwrap();
        runs.push(serde_json::to_string(&report.recommendation).unwrap());
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[tokio::test]
async fn test_empty_cluster_recommends_floor() {
    let report = analyzer_with(Vec::new(), Vec::new(), PricingResolver::default())
        .run()
        .await
        .unwrap();

    let recommended = &report.recommendation.recommended;
    assert_eq!(recommended.node_count, 3);
    assert_eq!(recommended.avg_waste_pct, 1.0);
    assert_eq!(recommended.instance_type, "c6g.medium");
    assert!(report.current_utilization.is_none());
}

#[tokio::test]
async fn test_detailed_report_lists_workloads() {
    let report = Analyzer::builder()
        .workload_source(Arc::new(StaticWorkloads(sample_workloads())))
        .node_group_source(Arc::new(StaticNodeGroups::default()))
        .detailed(true)
        .build()
        .unwrap()
        .run()
        .await
        .unwrap();

    let workloads = report.workloads.unwrap();
    assert_eq!(workloads.len(), 3);
    assert_eq!(workloads[2].effective_replica_count, 1);

    let json = serde_json::to_value(&report.totals).unwrap();
    assert!(json["by_kind"]["DaemonSet"]["cpu_cores"].is_number());
}
