//! Command implementations

pub mod capacity;
pub mod catalog;
pub mod recommend;

use anyhow::{Context, Result};
use sizing_lib::aggregator::{StaticWorkloads, WorkloadSource};
use sizing_lib::capacity::{NodeGroupSource, StaticNodeGroups};
use sizing_lib::pricing::PricingResolver;
use sizing_lib::{Analyzer, SizingConfig, StructuredLogger};
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{self, KubeNodeGroupSource, KubeWorkloadSource};
use crate::config::{self, Overrides};
use crate::eks::EksNodeGroupSource;
use crate::snapshot::Snapshot;
use crate::{ClusterArgs, NodeGroupMode};

/// Global connection and config options
pub struct Target {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub config: Option<PathBuf>,
}

type Sources = (Arc<dyn WorkloadSource>, Arc<dyn NodeGroupSource>, String);

/// Collaborators for a run: a snapshot file or the live cluster
async fn sources(target: &Target, cluster: &ClusterArgs, region: &str) -> Result<Sources> {
    if let Some(path) = &cluster.input {
        let snapshot = Snapshot::load(path)?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let workloads: Arc<dyn WorkloadSource> = Arc::new(StaticWorkloads(snapshot.workloads));
        let node_groups: Arc<dyn NodeGroupSource> =
            Arc::new(StaticNodeGroups(snapshot.node_groups));
        return Ok((workloads, node_groups, label));
    }

    let kubeconfig = target.kubeconfig.as_deref();
    let context = target.context.as_deref();
    let kube = client::connect(kubeconfig, context).await?;
    let label =
        client::context_name(kubeconfig, context).unwrap_or_else(|| "in-cluster".to_string());

    let workloads: Arc<dyn WorkloadSource> = Arc::new(KubeWorkloadSource::new(
        kube.clone(),
        cluster.namespace.clone(),
    ));
    let node_groups: Arc<dyn NodeGroupSource> = match cluster.nodegroups {
        NodeGroupMode::Nodes => Arc::new(KubeNodeGroupSource::new(kube)),
        NodeGroupMode::Eks => {
            let name = cluster
                .cluster_name
                .as_deref()
                .context("--cluster-name is required with --nodegroups eks")?;
            Arc::new(EksNodeGroupSource::from_env(region, kube, name).await)
        }
    };

    Ok((workloads, node_groups, label))
}

/// Load config and wire an analyzer for one command
pub async fn analyzer(
    target: &Target,
    cluster: &ClusterArgs,
    overrides: Overrides,
) -> Result<Analyzer> {
    let config: SizingConfig = config::load(target.config.as_deref(), overrides)?;
    let (workloads, node_groups, label) = sources(target, cluster, &config.region).await?;

    let logger = StructuredLogger::new(label);
    let resolver = PricingResolver::from_config(&config, logger.clone())
        .await
        .context("Failed to set up pricing sources")?;

    let analyzer = Analyzer::builder()
        .config(config)
        .workload_source(workloads)
        .node_group_source(node_groups)
        .pricing(resolver)
        .logger(logger)
        .detailed(cluster.detailed)
        .build()?;

    Ok(analyzer)
}
