//! Kubernetes API access
//!
//! Workloads come from the Deployment, StatefulSet and DaemonSet APIs.
//! Node groups are derived from node labels when no cloud API is used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Node, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use sizing_lib::aggregator::WorkloadSource;
use sizing_lib::capacity::NodeGroupSource;
use sizing_lib::{ContainerResources, NodeGroup, WorkloadDescriptor, WorkloadKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::quantity::{parse_cpu_millicores, parse_memory_bytes};

/// EKS managed node group label
pub const EKS_NODEGROUP_LABEL: &str = "eks.amazonaws.com/nodegroup";

/// Node labels naming the group a node belongs to, most specific first
const NODEGROUP_LABELS: &[&str] = &[
    EKS_NODEGROUP_LABEL,
    "karpenter.sh/nodepool",
    "alpha.eksctl.io/nodegroup-name",
];

const INSTANCE_TYPE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];

const UNGROUPED: &str = "ungrouped";

/// Create a client from an explicit kubeconfig and/or context, or infer one
pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let config = if kubeconfig.is_none() && context.is_none() {
        Config::infer()
            .await
            .context("Failed to infer Kubernetes config")?
    } else {
        let kubeconfig = read_kubeconfig(kubeconfig)?;
        Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            },
        )
        .await
        .context("Failed to load Kubernetes context")?
    };

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Name of the context a run will use, for labelling reports
pub fn context_name(kubeconfig: Option<&Path>, context: Option<&str>) -> Option<String> {
    if let Some(context) = context {
        return Some(context.to_string());
    }
    read_kubeconfig(kubeconfig).ok()?.current_context
}

fn read_kubeconfig(path: Option<&Path>) -> Result<Kubeconfig> {
    match path {
        Some(path) => Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig {}", path.display())),
        None => Kubeconfig::read().context("Failed to read kubeconfig"),
    }
}

/// Workload enumeration through the Kubernetes API
pub struct KubeWorkloadSource {
    client: Client,
    namespace: Option<String>,
}

impl KubeWorkloadSource {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn deployments(&self) -> Result<Vec<WorkloadDescriptor>> {
        let list = self
            .api::<Deployment>()
            .list(&ListParams::default())
            .await
            .context("Failed to list deployments")?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|d| {
                let spec = d.spec?;
                Some(descriptor(
                    WorkloadKind::Deployment,
                    d.metadata.namespace,
                    d.metadata.name,
                    spec.replicas,
                    &spec.template,
                ))
            })
            .collect())
    }

    async fn statefulsets(&self) -> Result<Vec<WorkloadDescriptor>> {
        let list = self
            .api::<StatefulSet>()
            .list(&ListParams::default())
            .await
            .context("Failed to list statefulsets")?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|s| {
                let spec = s.spec?;
                Some(descriptor(
                    WorkloadKind::StatefulSet,
                    s.metadata.namespace,
                    s.metadata.name,
                    spec.replicas,
                    &spec.template,
                ))
            })
            .collect())
    }

    async fn daemonsets(&self) -> Result<Vec<WorkloadDescriptor>> {
        let list = self
            .api::<DaemonSet>()
            .list(&ListParams::default())
            .await
            .context("Failed to list daemonsets")?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|d| {
                let spec = d.spec?;
                Some(descriptor(
                    WorkloadKind::DaemonSet,
                    d.metadata.namespace,
                    d.metadata.name,
                    Some(1),
                    &spec.template,
                ))
            })
            .collect())
    }
}

#[async_trait]
impl WorkloadSource for KubeWorkloadSource {
    async fn list_workloads(&self) -> Result<Vec<WorkloadDescriptor>> {
        let (mut workloads, statefulsets, daemonsets) =
            tokio::try_join!(self.deployments(), self.statefulsets(), self.daemonsets())?;

        workloads.extend(statefulsets);
        workloads.extend(daemonsets);
        debug!(count = workloads.len(), "Listed workloads");
        Ok(workloads)
    }
}

fn descriptor(
    kind: WorkloadKind,
    namespace: Option<String>,
    name: Option<String>,
    replicas: Option<i32>,
    template: &PodTemplateSpec,
) -> WorkloadDescriptor {
    let namespace = namespace.unwrap_or_else(|| "default".to_string());
    let name = name.unwrap_or_default();
    let qualified = format!("{}/{}", namespace, name);

    let containers = template
        .spec
        .as_ref()
        .map(|pod| {
            pod.containers
                .iter()
                .map(|c| {
                    let resources = c.resources.as_ref();
                    let requests = resources.and_then(|r| r.requests.as_ref());
                    let limits = resources.and_then(|r| r.limits.as_ref());
                    ContainerResources {
                        cpu_request_millicores: quantity(&qualified, requests, "cpu"),
                        cpu_limit_millicores: quantity(&qualified, limits, "cpu"),
                        memory_request_bytes: quantity(&qualified, requests, "memory"),
                        memory_limit_bytes: quantity(&qualified, limits, "memory"),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    WorkloadDescriptor {
        kind,
        namespace,
        name,
        replica_count: replicas.map(|r| r.max(0) as u32).unwrap_or(1),
        containers,
    }
}

/// Parsed quantity for `resource`, zero when missing or unparseable
fn quantity(workload: &str, values: Option<&BTreeMap<String, Quantity>>, resource: &str) -> u64 {
    let Some(Quantity(raw)) = values.and_then(|v| v.get(resource)) else {
        return 0;
    };

    let parsed = match resource {
        "cpu" => parse_cpu_millicores(raw),
        _ => parse_memory_bytes(raw),
    };

    parsed.unwrap_or_else(|| {
        warn!(
            workload = %workload,
            resource = %resource,
            quantity = %raw,
            "Unparseable resource quantity, counting as zero"
        );
        0
    })
}

/// Node groups reconstructed from the labels of running nodes
pub struct KubeNodeGroupSource {
    client: Client,
}

impl KubeNodeGroupSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeGroupSource for KubeNodeGroupSource {
    async fn list_node_groups(&self) -> Result<Vec<NodeGroup>> {
        let nodes = list_nodes(&self.client).await?;
        Ok(group_nodes(&nodes))
    }
}

pub(crate) async fn list_nodes(client: &Client) -> Result<Vec<Node>> {
    let nodes: Api<Node> = Api::all(client.clone());
    let list = nodes
        .list(&ListParams::default())
        .await
        .context("Failed to list nodes")?;
    Ok(list.items)
}

fn label<'a>(node: &'a Node, keys: &[&str]) -> Option<&'a str> {
    let labels = node.metadata.labels.as_ref()?;
    keys.iter()
        .find_map(|key| labels.get(*key))
        .map(String::as_str)
}

/// Node counts keyed by the value of `key`
pub(crate) fn count_by_label(nodes: &[Node], key: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for node in nodes {
        if let Some(value) = label(node, &[key]) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Group nodes by node-group label and instance type.
///
/// Groups mixing instance types (typical for Karpenter pools) are split
/// into one entry per type, named `<group>/<type>`.
pub(crate) fn group_nodes(nodes: &[Node]) -> Vec<NodeGroup> {
    let mut groups: BTreeMap<(String, String), u32> = BTreeMap::new();
    for node in nodes {
        let group = label(node, NODEGROUP_LABELS).unwrap_or(UNGROUPED);
        let instance_type = label(node, INSTANCE_TYPE_LABELS).unwrap_or("unknown");
        *groups
            .entry((group.to_string(), instance_type.to_string()))
            .or_insert(0) += 1;
    }

    let mut types_per_group: HashMap<&str, usize> = HashMap::new();
    for (group, _) in groups.keys() {
        *types_per_group.entry(group.as_str()).or_insert(0) += 1;
    }

    groups
        .iter()
        .map(|((group, instance_type), &count)| {
            let name = if types_per_group.get(group.as_str()).copied().unwrap_or(0) > 1 {
                format!("{}/{}", group, instance_type)
            } else {
                group.clone()
            };
            NodeGroup {
                name,
                instance_type: instance_type.clone(),
                current_nodes: count,
                desired_capacity: count,
                min_size: count,
                max_size: count,
            }
        })
        .collect()
}
