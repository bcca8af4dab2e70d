//! EKS managed node groups
//!
//! Node group shape and scaling bounds come from the EKS API; the current
//! node count comes from Kubernetes nodes carrying the node-group label.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_eks::types::Nodegroup;
use kube::Client;
use sizing_lib::capacity::NodeGroupSource;
use sizing_lib::NodeGroup;
use std::collections::HashMap;
use tracing::debug;

use crate::client::{count_by_label, list_nodes, EKS_NODEGROUP_LABEL};

pub struct EksNodeGroupSource {
    eks: aws_sdk_eks::Client,
    kube: Client,
    cluster_name: String,
}

impl EksNodeGroupSource {
    pub fn new(eks: aws_sdk_eks::Client, kube: Client, cluster_name: impl Into<String>) -> Self {
        Self {
            eks,
            kube,
            cluster_name: cluster_name.into(),
        }
    }

    /// Build the EKS client from the default credential chain
    pub async fn from_env(region: &str, kube: Client, cluster_name: impl Into<String>) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::new(aws_sdk_eks::Client::new(&sdk_config), kube, cluster_name)
    }

    async fn nodegroup_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .eks
                .list_nodegroups()
                .cluster_name(&self.cluster_name)
                .set_next_token(next_token.take())
                .send()
                .await
                .with_context(|| format!("ListNodegroups failed for cluster {}", self.cluster_name))?;

            names.extend(output.nodegroups().iter().cloned());
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn describe(&self, name: &str) -> Result<Nodegroup> {
        let output = self
            .eks
            .describe_nodegroup()
            .cluster_name(&self.cluster_name)
            .nodegroup_name(name)
            .send()
            .await
            .with_context(|| format!("DescribeNodegroup failed for {}", name))?;

        output
            .nodegroup
            .with_context(|| format!("DescribeNodegroup returned no node group for {}", name))
    }
}

#[async_trait]
impl NodeGroupSource for EksNodeGroupSource {
    async fn list_node_groups(&self) -> Result<Vec<NodeGroup>> {
        let (names, nodes) = tokio::try_join!(self.nodegroup_names(), list_nodes(&self.kube))?;
        let counts = count_by_label(&nodes, EKS_NODEGROUP_LABEL);

        let mut groups = Vec::with_capacity(names.len());
        for name in names {
            let nodegroup = self.describe(&name).await?;
            groups.push(to_node_group(&name, &nodegroup, &counts));
        }

        debug!(cluster = %self.cluster_name, count = groups.len(), "Described EKS node groups");
        Ok(groups)
    }
}

fn to_node_group(name: &str, nodegroup: &Nodegroup, counts: &HashMap<String, u32>) -> NodeGroup {
    let scaling = nodegroup.scaling_config();
    let bound = |value: Option<i32>| value.map(|v| v.max(0) as u32).unwrap_or(0);

    NodeGroup {
        name: name.to_string(),
        // Launch-template groups may not report a type; they surface as unknown
        instance_type: nodegroup
            .instance_types()
            .first()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        current_nodes: counts.get(name).copied().unwrap_or(0),
        desired_capacity: bound(scaling.and_then(|s| s.desired_size())),
        min_size: bound(scaling.and_then(|s| s.min_size())),
        max_size: bound(scaling.and_then(|s| s.max_size())),
    }
}
