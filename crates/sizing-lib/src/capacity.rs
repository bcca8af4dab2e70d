//! Current cluster capacity
//!
//! Multiplies each node group's current node count by its instance shape.
//! Groups whose instance type is missing from the catalog are excluded from
//! the totals and listed separately so the undercount is visible.

use crate::catalog::InstanceCatalog;
use crate::error::{Result, SizingError};
use crate::models::{ClusterCapacity, NodeGroup, BYTES_PER_GIB};
use async_trait::async_trait;
use tracing::warn;

/// Collaborator that lists the cluster's node groups
#[async_trait]
pub trait NodeGroupSource: Send + Sync {
    async fn list_node_groups(&self) -> anyhow::Result<Vec<NodeGroup>>;
}

/// Node-group source backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticNodeGroups(pub Vec<NodeGroup>);

#[async_trait]
impl NodeGroupSource for StaticNodeGroups {
    async fn list_node_groups(&self) -> anyhow::Result<Vec<NodeGroup>> {
        Ok(self.0.clone())
    }
}

/// Compute capacity from node-group snapshots
pub fn introspect<I>(node_groups: I, catalog: &InstanceCatalog) -> ClusterCapacity
where
    I: IntoIterator<Item = NodeGroup>,
{
    let mut capacity = ClusterCapacity::default();
    let mut memory_gib = 0.0;

    for group in node_groups {
        match catalog.get(&group.instance_type) {
            Some(spec) => {
                let nodes = group.current_nodes;
                capacity.total_cpu_cores += f64::from(nodes) * f64::from(spec.vcpu);
                memory_gib += f64::from(nodes) * spec.memory_gib;
                capacity.by_nodegroup.push(group);
            }
            None => {
                warn!(
                    event = "unknown_instance_type",
                    nodegroup = %group.name,
                    instance_type = %group.instance_type,
                    current_nodes = group.current_nodes,
                    "Instance type not in catalog, excluding node group from capacity"
                );
                capacity.excluded_nodegroups.push(group);
            }
        }
    }

    capacity.total_memory_bytes = (memory_gib * BYTES_PER_GIB).round() as u64;
    capacity
}

/// Enumerate from a source and compute capacity
pub async fn collect(
    source: &dyn NodeGroupSource,
    catalog: &InstanceCatalog,
) -> Result<ClusterCapacity> {
    let groups = source
        .list_node_groups()
        .await
        .map_err(SizingError::NodeGroupEnumeration)?;
    Ok(introspect(groups, catalog))
}
