use netgrid_core::{Node, NodeId};
use std::collections::HashMap;

use crate::builder::Adjacency;

/// Id of the shared cluster absorbing nodes with no links at all.
pub const UNLINKED_CLUSTER_ID: &str = "0";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterContext {
    pub has_selection: bool,
    pub hide_simple_networks: bool,
    pub use_node_clusters: bool,
}

#[derive(Debug, Default)]
pub struct ClusteredGraph {
    pub nodes: Vec<Node>,
    /// Original node id → id of the cluster that absorbed it.
    pub node_to_cluster: HashMap<NodeId, NodeId>,
}

/// Sorted neighbor sets in both directions; two nodes with equal signatures
/// are structurally equivalent.
type Signature = (Vec<NodeId>, Vec<NodeId>);

enum Class {
    Unlinked,
    Single,
    Equivalence,
    Multi,
}

fn classify(node: &Node) -> Class {
    let (t, s) = (node.targets, node.sources);
    if t == 0 && s == 0 {
        Class::Unlinked
    } else if (t > 1 && s > 1) || (t == 1 && s == 1) {
        Class::Equivalence
    } else if t > 1 || s > 1 {
        Class::Multi
    } else {
        Class::Single
    }
}

fn signature(id: &NodeId, adjacency: &Adjacency) -> Signature {
    let mut targets = adjacency.targets_of(id).to_vec();
    let mut sources = adjacency.sources_of(id).to_vec();
    targets.sort_unstable();
    sources.sort_unstable();
    (targets, sources)
}

/// The sole neighbor of a single-link node.
fn single_endpoint<'a>(id: &NodeId, adjacency: &'a Adjacency) -> Option<&'a NodeId> {
    adjacency
        .targets_of(id)
        .first()
        .or_else(|| adjacency.sources_of(id).first())
}

fn should_add_multiple_link_node(node: &Node, adjacency: &Adjacency, ctx: &ClusterContext) -> bool {
    if ctx.has_selection || !ctx.hide_simple_networks {
        return true;
    }
    // keep the hub of anything bigger than an isolated star
    adjacency
        .targets_of(&node.id)
        .iter()
        .chain(adjacency.sources_of(&node.id))
        .any(|n| adjacency.has_neighbor_other_than(n, &node.id))
}

fn should_add_single_link_node(
    node: &Node,
    endpoint: &NodeId,
    adjacency: &Adjacency,
    ctx: &ClusterContext,
) -> bool {
    ctx.has_selection
        || !ctx.hide_simple_networks
        || node.flag
        || adjacency.neighbor_count(endpoint) > 1
}

/// Merge structurally-equivalent and degree-1 nodes into cluster entities and
/// drop near-isolated simple networks, per the visibility toggles. Membership
/// is order-independent with respect to row order: degrees and group sizes
/// are computed over the full adjacency before any node is classified.
pub fn cluster(mut nodes: Vec<Node>, adjacency: &Adjacency, ctx: &ClusterContext) -> ClusteredGraph {
    for node in &mut nodes {
        node.targets = adjacency.targets_of(&node.id).len();
        node.sources = adjacency.sources_of(&node.id).len();
    }

    // group sizes for the two clustering paths; flagged nodes never cluster
    // and do not count toward group sizes. Each equivalence group's cluster
    // id is its minimum member id, so ids and keys do not depend on row
    // order.
    let mut equivalence_groups: HashMap<Signature, (usize, NodeId)> = HashMap::new();
    let mut single_counts: HashMap<NodeId, usize> = HashMap::new();
    for node in &nodes {
        if node.flag {
            continue;
        }
        match classify(node) {
            Class::Equivalence => {
                equivalence_groups
                    .entry(signature(&node.id, adjacency))
                    .and_modify(|(count, min_id)| {
                        *count += 1;
                        if node.id < *min_id {
                            *min_id = node.id.clone();
                        }
                    })
                    .or_insert_with(|| (1, node.id.clone()));
            }
            Class::Single => {
                if let Some(endpoint) = single_endpoint(&node.id, adjacency) {
                    *single_counts.entry(endpoint.clone()).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    let mut out: Vec<Node> = Vec::new();
    let mut node_to_cluster: HashMap<NodeId, NodeId> = HashMap::new();
    // clusters are looked up and extended by their id
    let mut cluster_slots: HashMap<NodeId, usize> = HashMap::new();

    let before = nodes.len();
    for node in nodes {
        if node.flag {
            out.push(node);
            continue;
        }
        match classify(&node) {
            Class::Equivalence => {
                let sig = signature(&node.id, adjacency);
                match equivalence_groups.get(&sig) {
                    Some((count, min_id)) if ctx.use_node_clusters && *count > 1 => {
                        let cluster_id = min_id.clone();
                        absorb(&mut out, &mut cluster_slots, &mut node_to_cluster, cluster_id, node);
                    }
                    _ => out.push(node),
                }
            }
            Class::Multi => {
                if should_add_multiple_link_node(&node, adjacency, ctx) {
                    out.push(node);
                }
            }
            Class::Single => {
                let Some(endpoint) = single_endpoint(&node.id, adjacency).cloned() else {
                    out.push(node);
                    continue;
                };
                if ctx.use_node_clusters
                    && single_counts.get(&endpoint).copied().unwrap_or(0) > 1
                {
                    absorb(&mut out, &mut cluster_slots, &mut node_to_cluster, endpoint, node);
                } else if should_add_single_link_node(&node, &endpoint, adjacency, ctx) {
                    out.push(node);
                }
            }
            Class::Unlinked => {
                if !ctx.has_selection && ctx.hide_simple_networks {
                    continue; // dropped entirely
                }
                if ctx.use_node_clusters {
                    let cluster_id = NodeId::new(UNLINKED_CLUSTER_ID);
                    absorb(&mut out, &mut cluster_slots, &mut node_to_cluster, cluster_id, node);
                } else {
                    out.push(node);
                }
            }
        }
    }

    for node in &mut out {
        let members = node.members().len();
        if members > 0 {
            node.name = format!("{members} items");
        }
    }

    tracing::debug!(
        before,
        after = out.len(),
        clusters = cluster_slots.len(),
        "clustered graph nodes"
    );

    ClusteredGraph {
        nodes: out,
        node_to_cluster,
    }
}

/// Fold `member` into the cluster with the given id, creating it on first
/// contact. Cluster size is the sum of member sizes; dates are the sorted
/// union of member dates.
fn absorb(
    out: &mut Vec<Node>,
    cluster_slots: &mut HashMap<NodeId, usize>,
    node_to_cluster: &mut HashMap<NodeId, NodeId>,
    cluster_id: NodeId,
    member: Node,
) {
    let slot = match cluster_slots.get(&cluster_id) {
        Some(&i) => i,
        None => {
            let mut cluster = Node::cluster(cluster_id.clone());
            cluster.targets = member.targets;
            cluster.sources = member.sources;
            let i = out.len();
            out.push(cluster);
            cluster_slots.insert(cluster_id, i);
            i
        }
    };

    let cluster = &mut out[slot];
    node_to_cluster.insert(member.id.clone(), cluster.id.clone());
    cluster.size += member.size;
    cluster.in_data |= member.in_data;
    cluster.dates.extend_from_slice(&member.dates);
    cluster.dates.sort_unstable();
    if let Some(body) = cluster.cluster_body_mut() {
        body.members.push(member);
    }
}
