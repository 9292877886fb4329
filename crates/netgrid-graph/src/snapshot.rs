use netgrid_core::{Bucketizer, GraphOptions, Link, Node, NodeId, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::builder::{self, BuiltGraph};
use crate::cluster::{self, ClusterContext};
use crate::network::{self, FinalizeOutcome};
use crate::temporal::{self, prefix_at, DateBucketIndex};

/// One fully-rebuilt graph: date-ordered nodes, index-based deduplicated
/// links, and the bucket maps for temporal playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub buckets: DateBucketIndex,
}

/// Run the whole pipeline over freshly-arrived rows. The previous selection's
/// node ids keep simple networks visible and are re-resolved to a network id
/// in the rebuilt graph.
pub fn evaluate(
    rows: &[Row],
    options: &GraphOptions,
    bucketizer: &dyn Bucketizer,
    selected_node_ids: &[NodeId],
) -> (GraphSnapshot, Option<u32>) {
    let BuiltGraph {
        nodes,
        links: raw_links,
        adjacency,
    } = builder::build(rows, options);

    let ctx = ClusterContext {
        has_selection: !selected_node_ids.is_empty(),
        hide_simple_networks: options.hide_simple_networks,
        use_node_clusters: options.use_node_clusters,
    };
    let clustered = cluster::cluster(nodes, &adjacency, &ctx);

    let mut nodes = clustered.nodes;
    sort_by_first_date(&mut nodes);

    let FinalizeOutcome {
        mut links,
        selected_network,
    } = network::finalize(
        &mut nodes,
        &raw_links,
        &adjacency.link_dates,
        &clustered.node_to_cluster,
        selected_node_ids,
    );
    links.sort_by_key(|l| l.first_date());

    let buckets = temporal::index(&mut nodes, &links, bucketizer);

    let snapshot = GraphSnapshot {
        nodes,
        links,
        buckets,
    };
    tracing::debug!(
        nodes = snapshot.nodes.len(),
        links = snapshot.links.len(),
        networks = snapshot.network_count(),
        "graph rebuilt"
    );
    (snapshot, selected_network)
}

/// Stable date sort: dateless entities first (bucket 0), then ascending by
/// earliest date. Cluster members sort the same way so their nested prefix
/// maps line up.
fn sort_by_first_date(nodes: &mut Vec<Node>) {
    for node in nodes.iter_mut() {
        if let Some(body) = node.cluster_body_mut() {
            body.members.sort_by_key(|m| m.first_date());
        }
    }
    nodes.sort_by_key(|n| n.first_date());
}

impl GraphSnapshot {
    pub fn network_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.network)
            .filter(|w| *w != 0)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Prefix of the node array visible at the given bucket; everything when
    /// no bucket is selected or there is no time axis.
    pub fn visible_nodes(&self, bucket: Option<usize>) -> &[Node] {
        match bucket {
            Some(b) if !self.buckets.node_counts.is_empty() => {
                &self.nodes[..self.buckets.nodes_at(b)]
            }
            _ => &self.nodes,
        }
    }

    /// Prefix of the link array visible at the given bucket. A sliced link
    /// can still point at a node past the visible prefix when the edge has no
    /// date of its own; renderers skip such links.
    pub fn visible_links(&self, bucket: Option<usize>) -> &[Link] {
        match bucket {
            Some(b) if !self.buckets.link_counts.is_empty() => {
                &self.links[..self.buckets.links_at(b)]
            }
            _ => &self.links,
        }
    }

    /// Re-slice every cluster's member view for the selected bucket.
    pub fn apply_date_bucket(&mut self, bucket: Option<usize>) {
        for node in &mut self.nodes {
            if let Some(body) = node.cluster_body_mut() {
                body.visible_members = match bucket {
                    Some(b) if !body.member_counts.is_empty() => {
                        prefix_at(&body.member_counts, b)
                    }
                    _ => body.members.len(),
                };
            }
        }
    }

    /// Keys of every entity with a date falling exactly in `bucket`; the
    /// renderer pulses these when the user scrubs onto the bucket.
    pub fn pulse_keys(&self, bucket: usize, bucketizer: &dyn Bucketizer) -> Vec<String> {
        let mut keys = Vec::new();
        if !bucketizer.has_dates() {
            return keys;
        }
        for node in &self.nodes {
            if node
                .dates
                .iter()
                .any(|d| bucketizer.bucket_index(*d) == bucket)
            {
                keys.push(node.key.clone());
            }
        }
        for link in &self.links {
            if link
                .dates
                .iter()
                .any(|d| bucketizer.bucket_index(*d) == bucket)
            {
                keys.push(link.key.clone());
            }
        }
        keys
    }

    /// Ids of every original node inside the given network (cluster members
    /// included). Network 0 means "unassigned" and yields nothing.
    pub fn node_ids_in_network(&self, network: u32) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if network == 0 {
            return ids;
        }
        for node in &self.nodes {
            if node.network != network {
                continue;
            }
            match node.cluster_body() {
                Some(body) => ids.extend(body.members.iter().map(|m| m.id.clone())),
                None => ids.push(node.id.clone()),
            }
        }
        ids
    }

    pub fn node_index_by_key(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    /// Case-insensitive substring search over ids and names, cluster members
    /// included; stable-sorted, capped hit list.
    pub fn search(&self, query: &str, limit: usize) -> Vec<NodeId> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        let matches = |n: &Node| {
            n.id.0.to_lowercase().contains(&q) || n.name.to_lowercase().contains(&q)
        };

        let mut hits: Vec<NodeId> = Vec::new();
        for node in &self.nodes {
            match node.cluster_body() {
                Some(body) => {
                    hits.extend(body.members.iter().filter(|m| matches(m)).map(|m| m.id.clone()))
                }
                None => {
                    if matches(node) {
                        hits.push(node.id.clone());
                    }
                }
            }
        }
        hits.sort();
        hits.dedup();
        hits.truncate(limit.max(1));
        hits
    }

    /// Hover-card lines for one node.
    pub fn tooltip_lines(&self, index: usize) -> Vec<String> {
        let Some(node) = self.nodes.get(index) else {
            return Vec::new();
        };
        let mut out = vec![format!("{} ({})", node.name, node.id)];
        out.push(format!("size: {}", node.size));
        if let (Some(first), Some(last)) = (node.dates.first(), node.dates.last()) {
            out.push(format!("dates: {} .. {}", first, last));
        }
        if let Some(body) = node.cluster_body() {
            out.push(format!("members: {}", body.members.len()));
        }
        if node.network != 0 {
            out.push(format!("network: {}", node.network));
        }
        out
    }
}
