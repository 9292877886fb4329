use chrono::{DateTime, Utc};
use netgrid_core::{Link, Node, NodeClass, NodeId};
use std::collections::HashMap;

use crate::builder::RawLink;

#[derive(Debug, Default)]
pub struct FinalizeOutcome {
    pub links: Vec<Link>,
    /// Network containing the first previously-selected node, if any.
    pub selected_network: Option<u32>,
}

fn resolve(id: &NodeId, node_to_cluster: &HashMap<NodeId, NodeId>) -> (NodeId, NodeClass) {
    match node_to_cluster.get(id) {
        Some(cluster_id) => (cluster_id.clone(), NodeClass::Cluster),
        None => (id.clone(), NodeClass::Simple),
    }
}

fn relabel(nodes: &mut [Node], links: &mut [Link], old: u32, new: u32) {
    for node in nodes.iter_mut() {
        if node.network == old {
            node.network = new;
        }
    }
    for link in links.iter_mut() {
        if link.network == old {
            link.network = new;
        }
    }
}

/// Assign connected-component ids to every node and remap id-based raw links
/// to deduplicated index-based links. Links whose endpoints cannot be located
/// (hidden by clustering) are dropped; links folded into the same cluster on
/// both sides vanish too.
pub fn finalize(
    nodes: &mut [Node],
    raw_links: &[RawLink],
    link_dates: &HashMap<(NodeId, NodeId), Vec<DateTime<Utc>>>,
    node_to_cluster: &HashMap<NodeId, NodeId>,
    selected_node_ids: &[NodeId],
) -> FinalizeOutcome {
    let mut index: HashMap<(NodeId, NodeClass), usize> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        index.insert((node.id.clone(), node.class()), i);
    }

    let mut links: Vec<Link> = Vec::new();
    let mut by_pair: HashMap<(usize, usize), usize> = HashMap::new();
    let mut next_network: u32 = 1;

    for raw in raw_links {
        let Some(&si) = index.get(&resolve(&raw.source, node_to_cluster)) else {
            continue;
        };
        let Some(&ti) = index.get(&resolve(&raw.target, node_to_cluster)) else {
            continue;
        };
        if si == ti {
            continue;
        }

        let network = match (nodes[si].network, nodes[ti].network) {
            (0, 0) => {
                let fresh = next_network;
                next_network += 1;
                nodes[si].network = fresh;
                nodes[ti].network = fresh;
                fresh
            }
            (w, 0) => {
                nodes[ti].network = w;
                w
            }
            (0, w) => {
                nodes[si].network = w;
                w
            }
            (a, b) if a == b => a,
            (a, b) => {
                // two labeled components meet: fold the target's network into
                // the source's, nodes and finalized links alike
                relabel(nodes, &mut links, b, a);
                a
            }
        };

        let dates = link_dates.get(&(raw.source.clone(), raw.target.clone()));
        let pair = (si.min(ti), si.max(ti));
        match by_pair.get(&pair) {
            Some(&slot) => {
                if let Some(dates) = dates {
                    links[slot].dates.extend_from_slice(dates);
                }
                links[slot].network = network;
            }
            None => {
                by_pair.insert(pair, links.len());
                links.push(Link {
                    source: si,
                    target: ti,
                    key: format!("link_{}_{}", nodes[si].key, nodes[ti].key),
                    dates: dates.cloned().unwrap_or_default(),
                    network,
                });
            }
        }
    }

    for link in &mut links {
        link.dates.sort_unstable();
    }

    // clusters hand their network down to every member
    for node in nodes.iter_mut() {
        let network = node.network;
        if let Some(body) = node.cluster_body_mut() {
            for member in &mut body.members {
                member.network = network;
            }
        }
    }

    let mut selected_network = None;
    if !selected_node_ids.is_empty() {
        'search: for link in &links {
            let node = &nodes[link.source];
            for id in selected_node_ids {
                if node.contains_id(id) {
                    selected_network = Some(node.network);
                    break 'search;
                }
            }
        }
    }

    tracing::debug!(
        links = links.len(),
        networks = next_network.saturating_sub(1),
        "finalized network labels"
    );

    FinalizeOutcome {
        links,
        selected_network,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::cluster::{cluster, ClusterContext};
    use netgrid_core::{GraphOptions, Row};
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn options() -> GraphOptions {
        let mut opts = GraphOptions::new("src");
        opts.linked_node_field = Some("dst".to_string());
        opts.date_field = Some("time".to_string());
        opts
    }

    fn finalize_rows(values: Vec<Value>, ctx: ClusterContext) -> (Vec<Node>, FinalizeOutcome) {
        let rows: Vec<Row> = values
            .into_iter()
            .map(|v| Row::from_value(v).expect("row object"))
            .collect();
        let built = build(&rows, &options());
        let clustered = cluster(built.nodes, &built.adjacency, &ctx);
        let mut nodes = clustered.nodes;
        let outcome = finalize(
            &mut nodes,
            &built.links,
            &built.adjacency.link_dates,
            &clustered.node_to_cluster,
            &[],
        );
        (nodes, outcome)
    }

    fn link_rows(pairs: &[(&str, &str)]) -> Vec<Value> {
        pairs
            .iter()
            .map(|(s, t)| json!({"src": s, "dst": t}))
            .collect()
    }

    #[test]
    fn opposite_direction_links_collapse_to_one() {
        let (nodes, outcome) =
            finalize_rows(link_rows(&[("A", "B"), ("B", "A")]), ClusterContext::default());

        assert_eq!(nodes.len(), 2);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(nodes[0].network, nodes[1].network);
        assert_ne!(nodes[0].network, 0);
    }

    #[test]
    fn no_unordered_pair_appears_twice() {
        let (_, outcome) = finalize_rows(
            link_rows(&[("A", "B"), ("B", "C"), ("B", "A"), ("C", "B"), ("A", "B")]),
            ClusterContext::default(),
        );

        let mut seen = HashSet::new();
        for link in &outcome.links {
            let pair = (link.source.min(link.target), link.source.max(link.target));
            assert!(seen.insert(pair), "duplicate pair {pair:?}");
        }
        assert_eq!(outcome.links.len(), 2);
    }

    #[test]
    fn chains_share_one_network_and_islands_do_not() {
        let (nodes, _) = finalize_rows(
            link_rows(&[("A", "B"), ("B", "C"), ("X", "Y")]),
            ClusterContext::default(),
        );

        let by_id = |id: &str| {
            nodes
                .iter()
                .find(|n| n.id == NodeId::new(id))
                .expect("node")
                .network
        };
        assert_eq!(by_id("A"), by_id("B"));
        assert_eq!(by_id("B"), by_id("C"));
        assert_ne!(by_id("A"), by_id("X"));
        assert_eq!(by_id("X"), by_id("Y"));
    }

    #[test]
    fn late_bridge_links_merge_two_labeled_networks() {
        // A-B and C-D get distinct ids first; D-A folds them together,
        // relabeling the already-finalized links too
        let (nodes, outcome) = finalize_rows(
            link_rows(&[("A", "B"), ("C", "D"), ("D", "A")]),
            ClusterContext::default(),
        );

        let networks: HashSet<u32> = nodes.iter().map(|n| n.network).collect();
        assert_eq!(networks.len(), 1);
        let w = *networks.iter().next().expect("network id");
        assert!(outcome.links.iter().all(|l| l.network == w));
    }

    #[test]
    fn cluster_members_inherit_the_cluster_network() {
        let ctx = ClusterContext {
            use_node_clusters: true,
            ..ClusterContext::default()
        };
        let (nodes, _) = finalize_rows(
            link_rows(&[("leaf1", "hub"), ("leaf2", "hub"), ("hub", "x")]),
            ctx,
        );

        let cluster_node = nodes.iter().find(|n| n.is_cluster()).expect("cluster");
        assert_ne!(cluster_node.network, 0);
        for member in cluster_node.members() {
            assert_eq!(member.network, cluster_node.network);
        }
    }

    #[test]
    fn merged_member_links_union_their_dates() {
        let ctx = ClusterContext {
            use_node_clusters: true,
            ..ClusterContext::default()
        };
        let (nodes, outcome) = finalize_rows(
            vec![
                json!({"src": "leaf1", "dst": "hub", "time": "2024-01-02T00:00:00Z"}),
                json!({"src": "leaf2", "dst": "hub", "time": "2024-01-01T00:00:00Z"}),
                json!({"src": "hub", "dst": "x"}),
                json!({"src": "x", "dst": "w"}),
            ],
            ctx,
        );

        // both leaf links resolve to cluster→hub and merge
        let cluster_index = nodes.iter().position(|n| n.is_cluster()).expect("cluster");
        let merged = outcome
            .links
            .iter()
            .find(|l| l.source == cluster_index || l.target == cluster_index)
            .expect("cluster link");
        assert_eq!(merged.dates.len(), 2);
        assert!(merged.dates[0] <= merged.dates[1]);
        assert_eq!(outcome.links.len(), 3);
    }

    #[test]
    fn selected_node_resolves_its_network() {
        let rows: Vec<Row> = link_rows(&[("A", "B"), ("X", "Y")])
            .into_iter()
            .map(|v| Row::from_value(v).expect("row object"))
            .collect();
        let built = build(&rows, &options());
        let clustered = cluster(built.nodes, &built.adjacency, &ClusterContext::default());
        let mut nodes = clustered.nodes;
        let outcome = finalize(
            &mut nodes,
            &built.links,
            &built.adjacency.link_dates,
            &clustered.node_to_cluster,
            &[NodeId::new("X")],
        );

        let x = nodes
            .iter()
            .find(|n| n.id == NodeId::new("X"))
            .expect("node X");
        assert_eq!(outcome.selected_network, Some(x.network));
    }

    #[test]
    fn links_to_hidden_nodes_are_dropped() {
        let ctx = ClusterContext {
            hide_simple_networks: true,
            use_node_clusters: false,
            ..ClusterContext::default()
        };
        // the lone pair disappears at the cluster stage; its link must not
        // survive finalization
        let (nodes, outcome) = finalize_rows(
            link_rows(&[("a", "b"), ("c", "d"), ("d", "e"), ("e", "c")]),
            ctx,
        );

        assert!(nodes.iter().all(|n| n.id != NodeId::new("a")));
        assert_eq!(outcome.links.len(), 3);
        for link in &outcome.links {
            assert!(link.source < nodes.len());
            assert!(link.target < nodes.len());
        }
    }
}
