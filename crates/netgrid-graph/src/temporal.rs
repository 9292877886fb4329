use netgrid_core::{Bucketizer, Link, Node};
use serde::{Deserialize, Serialize};

/// Prefix-count maps over the date-ordered node and link arrays: position `b`
/// holds the last array index (1-based) of an entity dated at or before
/// bucket `b`, monotonically nondecreasing, 0 while nothing exists yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBucketIndex {
    pub node_counts: Vec<usize>,
    pub link_counts: Vec<usize>,
}

impl DateBucketIndex {
    pub fn zeroed(buckets: usize) -> Self {
        Self {
            node_counts: vec![0; buckets],
            link_counts: vec![0; buckets],
        }
    }

    pub fn nodes_at(&self, bucket: usize) -> usize {
        prefix_at(&self.node_counts, bucket)
    }

    pub fn links_at(&self, bucket: usize) -> usize {
        prefix_at(&self.link_counts, bucket)
    }
}

pub(crate) fn prefix_at(counts: &[usize], bucket: usize) -> usize {
    match counts.get(bucket) {
        Some(&n) => n,
        None => counts.last().copied().unwrap_or(0),
    }
}

fn fill_prefix(counts: &mut [usize], from: usize, index: usize) {
    for slot in counts.iter_mut().skip(from) {
        *slot = index + 1;
    }
}

/// Build the date-bucket maps for a finalized snapshot and the nested ones
/// for every cluster's member array. Entities without a date land in bucket
/// 0. With a dateless bucketizer the maps stay all-zero and every cluster
/// keeps its unfiltered member view.
pub fn index(nodes: &mut [Node], links: &[Link], bucketizer: &dyn Bucketizer) -> DateBucketIndex {
    let buckets = bucketizer.num_buckets();
    let mut out = DateBucketIndex::zeroed(buckets);

    for node in nodes.iter_mut() {
        if let Some(body) = node.cluster_body_mut() {
            body.visible_members = body.members.len();
            body.member_counts = vec![0; buckets];
        }
    }

    if !bucketizer.has_dates() || buckets == 0 {
        return out;
    }

    for (i, node) in nodes.iter_mut().enumerate() {
        let first = node
            .first_date()
            .map(|d| bucketizer.bucket_index(d))
            .unwrap_or(0);
        fill_prefix(&mut out.node_counts, first, i);

        if let Some(body) = node.cluster_body_mut() {
            for (mi, member) in body.members.iter().enumerate() {
                let member_first = member
                    .first_date()
                    .map(|d| bucketizer.bucket_index(d))
                    .unwrap_or(0);
                fill_prefix(&mut body.member_counts, member_first, mi);
            }
        }
    }

    for (i, link) in links.iter().enumerate() {
        let first = link
            .first_date()
            .map(|d| bucketizer.bucket_index(d))
            .unwrap_or(0);
        fill_prefix(&mut out.link_counts, first, i);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use netgrid_core::{NodeId, NullBucketizer, UniformBucketizer};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    fn dated_node(id: &str, secs: Option<i64>) -> Node {
        let mut node = Node::simple(NodeId::new(id), id, 1.0);
        if let Some(secs) = secs {
            node.dates.push(at(secs));
        }
        node
    }

    #[test]
    fn node_dated_in_bucket_two_fills_two_through_four() {
        let bucketizer = UniformBucketizer::new(at(0), at(100), 5);
        let mut nodes = vec![dated_node("a", Some(45))]; // bucket 2

        let index = index(&mut nodes, &[], &bucketizer);

        assert_eq!(index.node_counts, vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn later_nodes_overwrite_with_larger_prefix_counts() {
        let bucketizer = UniformBucketizer::new(at(0), at(100), 5);
        let mut nodes = vec![
            dated_node("a", None),     // bucket 0
            dated_node("b", Some(45)), // bucket 2
            dated_node("c", Some(90)), // bucket 4
        ];

        let index = index(&mut nodes, &[], &bucketizer);

        assert_eq!(index.node_counts, vec![1, 1, 2, 2, 3]);
        assert_eq!(index.nodes_at(1), 1);
        assert_eq!(index.nodes_at(4), 3);
    }

    #[test]
    fn dateless_bucketizer_leaves_all_zero_maps() {
        let mut nodes = vec![dated_node("a", Some(45))];
        let index = index(&mut nodes, &[], &NullBucketizer);
        assert!(index.node_counts.is_empty());
        assert!(index.link_counts.is_empty());
        assert_eq!(index.nodes_at(3), 0);
    }

    #[test]
    fn clusters_get_nested_member_indices_and_full_views() {
        let bucketizer = UniformBucketizer::new(at(0), at(100), 5);
        let mut cluster = Node::cluster(NodeId::new("c"));
        cluster.dates = vec![at(10), at(70)];
        {
            let body = cluster.cluster_body_mut().expect("cluster body");
            body.members.push(dated_node("m1", Some(10))); // bucket 0
            body.members.push(dated_node("m2", Some(70))); // bucket 3
        }
        let mut nodes = vec![cluster];

        let index = index(&mut nodes, &[], &bucketizer);

        assert_eq!(index.node_counts, vec![1, 1, 1, 1, 1]);
        let body = nodes[0].cluster_body().expect("cluster body");
        assert_eq!(body.member_counts, vec![1, 1, 1, 2, 2]);
        assert_eq!(body.visible_members, 2);
    }

    #[test]
    fn links_index_like_nodes() {
        let bucketizer = UniformBucketizer::new(at(0), at(100), 5);
        let links = vec![
            Link {
                source: 0,
                target: 1,
                key: "link_a_b".to_string(),
                dates: vec![at(45)],
                network: 1,
            },
            Link {
                source: 1,
                target: 2,
                key: "link_b_c".to_string(),
                dates: vec![at(90)],
                network: 1,
            },
        ];
        let index = index(&mut [], &links, &bucketizer);
        assert_eq!(index.link_counts, vec![0, 0, 1, 1, 2]);
    }
}
