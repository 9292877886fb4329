use chrono::{DateTime, Utc};
use netgrid_core::{row, FlagMode, GraphOptions, Node, NodeId, Row};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;

type Neighbors = SmallVec<[NodeId; 4]>;

/// Directed adjacency gathered while scanning rows. The two direction maps
/// stay symmetric: every (source → target) entry has its mirror.
#[derive(Debug, Default)]
pub struct Adjacency {
    pub sources_to_targets: HashMap<NodeId, Neighbors>,
    pub targets_to_sources: HashMap<NodeId, Neighbors>,
    pub link_dates: HashMap<(NodeId, NodeId), Vec<DateTime<Utc>>>,
}

impl Adjacency {
    pub fn targets_of(&self, id: &NodeId) -> &[NodeId] {
        self.sources_to_targets
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn sources_of(&self, id: &NodeId) -> &[NodeId] {
        self.targets_to_sources
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct neighbors in either direction.
    pub fn neighbor_count(&self, id: &NodeId) -> usize {
        let targets = self.targets_of(id);
        targets.len()
            + self
                .sources_of(id)
                .iter()
                .filter(|n| !targets.contains(n))
                .count()
    }

    /// Whether `id` is linked to anything besides `other`.
    pub fn has_neighbor_other_than(&self, id: &NodeId, other: &NodeId) -> bool {
        self.targets_of(id)
            .iter()
            .chain(self.sources_of(id))
            .any(|n| n != other)
    }

    /// Returns false when the directed edge was already registered.
    fn insert(&mut self, source: &NodeId, target: &NodeId) -> bool {
        let targets = self.sources_to_targets.entry(source.clone()).or_default();
        if targets.contains(target) {
            return false;
        }
        targets.push(target.clone());
        self.targets_to_sources
            .entry(target.clone())
            .or_default()
            .push(source.clone());
        true
    }
}

/// A not-yet-finalized directed link between semantic node ids, kept in
/// first-seen row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Default)]
pub struct BuiltGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<RawLink>,
    pub adjacency: Adjacency,
}

#[derive(Default)]
struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl NodeRegistry {
    /// Create or update a node. Later occurrences keep the most recent
    /// non-empty name and the maximum size seen so far.
    fn upsert(
        &mut self,
        id: &NodeId,
        name: Option<String>,
        size: Option<f64>,
        date: Option<DateTime<Utc>>,
        primary: bool,
    ) -> usize {
        match self.index.get(id) {
            Some(&i) => {
                let node = &mut self.nodes[i];
                if let Some(name) = name {
                    node.name = name;
                }
                if let Some(size) = size {
                    node.size = node.size.max(size);
                }
                if let Some(date) = date {
                    node.dates.push(date);
                }
                node.in_data |= primary;
                i
            }
            None => {
                let name = name.unwrap_or_else(|| id.0.clone());
                let mut node = Node::simple(id.clone(), name, size.unwrap_or(1.0));
                if let Some(date) = date {
                    node.dates.push(date);
                }
                node.in_data = primary;
                let i = self.nodes.len();
                self.index.insert(id.clone(), i);
                self.nodes.push(node);
                i
            }
        }
    }

    fn flag(&mut self, i: usize) {
        self.nodes[i].flag = true;
    }
}

/// One expanded value combination of a row's configured fields.
struct Combo<'a> {
    node: Option<&'a Value>,
    name: Option<&'a Value>,
    size: Option<&'a Value>,
    flag: Option<&'a Value>,
    date: Option<&'a Value>,
    linked: Option<&'a Value>,
    linked_name: Option<&'a Value>,
    linked_size: Option<&'a Value>,
}

/// Nested value expansion: visit the cross-product of the configured fields'
/// (possibly array-valued) entries.
fn for_each_combo<'a>(row: &'a Row, options: &GraphOptions, mut visit: impl FnMut(Combo<'a>)) {
    let fields = [
        row.field_values(Some(options.node_field.as_str())),
        row.field_values(options.name_field.as_deref()),
        row.field_values(options.size_field.as_deref()),
        row.field_values(options.flag_field.as_deref()),
        row.field_values(options.date_field.as_deref()),
        row.field_values(options.linked_node_field.as_deref()),
        row.field_values(options.linked_name_field.as_deref()),
        row.field_values(options.linked_size_field.as_deref()),
    ];
    let mut at = [0usize; 8];
    loop {
        visit(Combo {
            node: fields[0][at[0]],
            name: fields[1][at[1]],
            size: fields[2][at[2]],
            flag: fields[3][at[3]],
            date: fields[4][at[4]],
            linked: fields[5][at[5]],
            linked_name: fields[6][at[6]],
            linked_size: fields[7][at[7]],
        });

        // odometer increment, most-nested field first
        let mut pos = fields.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            at[pos] += 1;
            if at[pos] < fields[pos].len() {
                break;
            }
            at[pos] = 0;
        }
    }
}

/// Turn flat query-result rows into deduplicated nodes, directed raw links,
/// and the adjacency maps the later stages consume. Combinations without a
/// node-field value are skipped; malformed optional fields fall back to
/// defaults.
pub fn build(rows: &[Row], options: &GraphOptions) -> BuiltGraph {
    let mut registry = NodeRegistry::default();
    let mut adjacency = Adjacency::default();
    let mut links: Vec<RawLink> = Vec::new();

    for row in rows {
        for_each_combo(row, options, |combo| {
            let Some(id) = combo.node.and_then(row::id_text) else {
                return;
            };
            let node_id = NodeId::new(id);
            let date = combo.date.and_then(row::as_date);
            let flagged = combo.flag.map(row::as_flag).unwrap_or(false);

            let primary = registry.upsert(
                &node_id,
                combo.name.and_then(row::as_text),
                combo.size.and_then(row::as_number),
                date,
                true,
            );
            if flagged && matches!(options.flag_mode, FlagMode::Result | FlagMode::All) {
                registry.flag(primary);
            }

            let Some(linked_id) = combo.linked.and_then(row::id_text).map(NodeId::new) else {
                return;
            };
            if linked_id == node_id {
                return;
            }

            let linked = registry.upsert(
                &linked_id,
                combo.linked_name.and_then(row::as_text),
                combo.linked_size.and_then(row::as_number),
                date,
                false,
            );
            if flagged && matches!(options.flag_mode, FlagMode::Linked | FlagMode::All) {
                registry.flag(linked);
            }

            if adjacency.insert(&node_id, &linked_id) {
                links.push(RawLink {
                    source: node_id.clone(),
                    target: linked_id.clone(),
                });
            }
            if let Some(date) = date {
                adjacency
                    .link_dates
                    .entry((node_id, linked_id))
                    .or_default()
                    .push(date);
            }
        });
    }

    let mut nodes = registry.nodes;
    for node in &mut nodes {
        node.dates.sort_unstable();
    }

    tracing::debug!(
        rows = rows.len(),
        nodes = nodes.len(),
        links = links.len(),
        "rows expanded into graph entities"
    );

    BuiltGraph {
        nodes,
        links,
        adjacency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| Row::from_value(v).expect("row object"))
            .collect()
    }

    fn options() -> GraphOptions {
        GraphOptions {
            node_field: "src".to_string(),
            linked_node_field: Some("dst".to_string()),
            name_field: Some("name".to_string()),
            size_field: Some("count".to_string()),
            flag_field: Some("alert".to_string()),
            date_field: Some("time".to_string()),
            ..GraphOptions::default()
        }
    }

    #[test]
    fn directed_links_are_deduplicated_per_pair() {
        let built = build(
            &rows(vec![
                json!({"src": "A", "dst": "B"}),
                json!({"src": "A", "dst": "B"}),
                json!({"src": "B", "dst": "A"}),
            ]),
            &options(),
        );

        assert_eq!(built.nodes.len(), 2);
        assert_eq!(built.links.len(), 2); // A→B once, B→A once
        assert_eq!(built.adjacency.targets_of(&NodeId::new("A")).len(), 1);
        assert_eq!(built.adjacency.sources_of(&NodeId::new("A")).len(), 1);
    }

    #[test]
    fn rows_without_node_value_are_skipped() {
        let built = build(
            &rows(vec![
                json!({"dst": "B"}),
                json!({"src": null, "dst": "B"}),
                json!({"src": "", "dst": "B"}),
                json!({"src": 0, "dst": "B"}),
            ]),
            &options(),
        );
        assert!(built.nodes.is_empty());
        assert!(built.links.is_empty());
    }

    #[test]
    fn name_takes_most_recent_non_empty_and_size_takes_max() {
        let built = build(
            &rows(vec![
                json!({"src": "A", "name": "first", "count": 5}),
                json!({"src": "A", "count": 2}),
                json!({"src": "A", "name": "latest"}),
            ]),
            &options(),
        );

        assert_eq!(built.nodes.len(), 1);
        assert_eq!(built.nodes[0].name, "latest");
        assert_eq!(built.nodes[0].size, 5.0);
    }

    #[test]
    fn missing_name_falls_back_to_id_and_missing_size_to_one() {
        let built = build(&rows(vec![json!({"src": "A"})]), &options());
        assert_eq!(built.nodes[0].name, "A");
        assert_eq!(built.nodes[0].size, 1.0);
    }

    #[test]
    fn nested_arrays_expand_to_cross_product() {
        let built = build(
            &rows(vec![json!({"src": ["A", "B"], "dst": ["C", "D"]})]),
            &options(),
        );

        assert_eq!(built.nodes.len(), 4);
        assert_eq!(built.links.len(), 4);
        let a = NodeId::new("A");
        assert_eq!(built.adjacency.targets_of(&a).len(), 2);
    }

    #[test]
    fn self_links_are_ignored() {
        let built = build(&rows(vec![json!({"src": "A", "dst": "A"})]), &options());
        assert_eq!(built.nodes.len(), 1);
        assert!(built.links.is_empty());
    }

    #[test]
    fn linked_only_nodes_are_not_in_data() {
        let built = build(&rows(vec![json!({"src": "A", "dst": "B"})]), &options());
        let b = built
            .nodes
            .iter()
            .find(|n| n.id == NodeId::new("B"))
            .expect("linked node");
        assert!(!b.in_data);
        assert!(built.nodes[0].in_data);
    }

    #[test]
    fn flag_mode_result_flags_only_the_primary_node() {
        let built = build(
            &rows(vec![json!({"src": "A", "dst": "B", "alert": true})]),
            &options(),
        );
        assert!(built.nodes[0].flag);
        assert!(!built.nodes[1].flag);
    }

    #[test]
    fn flag_mode_all_flags_both_roles_and_never_downgrades() {
        let mut opts = options();
        opts.flag_mode = FlagMode::All;
        let built = build(
            &rows(vec![
                json!({"src": "A", "dst": "B", "alert": true}),
                json!({"src": "A", "dst": "B", "alert": false}),
            ]),
            &opts,
        );
        assert!(built.nodes[0].flag);
        assert!(built.nodes[1].flag);
    }

    #[test]
    fn edge_dates_accumulate_even_when_the_edge_exists() {
        let built = build(
            &rows(vec![
                json!({"src": "A", "dst": "B", "time": "2024-01-01T00:00:00Z"}),
                json!({"src": "A", "dst": "B", "time": "2024-01-02T00:00:00Z"}),
            ]),
            &options(),
        );

        assert_eq!(built.links.len(), 1);
        let dates = built
            .adjacency
            .link_dates
            .get(&(NodeId::new("A"), NodeId::new("B")))
            .expect("edge dates");
        assert_eq!(dates.len(), 2);
        // both endpoints carry the occurrence dates
        assert_eq!(built.nodes[0].dates.len(), 2);
        assert_eq!(built.nodes[1].dates.len(), 2);
    }

    #[test]
    fn node_dates_are_sorted_ascending() {
        let built = build(
            &rows(vec![
                json!({"src": "A", "time": "2024-02-01T00:00:00Z"}),
                json!({"src": "A", "time": "2024-01-01T00:00:00Z"}),
            ]),
            &options(),
        );
        let dates = &built.nodes[0].dates;
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }
}
