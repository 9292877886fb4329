use netgrid_core::{Bucketizer, GraphOptions, Link, Node, NodeId, Row};
use netgrid_graph::{evaluate, reduce, style, GraphSnapshot, SelectionEvent, SelectionState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Counters for the widget's status row.
#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    pub rebuilds: u64,
    pub nodes: usize,
    pub links: usize,
    pub networks: usize,
    pub last_duration: Duration,
}

/// Side effects a state change asks the host to perform. The mediator never
/// touches the renderer or the bus itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Redraw,
    Pulse(Vec<String>),
    BroadcastSelection(Vec<NodeId>),
}

/// Owns one graph widget's options, selection, and current snapshot. Every
/// `evaluate_rows` call rebuilds the snapshot from scratch; the selection
/// survives rebuilds and its network id is re-resolved against the new
/// graph.
pub struct GraphMediator {
    options: GraphOptions,
    selection: SelectionState,
    snapshot: GraphSnapshot,
    stats: RebuildStats,
    needs_redraw: AtomicBool,
}

impl GraphMediator {
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            selection: SelectionState::default(),
            snapshot: GraphSnapshot::default(),
            stats: RebuildStats::default(),
            needs_redraw: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Takes effect on the next `evaluate_rows`.
    pub fn set_options(&mut self, options: GraphOptions) {
        self.options = options;
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn stats(&self) -> &RebuildStats {
        &self.stats
    }

    // ----- Rebuild -----

    pub fn evaluate_rows(&mut self, rows: &[Row], bucketizer: &dyn Bucketizer) {
        let started = Instant::now();
        let (mut snapshot, selected_network) = evaluate(
            rows,
            &self.options,
            bucketizer,
            &self.selection.graph_node_ids,
        );
        snapshot.apply_date_bucket(self.selection.date_bucket);
        self.selection.graph_network_id = selected_network;

        self.stats.rebuilds += 1;
        self.stats.nodes = snapshot.nodes.len();
        self.stats.links = snapshot.links.len();
        self.stats.networks = snapshot.network_count();
        self.stats.last_duration = started.elapsed();

        self.snapshot = snapshot;
        self.needs_redraw.store(true, Ordering::Relaxed);
        tracing::debug!(
            rebuilds = self.stats.rebuilds,
            nodes = self.stats.nodes,
            links = self.stats.links,
            networks = self.stats.networks,
            "mediator rebuilt graph state"
        );
    }

    /// Drop graph state and selection, e.g. when the widget is reconfigured.
    pub fn clear(&mut self) {
        self.snapshot = GraphSnapshot::default();
        self.selection = SelectionState::default();
        self.needs_redraw.store(true, Ordering::Relaxed);
    }

    // ----- Selection restore / queries -----

    /// Restore a selection broadcast from elsewhere; the network id resolves
    /// on the next rebuild.
    pub fn set_selected_node_ids(&mut self, ids: Vec<NodeId>) {
        self.selection.graph_node_ids = ids;
        self.selection.graph_network_id = None;
        self.needs_redraw.store(true, Ordering::Relaxed);
    }

    pub fn selected_node_ids(&self) -> &[NodeId] {
        &self.selection.graph_node_ids
    }

    pub fn node_ids_in_selected_network(&self) -> Vec<NodeId> {
        match self.selection.graph_network_id {
            Some(network) => self.snapshot.node_ids_in_network(network),
            None => Vec::new(),
        }
    }

    // ----- Interaction handlers -----

    pub fn click_node_key(&mut self, key: &str) -> Vec<Effect> {
        let Some(index) = self.snapshot.node_index_by_key(key) else {
            return Vec::new();
        };
        let node = &self.snapshot.nodes[index];
        let event = SelectionEvent::ClickNode {
            ids: selection_unit(node),
            network: node.network,
        };
        self.apply_selection(event);
        vec![
            Effect::Redraw,
            Effect::BroadcastSelection(self.selection.graph_node_ids.clone()),
        ]
    }

    pub fn clear_selection(&mut self) -> Vec<Effect> {
        self.apply_selection(SelectionEvent::ClearSelection);
        vec![Effect::Redraw, Effect::BroadcastSelection(Vec::new())]
    }

    pub fn hover_node_key(&mut self, key: &str) -> Vec<Effect> {
        let Some(index) = self.snapshot.node_index_by_key(key) else {
            return Vec::new();
        };
        let node = &self.snapshot.nodes[index];
        let event = SelectionEvent::HoverNode {
            ids: selection_unit(node),
            network: node.network,
            key: node.key.clone(),
        };
        self.apply_selection(event);
        vec![Effect::Redraw]
    }

    pub fn clear_hover(&mut self) -> Vec<Effect> {
        self.apply_selection(SelectionEvent::ClearHover);
        vec![Effect::Redraw]
    }

    /// Scrub to a date bucket: re-slice the visible arrays and pulse whatever
    /// is dated exactly there.
    pub fn select_date_bucket(
        &mut self,
        bucket: Option<usize>,
        bucketizer: &dyn Bucketizer,
    ) -> Vec<Effect> {
        self.apply_selection(SelectionEvent::SelectDateBucket(bucket));
        self.snapshot.apply_date_bucket(bucket);

        let mut effects = vec![Effect::Redraw];
        if let Some(bucket) = bucket {
            let keys = self.snapshot.pulse_keys(bucket, bucketizer);
            if !keys.is_empty() {
                effects.push(Effect::Pulse(keys));
            }
        }
        effects
    }

    fn apply_selection(&mut self, event: SelectionEvent) {
        self.selection = reduce(&self.selection, &event);
        self.needs_redraw.store(true, Ordering::Relaxed);
    }

    // ----- Render-loop surface -----

    /// Swap out the redraw flag; the render loop polls this once per frame.
    pub fn take_redraw_request(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::Relaxed)
    }

    pub fn visible_nodes(&self) -> &[Node] {
        self.snapshot.visible_nodes(self.selection.date_bucket)
    }

    pub fn visible_links(&self) -> &[Link] {
        self.snapshot.visible_links(self.selection.date_bucket)
    }

    // ----- Per-entity style callbacks -----

    pub fn node_size(&self, node: &Node) -> f64 {
        style::node_size(node)
    }

    pub fn node_color(&self, node: &Node) -> &'static str {
        style::node_color(node, &self.selection)
    }

    pub fn node_opacity(&self, node: &Node) -> f64 {
        style::node_opacity(node, &self.selection)
    }

    pub fn link_width(&self, link: &Link) -> f64 {
        style::link_width(link)
    }

    pub fn link_color(&self, link: &Link) -> &'static str {
        style::link_color(link, &self.selection)
    }

    pub fn link_opacity(&self, link: &Link) -> f64 {
        style::link_opacity(link, &self.selection)
    }
}

/// What one click or hover on a node means id-wise: a cluster acts as its
/// whole member set.
fn selection_unit(node: &Node) -> Vec<NodeId> {
    if node.is_cluster() {
        node.members().iter().map(|m| m.id.clone()).collect()
    } else {
        vec![node.id.clone()]
    }
}
