use netgrid_core::{Link, Node};

/// Drawing is out of scope here: the hosting page hands each rebuilt snapshot
/// to its SVG/DOM layer through this trait and queries the pure style
/// functions in `netgrid_graph::style` per element. Incremental DOM diffing,
/// if any, happens behind `update_graph`.
pub trait GraphRenderer {
    fn update_graph(&mut self, nodes: &[Node], links: &[Link]);
    /// Pulse the entities with the given keys (date-bucket scrub landed on
    /// their dates).
    fn request_pulse(&mut self, keys: &[String]);
    fn request_redraw(&mut self);
}

/// Renderer that only records what it was asked to draw; the default for
/// headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub updates: usize,
    pub last_node_keys: Vec<String>,
    pub last_link_keys: Vec<String>,
    pub pulsed_keys: Vec<String>,
    pub redraw_requests: usize,
}

impl GraphRenderer for RecordingRenderer {
    fn update_graph(&mut self, nodes: &[Node], links: &[Link]) {
        self.updates += 1;
        self.last_node_keys = nodes.iter().map(|n| n.key.clone()).collect();
        self.last_link_keys = links.iter().map(|l| l.key.clone()).collect();
    }

    fn request_pulse(&mut self, keys: &[String]) {
        self.pulsed_keys = keys.to_vec();
    }

    fn request_redraw(&mut self) {
        self.redraw_requests += 1;
    }
}
