use netgrid_core::NodeId;
use serde::{Deserialize, Serialize};

/// Click-selection and hover state for one graph widget. Persists across
/// graph rebuilds; only user interaction (or an externally restored
/// selection) mutates it, and only through [`reduce`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Active playback bucket; `None` shows the full time range.
    pub date_bucket: Option<usize>,
    pub graph_node_ids: Vec<NodeId>,
    pub graph_network_id: Option<u32>,
    pub mouseover_node_ids: Vec<NodeId>,
    pub mouseover_network_id: Option<u32>,
    pub mouseover_key: Option<String>,
}

impl SelectionState {
    pub fn has_selection(&self) -> bool {
        !self.graph_node_ids.is_empty()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.graph_node_ids.contains(id)
    }

    pub fn is_hovered_key(&self, key: &str) -> bool {
        self.mouseover_key.as_deref() == Some(key)
    }
}

/// One user interaction. Clicking a cluster carries all member ids as a
/// single selection unit.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    ClickNode {
        ids: Vec<NodeId>,
        network: u32,
    },
    ClearSelection,
    HoverNode {
        ids: Vec<NodeId>,
        network: u32,
        key: String,
    },
    ClearHover,
    SelectDateBucket(Option<usize>),
}

/// Pure reducer: clicking toggles within the current network, extends the
/// selection inside it, and resets it when jumping to another network; hover
/// is an orthogonal overlay. Effects (redraw, pulse, bus broadcast) are the
/// mediator's concern.
pub fn reduce(state: &SelectionState, event: &SelectionEvent) -> SelectionState {
    let mut next = state.clone();
    match event {
        SelectionEvent::ClickNode { ids, network } => {
            let already_selected =
                !ids.is_empty() && ids.iter().all(|id| next.graph_node_ids.contains(id));
            if already_selected {
                next.graph_node_ids.retain(|id| !ids.contains(id));
                if next.graph_node_ids.is_empty() {
                    next.graph_network_id = None;
                }
            } else if next.graph_network_id == Some(*network) {
                for id in ids {
                    if !next.graph_node_ids.contains(id) {
                        next.graph_node_ids.push(id.clone());
                    }
                }
            } else {
                next.graph_node_ids = ids.clone();
                next.graph_network_id = Some(*network);
            }
        }
        SelectionEvent::ClearSelection => {
            next.graph_node_ids.clear();
            next.graph_network_id = None;
        }
        SelectionEvent::HoverNode { ids, network, key } => {
            next.mouseover_node_ids = ids.clone();
            next.mouseover_network_id = Some(*network);
            next.mouseover_key = Some(key.clone());
        }
        SelectionEvent::ClearHover => {
            next.mouseover_node_ids.clear();
            next.mouseover_network_id = None;
            next.mouseover_key = None;
        }
        SelectionEvent::SelectDateBucket(bucket) => {
            next.date_bucket = *bucket;
        }
    }
    next
}
