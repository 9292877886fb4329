use netgrid_core::{Link, Node};

use crate::selection::SelectionState;

pub const NODE_FILL: &str = "#1f77b4";
pub const CLUSTER_FILL: &str = "#9467bd";
pub const FLAGGED_FILL: &str = "#d62728";
pub const SELECTED_FILL: &str = "#ff7f0e";
pub const NETWORK_FILL: &str = "#2ca02c";
pub const HOVER_FILL: &str = "#17becf";
pub const LINK_STROKE: &str = "#999999";

pub const DIMMED_OPACITY: f64 = 0.25;
pub const HOVER_DIMMED_OPACITY: f64 = 0.6;

/// Logarithmic size boost: one multiplier step per decade, plus a half-step
/// once the value passes the decade's midpoint (where round exceeds floor).
pub fn size_log_scale(count: f64, multiplier: f64) -> f64 {
    if count < 1.0 {
        return 0.0;
    }
    let log = count.log10();
    let base = log.floor();
    if log.round() > base {
        (base + 0.5) * multiplier
    } else {
        base * multiplier
    }
}

pub fn node_size(node: &Node) -> f64 {
    10.0 + size_log_scale(node.size, 2.0).min(20.0)
}

pub fn link_width(link: &Link) -> f64 {
    2.0 + size_log_scale(link.dates.len() as f64, 1.0).min(10.0)
}

pub fn node_color(node: &Node, selection: &SelectionState) -> &'static str {
    let selected = selection
        .graph_node_ids
        .iter()
        .any(|id| node.contains_id(id));
    if selected {
        SELECTED_FILL
    } else if node.flag {
        FLAGGED_FILL
    } else if node.network != 0 && selection.graph_network_id == Some(node.network) {
        NETWORK_FILL
    } else if selection.is_hovered_key(&node.key)
        || selection
            .mouseover_node_ids
            .iter()
            .any(|id| node.contains_id(id))
    {
        HOVER_FILL
    } else if node.is_cluster() {
        CLUSTER_FILL
    } else {
        NODE_FILL
    }
}

pub fn node_opacity(node: &Node, selection: &SelectionState) -> f64 {
    if let Some(network) = selection.graph_network_id {
        if network != 0 {
            return if node.network == network {
                1.0
            } else {
                DIMMED_OPACITY
            };
        }
    }
    if let Some(network) = selection.mouseover_network_id {
        if network != 0 {
            return if node.network == network {
                1.0
            } else {
                HOVER_DIMMED_OPACITY
            };
        }
    }
    1.0
}

pub fn link_color(link: &Link, selection: &SelectionState) -> &'static str {
    if link.network != 0 && selection.graph_network_id == Some(link.network) {
        SELECTED_FILL
    } else if link.network != 0 && selection.mouseover_network_id == Some(link.network) {
        HOVER_FILL
    } else {
        LINK_STROKE
    }
}

pub fn link_opacity(link: &Link, selection: &SelectionState) -> f64 {
    if let Some(network) = selection.graph_network_id {
        if network != 0 {
            return if link.network == network {
                1.0
            } else {
                DIMMED_OPACITY
            };
        }
    }
    1.0
}
