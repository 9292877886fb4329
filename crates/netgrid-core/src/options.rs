use serde::{Deserialize, Serialize};

/// Which row role carries the flag field to the node: the primary result
/// value, the linked value, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagMode {
    Result,
    Linked,
    All,
}

impl Default for FlagMode {
    fn default() -> Self {
        Self::Result
    }
}

/// Field bindings and clustering toggles for one graph widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub node_field: String,
    pub name_field: Option<String>,
    pub size_field: Option<String>,
    pub flag_field: Option<String>,
    pub date_field: Option<String>,
    pub linked_node_field: Option<String>,
    pub linked_name_field: Option<String>,
    pub linked_size_field: Option<String>,
    pub flag_mode: FlagMode,
    pub hide_simple_networks: bool,
    pub use_node_clusters: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            node_field: String::new(),
            name_field: None,
            size_field: None,
            flag_field: None,
            date_field: None,
            linked_node_field: None,
            linked_name_field: None,
            linked_size_field: None,
            flag_mode: FlagMode::default(),
            hide_simple_networks: false,
            use_node_clusters: true,
        }
    }
}

impl GraphOptions {
    pub fn new(node_field: impl Into<String>) -> Self {
        Self {
            node_field: node_field.into(),
            ..Self::default()
        }
    }
}
