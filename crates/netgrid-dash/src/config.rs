use anyhow::Context;
use directories::ProjectDirs;
use netgrid_core::{FlagMode, GraphOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::query::QueryDescriptor;

/// Persisted configuration for one graph widget: field bindings, clustering
/// toggles, the time axis, and the base query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
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

    pub date_buckets: usize,
    pub search: String,
    pub query_fields: Vec<String>,
    pub max_rows: usize,
}

impl Default for DashboardConfig {
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
            date_buckets: 30,
            search: String::new(),
            query_fields: Vec::new(),
            max_rows: 10_000,
        }
    }
}

impl DashboardConfig {
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            node_field: self.node_field.clone(),
            name_field: self.name_field.clone(),
            size_field: self.size_field.clone(),
            flag_field: self.flag_field.clone(),
            date_field: self.date_field.clone(),
            linked_node_field: self.linked_node_field.clone(),
            linked_name_field: self.linked_name_field.clone(),
            linked_size_field: self.linked_size_field.clone(),
            flag_mode: self.flag_mode,
            hide_simple_networks: self.hide_simple_networks,
            use_node_clusters: self.use_node_clusters,
        }
    }

    pub fn base_query(&self) -> QueryDescriptor {
        QueryDescriptor {
            search: self.search.clone(),
            fields: self.query_fields.clone(),
            earliest: None,
            latest: None,
            max_rows: self.max_rows,
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "netgrid")?;
    Some(proj.config_dir().join("dashboard.toml"))
}

pub fn load_or_default() -> DashboardConfig {
    let Some(path) = config_file_path() else {
        return DashboardConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> DashboardConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return DashboardConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|_| DashboardConfig::default())
}

pub fn save(cfg: &DashboardConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

fn save_to_path(cfg: &DashboardConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize dashboard config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write dashboard config {}", path.display()))?;
    Ok(())
}
