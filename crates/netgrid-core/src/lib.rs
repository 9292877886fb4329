pub mod bucket;
pub mod options;
pub mod row;

pub use bucket::{Bucketizer, NullBucketizer, UniformBucketizer};
pub use options::{FlagMode, GraphOptions};
pub use row::Row;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind discriminant used when locating a node by id: a cluster may reuse the
/// id of an original node, so lookups go through (id, class).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    Simple,
    Cluster,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeKind {
    Simple,
    Cluster(ClusterBody),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterBody {
    /// Member nodes in date order once the pipeline has published a snapshot.
    pub members: Vec<Node>,
    /// bucket index -> last member array-index at or before it, 1-based
    /// (0 = no member yet).
    pub member_counts: Vec<usize>,
    /// Prefix of `members` visible for the selected date bucket; the full
    /// list until a bucket is chosen.
    pub visible_members: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub key: String,
    pub name: String,
    pub size: f64,
    /// Sorted ascending in published snapshots.
    pub dates: Vec<DateTime<Utc>>,
    /// Connected-component id; 0 = unassigned.
    pub network: u32,
    /// Distinct upstream neighbors.
    pub sources: usize,
    /// Distinct downstream neighbors.
    pub targets: usize,
    pub flag: bool,
    /// True when the id occurred in the primary result column of some row,
    /// not only as a linked value.
    pub in_data: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn simple(id: NodeId, name: impl Into<String>, size: f64) -> Self {
        let key = format!("node_{id}");
        Self {
            id,
            key,
            name: name.into(),
            size,
            dates: Vec::new(),
            network: 0,
            sources: 0,
            targets: 0,
            flag: false,
            in_data: false,
            kind: NodeKind::Simple,
        }
    }

    pub fn cluster(id: NodeId) -> Self {
        let key = format!("cluster_{id}");
        Self {
            id,
            key,
            name: String::new(),
            size: 0.0,
            dates: Vec::new(),
            network: 0,
            sources: 0,
            targets: 0,
            flag: false,
            in_data: false,
            kind: NodeKind::Cluster(ClusterBody::default()),
        }
    }

    pub fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Simple => NodeClass::Simple,
            NodeKind::Cluster(_) => NodeClass::Cluster,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, NodeKind::Cluster(_))
    }

    pub fn members(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Simple => &[],
            NodeKind::Cluster(body) => &body.members,
        }
    }

    pub fn cluster_body(&self) -> Option<&ClusterBody> {
        match &self.kind {
            NodeKind::Simple => None,
            NodeKind::Cluster(body) => Some(body),
        }
    }

    pub fn cluster_body_mut(&mut self) -> Option<&mut ClusterBody> {
        match &mut self.kind {
            NodeKind::Simple => None,
            NodeKind::Cluster(body) => Some(body),
        }
    }

    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.dates.first().copied()
    }

    /// Whether `id` names this node or one of its cluster members.
    pub fn contains_id(&self, id: &NodeId) -> bool {
        if &self.id == id && !self.is_cluster() {
            return true;
        }
        self.members().iter().any(|m| &m.id == id)
    }
}

/// A finalized link. `source`/`target` index into the snapshot's node array,
/// not semantic ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub key: String,
    /// Sorted ascending; one entry per dated occurrence of the edge.
    pub dates: Vec<DateTime<Utc>>,
    pub network: u32,
}

impl Link {
    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.dates.first().copied()
    }
}
