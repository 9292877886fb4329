pub mod builder;
pub mod cluster;
pub mod network;
pub mod selection;
pub mod snapshot;
pub mod style;
pub mod temporal;

pub use builder::{Adjacency, BuiltGraph, RawLink};
pub use cluster::{ClusterContext, ClusteredGraph};
pub use network::FinalizeOutcome;
pub use selection::{reduce, SelectionEvent, SelectionState};
pub use snapshot::{evaluate, GraphSnapshot};
pub use temporal::DateBucketIndex;
