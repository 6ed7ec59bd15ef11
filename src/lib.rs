#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]
#![doc = include_str!("../README.md")]

///
/// Event logs: event-type vocabulary plus per-case ordered traces
///
pub mod event_log {
    /// [`EventLog`] struct and sub-structs
    pub mod event_log_struct;

    pub use event_log_struct::{Event, EventInstance, EventLog, EventLogError, Trace};
}

///
/// Relation mining with a bounded lookahead window
///
pub mod relations {
    /// [`KSuccessorTable`] struct and relation types
    pub mod succession;

    #[doc(inline)]
    pub use succession::{KSuccessorTable, Relation, RelationKind};
}

///
/// Discovered flow models with synthetic START/END nodes
///
pub mod flow_model {
    /// [`FlowModel`] struct
    pub mod flow_model_struct;

    #[doc(inline)]
    pub use flow_model_struct::FlowModel;
}

///
/// Graph coarsening by repeated node contraction
///
pub mod clustering {
    /// Shared node/edge bookkeeping and the contraction primitive
    pub mod cluster_graph;
    /// Greedy, topology-driven clustering by fan-in/fan-out
    pub mod fan;
    /// Layout-graph materialization and DOT emission
    ///
    /// The layout-engine invocation itself requires the `graphviz-export`
    /// feature and an active graphviz installation in the PATH.
    /// See also <https://graphviz.org/download/>
    pub mod image_export;
    /// One-shot, attribute-driven hierarchical clustering
    pub mod property;

    #[doc(inline)]
    pub use cluster_graph::ClusterGraph;
}

/// Batched export of discovered models to an external graph store
pub mod graph_db;

/// Full discovery pipeline: mine relations, build the model, coarsen the graph
pub mod discovery;

/// Util module with smaller helper functions, structs or enums
pub mod utils;

#[doc(inline)]
pub use discovery::{discover_and_cluster, ClusteringStrategy};

#[doc(inline)]
pub use event_log::event_log_struct::EventLog;

#[doc(inline)]
pub use relations::succession::KSuccessorTable;

#[doc(inline)]
pub use flow_model::flow_model_struct::FlowModel;

#[doc(inline)]
pub use clustering::cluster_graph::ClusterGraph;

#[cfg(feature = "kuzudb")]
#[doc(inline)]
pub use graph_db::flow_kuzudb::export_flow_model_to_kuzudb;

///
/// Serialize a [`FlowModel`] as a JSON [`String`]
///
pub fn flow_model_to_json(model: &FlowModel) -> String {
    serde_json::to_string(model).unwrap()
}

///
/// Deserialize a [`FlowModel`] from a JSON [`String`]
///
pub fn json_to_flow_model(model_json: &str) -> FlowModel {
    serde_json::from_str(model_json).unwrap()
}
