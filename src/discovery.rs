use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clustering::cluster_graph::{ClusterGraph, ClusterGraphError};
use crate::clustering::fan::fan_cluster;
use crate::clustering::property::PropertyClustering;
use crate::event_log::event_log_struct::EventLog;
use crate::flow_model::flow_model_struct::FlowModel;
use crate::relations::succession::KSuccessorTable;

/// Lookahead used when "never followed by anything" has to be decided over
/// whole traces rather than a bounded window
pub const UNBOUNDED_LOOKAHEAD: usize = usize::MAX / 2;

///
/// How the mined graph should be coarsened
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClusteringStrategy {
    /// Greedy, topology-driven pairwise contraction by fan-in/fan-out;
    /// the depth parameter is the number of contractions to perform
    Fan,
    /// One-shot hierarchical grouping by the events' origin path;
    /// the depth parameter is the grouping level
    ByOrigin,
    /// One-shot hierarchical grouping by the events' thread/caller path;
    /// the depth parameter is the grouping level
    ByThread,
}

#[derive(Debug, Serialize, Deserialize)]
/// Duration (in seconds) per phase of discovery (+ total time)
pub struct DiscoveryDurations {
    /// Duration for mining the k=1 relation table (in seconds)
    pub mine_k1: f32,
    /// Duration for mining the unbounded relation table (in seconds)
    pub mine_kn: f32,
    /// Duration for building the flow model (in seconds)
    pub build_model: f32,
    /// Duration for clustering (in seconds)
    pub clustering: f32,
    /// Total duration (in seconds)
    pub total: f32,
}

impl DiscoveryDurations {
    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

///
/// Error encountered during discovery
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The mined relations and the event vocabulary disagree
    Graph(ClusterGraphError),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::Graph(e) => write!(f, "discovery failed: {e}"),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Graph(e) => Some(e),
        }
    }
}

impl From<ClusterGraphError> for DiscoveryError {
    fn from(e: ClusterGraphError) -> Self {
        Self::Graph(e)
    }
}

///
/// Fold every trace of the log into a fresh [`KSuccessorTable`]
///
pub fn mine_relations(log: &EventLog, k: usize) -> KSuccessorTable {
    let mut table = KSuccessorTable::new(k);
    for trace in log.traces.values() {
        table.add_trace(trace);
    }
    table
}

///
/// Discover a [`FlowModel`] from the log and coarsen the mined graph with the
/// chosen strategy
///
/// `depth_or_level` is the number of contractions for
/// [`ClusteringStrategy::Fan`] and the grouping level for the property
/// strategies. Returns the discovered model, the coarsened graph (active
/// nodes, merge history and original fan statistics) and the per-phase
/// durations.
///
pub fn discover_and_cluster(
    log: &EventLog,
    strategy: ClusteringStrategy,
    depth_or_level: usize,
) -> Result<(FlowModel, ClusterGraph, DiscoveryDurations), DiscoveryError> {
    let total_start = Instant::now();

    let start = Instant::now();
    let k1 = mine_relations(log, 1);
    let mine_k1 = start.elapsed().as_secs_f32();

    let start = Instant::now();
    let kn = mine_relations(log, UNBOUNDED_LOOKAHEAD);
    let mine_kn = start.elapsed().as_secs_f32();
    println!("Mined {} k=1 and {} unbounded relations", k1.len(), kn.len());

    let start = Instant::now();
    let model = FlowModel::discover(&k1, &kn, &log.trace_start_events(), &log.events);
    let build_model = start.elapsed().as_secs_f32();

    let start = Instant::now();
    let graph = match strategy {
        ClusteringStrategy::Fan => {
            let mut graph = ClusterGraph::new(&log.events, |e| &e.origin);
            graph.add_edges(&k1)?;
            let merges = fan_cluster(&mut graph, depth_or_level)?;
            println!("Fan clustering performed {merges} contractions");
            graph
        }
        ClusteringStrategy::ByOrigin => {
            let mut clustering = PropertyClustering::new(&log.events, &k1, |e| &e.origin)?;
            clustering.compute(depth_or_level)?;
            clustering.graph
        }
        ClusteringStrategy::ByThread => {
            let mut clustering = PropertyClustering::new(&log.events, &k1, |e| &e.thread)?;
            clustering.compute(depth_or_level)?;
            clustering.graph
        }
    };
    let clustering = start.elapsed().as_secs_f32();

    let durations = DiscoveryDurations {
        mine_k1,
        mine_kn,
        build_model,
        clustering,
        total: total_start.elapsed().as_secs_f32(),
    };
    Ok((model, graph, durations))
}
