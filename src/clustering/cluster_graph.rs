use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event_log::event_log_struct::Event;
use crate::relations::succession::KSuccessorTable;

///
/// A node of the evolving cluster graph
///
/// Leaves are created from the event vocabulary; clusters are minted above
/// the current maximum id by [`ClusterGraph::contract`]. Adjacency holds id
/// references only. The `parents` list is owned provenance: a cluster
/// exclusively owns the nodes it retired, and the list is never used for
/// traversal of the active graph.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node id
    pub id: usize,
    /// Display label
    pub label: String,
    /// Dotted grouping attribute, split into ordered segments
    pub identifier_split: Vec<String>,
    /// Number of leaves subsumed by this node
    pub size: usize,
    /// Summed occurrence weight of all subsumed leaves
    pub call_count: u64,
    /// Contraction depth (0 for leaves)
    pub merge_level: usize,
    /// The retired nodes this cluster was merged from (empty for leaves)
    pub parents: Vec<GraphNode>,
    /// Incoming adjacency: neighbor id → accumulated weight
    pub inputs: HashMap<usize, u64>,
    /// Outgoing adjacency: neighbor id → accumulated weight
    pub outputs: HashMap<usize, u64>,
}

impl GraphNode {
    /// Create a leaf node for an event
    pub fn new_leaf(id: usize, label: impl Into<String>, identifier: &str, call_count: u64) -> Self {
        Self {
            id,
            label: label.into(),
            identifier_split: identifier.split('.').map(String::from).collect(),
            size: 1,
            call_count,
            merge_level: 0,
            parents: Vec::new(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// The identifier segment at the given level, or `""` when the node's
    /// identifier has no segment that deep
    pub fn identifier(&self, level: usize) -> &str {
        self.identifier_split
            .get(level)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether this node is a cluster (i.e. has retired parents)
    pub fn is_cluster(&self) -> bool {
        !self.parents.is_empty()
    }

    /// Total number of leaves reachable through the parents closure
    pub fn leaf_count(&self) -> usize {
        if self.parents.is_empty() {
            1
        } else {
            self.parents.iter().map(GraphNode::leaf_count).sum()
        }
    }

    /// The ids of all leaves reachable through the parents closure
    pub fn leaf_ids(&self) -> Vec<usize> {
        if self.parents.is_empty() {
            vec![self.id]
        } else {
            self.parents.iter().flat_map(GraphNode::leaf_ids).collect()
        }
    }

    /// Number of distinct incoming neighbors, self-references excluded
    pub fn fan_in(&self) -> usize {
        self.inputs.keys().filter(|&&k| k != self.id).count()
    }

    /// Number of distinct outgoing neighbors, self-references excluded
    pub fn fan_out(&self) -> usize {
        self.outputs.keys().filter(|&&k| k != self.id).count()
    }
}

///
/// Error encountered while operating on a [`ClusterGraph`]
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterGraphError {
    /// A mined relation references an event id with no corresponding node
    UnknownRelationEndpoint(usize),
    /// A contraction named a node id that is not active
    UnknownNode(usize),
}

impl std::fmt::Display for ClusterGraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterGraphError::UnknownRelationEndpoint(id) => {
                write!(f, "relation references unknown event id {id}")
            }
            ClusterGraphError::UnknownNode(id) => {
                write!(f, "node {id} is not part of the active graph")
            }
        }
    }
}

impl std::error::Error for ClusterGraphError {}

///
/// The evolving node/edge set shared by all clustering strategies
///
/// Holds the currently active nodes with their fan-in/out bookkeeping, the
/// one-time snapshot of original fan numbers, and the merge history (cluster
/// ids in creation order, i.e. the topological order of contractions).
///
/// The active node set always partitions the full leaf set: every leaf is
/// reachable through exactly one active node's parents closure, and
/// retirement is permanent.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterGraph {
    /// Active nodes, keyed by id (clusters included, retired nodes excluded)
    pub nodes: HashMap<usize, GraphNode>,
    /// Next id to mint for a cluster
    pub node_counter: usize,
    /// Ids of all clusters ever created, in creation order
    pub merge_history: Vec<usize>,
    /// Snapshot of every node's (fan-in, fan-out) taken before any contraction
    pub original_fan: HashMap<usize, (usize, usize)>,
}

impl ClusterGraph {
    ///
    /// Create a graph with one leaf node per event
    ///
    /// `identifier` selects the dotted grouping attribute of each event
    /// (e.g. its origin or its thread); topology-only strategies can simply
    /// select the empty string.
    ///
    pub fn new<F>(events: &[Event], identifier: F) -> Self
    where
        F: Fn(&Event) -> &str,
    {
        let nodes: HashMap<usize, GraphNode> = events
            .iter()
            .map(|e| {
                (
                    e.id,
                    GraphNode::new_leaf(e.id, e.name.clone(), identifier(e), e.count),
                )
            })
            .collect();
        let node_counter = events.iter().map(|e| e.id).max().map_or(0, |max| max + 1);
        Self {
            nodes,
            node_counter,
            merge_history: Vec::new(),
            original_fan: HashMap::new(),
        }
    }

    ///
    /// Load the mined relations into the adjacency maps
    ///
    /// Weights are summed on key collision. Afterwards, every node's
    /// (fan-in, fan-out) is snapshotted once into
    /// [`ClusterGraph::original_fan`]; the snapshot never changes after the
    /// first call, making it the single source of original fan statistics.
    ///
    /// Fails with [`ClusterGraphError::UnknownRelationEndpoint`] if a
    /// relation references an id with no node.
    ///
    pub fn add_edges(&mut self, table: &KSuccessorTable) -> Result<(), ClusterGraphError> {
        for (&source, sinks) in &table.relations {
            for (&sink, relation) in sinks {
                if !self.nodes.contains_key(&sink) {
                    return Err(ClusterGraphError::UnknownRelationEndpoint(sink));
                }
                match self.nodes.get_mut(&source) {
                    Some(node) => *node.outputs.entry(sink).or_default() += relation.weight,
                    None => return Err(ClusterGraphError::UnknownRelationEndpoint(source)),
                }
                if let Some(node) = self.nodes.get_mut(&sink) {
                    *node.inputs.entry(source).or_default() += relation.weight;
                }
            }
        }

        if self.original_fan.is_empty() {
            self.original_fan = self
                .nodes
                .values()
                .map(|n| (n.id, (n.inputs.len(), n.outputs.len())))
                .collect();
        }
        Ok(())
    }

    ///
    /// Contract the given active nodes into a new cluster
    ///
    /// The parents are removed from the active set (ownership moves into the
    /// cluster), their adjacency maps are merged with weights summed on
    /// collision, entries referencing a parent are stripped (self-loop
    /// elimination), and every remaining external neighbor's own adjacency is
    /// rewritten exactly once: entries pointing at a retired parent are
    /// deleted and one entry pointing at the new cluster accumulates the
    /// merged weight. Cost scales with the merged parents' total degree.
    ///
    /// Returns the id of the new cluster, which is also appended to the merge
    /// history.
    ///
    pub fn contract(
        &mut self,
        parent_ids: &[usize],
        merge_level: usize,
        identifier: Option<String>,
    ) -> Result<usize, ClusterGraphError> {
        if let Some(missing) = parent_ids.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(ClusterGraphError::UnknownNode(*missing));
        }
        let parents: Vec<GraphNode> = parent_ids
            .iter()
            .filter_map(|id| self.nodes.remove(id))
            .collect();

        let id = self.node_counter;
        self.node_counter += 1;
        let size = parents.iter().map(|p| p.size).sum();
        let call_count = parents.iter().map(|p| p.call_count).sum();

        let mut inputs: HashMap<usize, u64> = HashMap::new();
        let mut outputs: HashMap<usize, u64> = HashMap::new();
        for parent in &parents {
            for (&neighbor, &weight) in &parent.inputs {
                *inputs.entry(neighbor).or_default() += weight;
            }
            for (&neighbor, &weight) in &parent.outputs {
                *outputs.entry(neighbor).or_default() += weight;
            }
        }
        // Edges between the parents collapse into the cluster
        for parent_id in parent_ids {
            inputs.remove(parent_id);
            outputs.remove(parent_id);
        }

        for (&neighbor, &weight) in &inputs {
            if let Some(node) = self.nodes.get_mut(&neighbor) {
                for parent_id in parent_ids {
                    node.outputs.remove(parent_id);
                }
                *node.outputs.entry(id).or_default() += weight;
            }
        }
        for (&neighbor, &weight) in &outputs {
            if let Some(node) = self.nodes.get_mut(&neighbor) {
                for parent_id in parent_ids {
                    node.inputs.remove(parent_id);
                }
                *node.inputs.entry(id).or_default() += weight;
            }
        }

        let cluster = GraphNode {
            id,
            label: "mergedNode".to_string(),
            identifier_split: identifier
                .map(|s| s.split('.').map(String::from).collect())
                .unwrap_or_default(),
            size,
            call_count,
            merge_level,
            parents,
            inputs,
            outputs,
        };
        self.merge_history.push(id);
        self.nodes.insert(id, cluster);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::trace_of;
    use std::collections::HashSet;

    pub fn events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|i| {
                let mut e = Event::new(i, format!("e{i}"), format!("app.m{}", i % 2), "main");
                e.count = 1;
                e
            })
            .collect()
    }

    fn mined(k: usize, traces: &[Vec<usize>]) -> KSuccessorTable {
        let mut table = KSuccessorTable::new(k);
        for (i, t) in traces.iter().enumerate() {
            table.add_trace(&trace_of(&format!("c{i}"), t));
        }
        table
    }

    #[test]
    fn add_edges_accumulates_and_snapshots_fan() {
        let events = events(3);
        let table = mined(1, &[vec![0, 1, 2], vec![0, 1]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();

        assert_eq!(graph.nodes[&0].outputs[&1], 2);
        assert_eq!(graph.nodes[&1].inputs[&0], 2);
        assert_eq!(graph.nodes[&1].outputs[&2], 1);
        assert_eq!(graph.original_fan[&1], (1, 1));
        assert_eq!(graph.original_fan[&0], (0, 1));
        assert_eq!(graph.original_fan[&2], (1, 0));
    }

    #[test]
    fn add_edges_rejects_unknown_endpoints() {
        let events = events(2);
        let table = mined(1, &[vec![0, 5]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        assert_eq!(
            graph.add_edges(&table),
            Err(ClusterGraphError::UnknownRelationEndpoint(5))
        );
    }

    #[test]
    fn contract_rewrites_neighbors_once() {
        // 0 → 1 → 2 and 0 → 2: contracting {1, 2} must leave node 0 with a
        // single edge to the cluster carrying the summed weight
        let events = events(3);
        let table = mined(2, &[vec![0, 1, 2]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();

        let cluster_id = graph.contract(&[1, 2], 1, None).unwrap();
        assert_eq!(cluster_id, 3);
        assert_eq!(graph.nodes.len(), 2);

        let zero = &graph.nodes[&0];
        assert_eq!(zero.outputs.len(), 1);
        assert_eq!(zero.outputs[&cluster_id], 2);

        let cluster = &graph.nodes[&cluster_id];
        assert_eq!(cluster.inputs.len(), 1);
        assert_eq!(cluster.inputs[&0], 2);
        // The edge 1 → 2 collapsed into the cluster
        assert!(cluster.outputs.is_empty());
        assert_eq!(cluster.size, 2);
        assert_eq!(cluster.merge_level, 1);
        assert_eq!(graph.merge_history, vec![cluster_id]);
    }

    #[test]
    fn contract_eliminates_self_loops() {
        // 0 ⇄ 1: contracting both leaves a cluster with no adjacency at all
        let events = events(2);
        let table = mined(1, &[vec![0, 1], vec![1, 0]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();

        let cluster_id = graph.contract(&[0, 1], 1, None).unwrap();
        let cluster = &graph.nodes[&cluster_id];
        assert!(cluster.inputs.is_empty());
        assert!(cluster.outputs.is_empty());
    }

    #[test]
    fn no_active_adjacency_references_retired_ids() {
        let events = events(5);
        let table = mined(2, &[vec![0, 1, 2, 3, 4], vec![0, 2, 4]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();

        let first = graph.contract(&[1, 2], 1, None).unwrap();
        graph.contract(&[first, 3], 2, None).unwrap();

        let active: HashSet<usize> = graph.nodes.keys().copied().collect();
        for node in graph.nodes.values() {
            for neighbor in node.inputs.keys().chain(node.outputs.keys()) {
                assert!(
                    active.contains(neighbor),
                    "node {} references retired id {neighbor}",
                    node.id
                );
            }
        }
    }

    #[test]
    fn active_nodes_partition_the_leaf_set() {
        let events = events(4);
        let table = mined(1, &[vec![0, 1, 2, 3]]);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();

        let first = graph.contract(&[0, 1], 1, None).unwrap();
        graph.contract(&[first, 2], 2, None).unwrap();

        let mut leaves: Vec<usize> = graph
            .nodes
            .values()
            .flat_map(GraphNode::leaf_ids)
            .collect();
        leaves.sort_unstable();
        assert_eq!(leaves, vec![0, 1, 2, 3]);
    }

    #[test]
    fn contract_unknown_parent_errors() {
        let events = events(2);
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        assert_eq!(
            graph.contract(&[9], 1, None),
            Err(ClusterGraphError::UnknownNode(9))
        );
    }
}
