use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::event_log::event_log_struct::Event;
use crate::relations::succession::{KSuccessorTable, Relation, RelationKind};

/// Role of a node within a [`FlowModel`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FlowNodeKind {
    /// A regular event node
    Activity,
    /// The synthetic start node
    Start,
    /// The synthetic end node
    End,
}

/// A node of a [`FlowModel`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowNode {
    /// Node id (leaf ids come from the event vocabulary; synthetic ids are
    /// minted above the maximum event id)
    pub id: usize,
    /// Display label
    pub label: String,
    /// Node role
    pub kind: FlowNodeKind,
}

impl FlowNode {
    /// Create a new [`FlowNode`]
    pub fn new(id: usize, label: impl Into<String>, kind: FlowNodeKind) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
        }
    }
}

///
/// A discovered flow model
///
/// Holds the full event vocabulary as nodes plus exactly one synthetic START
/// and one synthetic END node. The edges are the k=1 relation table extended
/// with START→(trace-starting events) and (events that are never followed by
/// anything)→END; the synthetic edges carry weight 0.
///
/// This is a best-effort statistical synthesis: every leaf is reachable from
/// START and reaches END through some path, but no soundness properties are
/// verified.
///
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowModel {
    /// All nodes of the model, including START and END
    pub nodes: Vec<FlowNode>,
    /// Edges: source id → (target id → relation)
    #[serde_as(as = "Vec<(_, _)>")]
    pub edges: HashMap<usize, HashMap<usize, Relation>>,
    /// Id of the synthetic start node
    pub start: usize,
    /// Id of the synthetic end node
    pub end: usize,
}

impl FlowModel {
    ///
    /// Discover a [`FlowModel`] from two relation tables
    ///
    /// `k1` provides the edge set, `kn` (mined with an effectively unbounded
    /// lookahead) only determines which events are never followed by anything
    /// and therefore connect to END. `start_events` are the distinct event
    /// ids observed at the first position of a trace.
    ///
    /// An empty vocabulary yields the degenerate model START→END.
    ///
    pub fn discover(
        k1: &KSuccessorTable,
        kn: &KSuccessorTable,
        start_events: &[usize],
        events: &[Event],
    ) -> Self {
        let mut nodes: Vec<FlowNode> = events
            .iter()
            .map(|e| FlowNode::new(e.id, e.name.clone(), FlowNodeKind::Activity))
            .collect();
        let mut edges = k1.relations.clone();

        let mut node_counter = events.iter().map(|e| e.id).max().map_or(0, |max| max + 1);

        // Every event that is never followed by anything connects to END
        let end = node_counter;
        node_counter += 1;
        nodes.push(FlowNode::new(end, "END", FlowNodeKind::End));
        for event in events {
            if !kn.contains_source(event.id) {
                edges
                    .entry(event.id)
                    .or_default()
                    .insert(end, Relation::new(event.id, end, RelationKind::Sequence, 0));
            }
        }

        // Every event that can start a trace is connected from START
        let start = node_counter;
        nodes.push(FlowNode::new(start, "START", FlowNodeKind::Start));
        let start_edges = edges.entry(start).or_default();
        for &node in start_events {
            start_edges.insert(node, Relation::new(start, node, RelationKind::Sequence, 0));
        }

        if events.is_empty() {
            start_edges.insert(end, Relation::new(start, end, RelationKind::Sequence, 0));
        }

        Self {
            nodes,
            edges,
            start,
            end,
        }
    }

    /// Get the edge from `source` to `target`, if present
    pub fn edge(&self, source: usize, target: usize) -> Option<&Relation> {
        self.edges.get(&source)?.get(&target)
    }

    /// Total number of edges in the model
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashMap::len).sum()
    }
}
