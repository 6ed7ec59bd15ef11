//! Batched export of discovered models to an external graph store
//!
//! The batching helpers are pure and always available; the actual database
//! writer lives in [`flow_kuzudb`] behind the `kuzudb` feature.

use crate::flow_model::flow_model_struct::{FlowModel, FlowNode, FlowNodeKind};
use crate::relations::succession::{Relation, RelationKind};

#[cfg(feature = "kuzudb")]
/// Export of [`FlowModel`]s to a [kuzu](https://github.com/kuzudb/kuzu) database
///
/// __Requires the `kuzudb` feature to be enabled__
pub mod flow_kuzudb;

/// Maximum number of nodes written per batch
pub const MAX_NODE_BATCH: usize = 10_000;
/// Maximum number of edges written per batch
pub const MAX_EDGE_BATCH: usize = 500;

///
/// Group a model's nodes by kind and chunk each group at [`MAX_NODE_BATCH`]
///
/// Nodes are ordered by id within a group, so batch boundaries are stable
/// across runs.
///
pub fn node_batches(nodes: &[FlowNode]) -> Vec<(FlowNodeKind, Vec<&FlowNode>)> {
    let mut batches = Vec::new();
    for kind in [
        FlowNodeKind::Activity,
        FlowNodeKind::Start,
        FlowNodeKind::End,
    ] {
        let mut group: Vec<&FlowNode> = nodes.iter().filter(|n| n.kind == kind).collect();
        group.sort_by_key(|n| n.id);
        for chunk in group.chunks(MAX_NODE_BATCH) {
            batches.push((kind, chunk.to_vec()));
        }
    }
    batches
}

///
/// Group a model's edges by relation kind and chunk each group at
/// [`MAX_EDGE_BATCH`]
///
/// Edges are ordered by (source, target) within a group.
///
pub fn edge_batches(model: &FlowModel) -> Vec<(RelationKind, Vec<&Relation>)> {
    let mut batches = Vec::new();
    for kind in [
        RelationKind::Sequence,
        RelationKind::Parallel,
        RelationKind::ExclusiveChoice,
    ] {
        let mut group: Vec<&Relation> = model
            .edges
            .values()
            .flat_map(|targets| targets.values())
            .filter(|r| r.kind == kind)
            .collect();
        group.sort_by_key(|r| (r.source, r.target));
        for chunk in group.chunks(MAX_EDGE_BATCH) {
            batches.push((kind, chunk.to_vec()));
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn synthetic_model(activities: usize, sequence_edges: usize) -> FlowModel {
        let mut nodes: Vec<FlowNode> = (0..activities)
            .map(|i| FlowNode::new(i, format!("e{i}"), FlowNodeKind::Activity))
            .collect();
        nodes.push(FlowNode::new(activities, "END", FlowNodeKind::End));
        nodes.push(FlowNode::new(activities + 1, "START", FlowNodeKind::Start));

        let mut edges: HashMap<usize, HashMap<usize, Relation>> = HashMap::new();
        for i in 0..sequence_edges {
            let (source, target) = (i / activities, i % activities);
            edges.entry(source).or_default().insert(
                target,
                Relation::new(source, target, RelationKind::Sequence, 1),
            );
        }
        FlowModel {
            nodes,
            edges,
            start: activities + 1,
            end: activities,
        }
    }

    #[test]
    fn nodes_are_grouped_by_kind() {
        let model = synthetic_model(3, 0);
        let batches = node_batches(&model.nodes);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0, FlowNodeKind::Activity);
        assert_eq!(batches[0].1.len(), 3);
        assert_eq!(batches[1].0, FlowNodeKind::Start);
        assert_eq!(batches[2].0, FlowNodeKind::End);
    }

    #[test]
    fn edges_are_chunked_at_the_batch_limit() {
        // 1200 sequence edges: 500 + 500 + 200
        let model = synthetic_model(40, 1200);
        let batches = edge_batches(&model);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].1.len(), MAX_EDGE_BATCH);
        assert_eq!(batches[1].1.len(), MAX_EDGE_BATCH);
        assert_eq!(batches[2].1.len(), 200);
        // Stable ordering inside a batch
        assert!(batches[0]
            .1
            .windows(2)
            .all(|w| (w[0].source, w[0].target) < (w[1].source, w[1].target)));
    }

    #[test]
    fn empty_model_produces_no_edge_batches() {
        let model = synthetic_model(0, 0);
        assert!(edge_batches(&model).is_empty());
    }
}
