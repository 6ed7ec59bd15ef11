use std::collections::HashMap;

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use super::cluster_graph::ClusterGraph;

///
/// A vertex of the layout-ready graph description
///
/// `side` is the square side length needed to hold the subsumed leaves,
/// `fill` is a 0–255 fill hint derived from the node's call count relative to
/// the maximum active call count.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutVertex {
    /// Node id
    pub id: usize,
    /// Square side length (≥ 1)
    pub side: usize,
    /// Fill hint (255 = busiest active node)
    pub fill: u8,
}

///
/// Error encountered while invoking the external layout engine
///
#[derive(Debug)]
pub enum RenderError {
    /// The layout engine binary could not be found
    EngineUnavailable,
    /// The engine was found but the invocation failed
    Io(std::io::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::EngineUnavailable => {
                write!(f, "graphviz layout engine not found in PATH")
            }
            RenderError::Io(e) => write!(f, "layout engine invocation failed: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::EngineUnavailable => None,
            RenderError::Io(e) => Some(e),
        }
    }
}

/// Fill hint for a node: call count scaled against the maximum active call
/// count. A graph with no recorded calls at all defaults to the coldest hint
/// instead of dividing by zero.
fn fill_hint(call_count: u64, max_call_count: u64) -> u8 {
    if max_call_count == 0 {
        return u8::MAX;
    }
    (call_count * 510 / max_call_count).min(255) as u8
}

///
/// Materialize the active node/edge set into a weighted directed graph
///
/// Only out-edges are added (adding both sides would duplicate every edge).
/// Nodes and edges are inserted in ascending id order, so the result is
/// deterministic for a given graph state.
///
pub fn cluster_graph_to_layout_graph(graph: &ClusterGraph) -> DiGraph<LayoutVertex, u64> {
    let max_call_count = graph
        .nodes
        .values()
        .map(|n| n.call_count)
        .max()
        .unwrap_or(0);

    let mut ids: Vec<usize> = graph.nodes.keys().copied().collect();
    ids.sort_unstable();

    let mut layout = DiGraph::new();
    let mut indices = HashMap::with_capacity(ids.len());
    for id in &ids {
        let node = &graph.nodes[id];
        // The square has to hold every subsumed leaf, so the side is at
        // least the square root of the leaf count
        let side = (node.leaf_count() as f64).sqrt().ceil().max(1.0) as usize;
        let index = layout.add_node(LayoutVertex {
            id: node.id,
            side,
            fill: fill_hint(node.call_count, max_call_count),
        });
        indices.insert(*id, index);
    }
    for id in &ids {
        let node = &graph.nodes[id];
        let mut targets: Vec<(&usize, &u64)> = node.outputs.iter().collect();
        targets.sort();
        for (target, weight) in targets {
            if let (Some(&from), Some(&to)) = (indices.get(id), indices.get(target)) {
                layout.add_edge(from, to, *weight);
            }
        }
    }
    layout
}

///
/// Emit the active node/edge set as a DOT directed-graph description
///
/// Vertices are filled boxes labeled with their node id, sized to hold their
/// subsumed leaves and tinted by their fill hint; edges are labeled with
/// their integer weight.
///
pub fn cluster_graph_to_dot(graph: &ClusterGraph) -> String {
    let layout = cluster_graph_to_layout_graph(graph);
    let dot = Dot::with_attr_getters(
        &layout,
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &|_, edge| format!("label = \"{}\"", edge.weight()),
        &|_, (_, v)| {
            format!(
                "label = \"{}\", shape = box, style = filled, fixedsize = true, width = {}, height = {}, fillcolor = \"#{:02x}ffff\"",
                v.id, v.side, v.side, v.fill
            )
        },
    );
    format!("{dot:?}")
}

#[cfg(feature = "graphviz-export")]
///
/// Run a DOT description through the local graphviz layout engine
///
/// Returns the coordinate-annotated DOT output as an opaque string for
/// downstream visualization to parse. A missing `dot` binary surfaces as
/// [`RenderError::EngineUnavailable`]; the in-memory graph is unaffected
/// either way.
///
/// Only available with the `graphviz-export` feature.
///
pub fn render_layout(dot: &str) -> Result<String, RenderError> {
    use graphviz_rust::cmd::Format;

    match graphviz_rust::exec_dot(dot.to_string(), vec![Format::Dot.into()]) {
        Ok(out) => Ok(String::from_utf8_lossy(&out).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RenderError::EngineUnavailable),
        Err(e) => Err(RenderError::Io(e)),
    }
}

impl ClusterGraph {
    /// Emit the active node/edge set as a DOT description
    ///
    /// See [`cluster_graph_to_dot`].
    pub fn to_dot(&self) -> String {
        cluster_graph_to_dot(self)
    }

    #[cfg(feature = "graphviz-export")]
    /// Lay out the active node/edge set with the local graphviz engine and
    /// return the coordinate-annotated DOT output
    ///
    /// Only available with the `graphviz-export` feature.
    pub fn draw(&self) -> Result<String, RenderError> {
        render_layout(&self.to_dot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::event_log_struct::Event;
    use crate::relations::succession::KSuccessorTable;
    use crate::utils::test_utils::trace_of;

    fn sample_graph() -> ClusterGraph {
        let events: Vec<Event> = (0..3)
            .map(|i| {
                let mut e = Event::new(i, format!("e{i}"), "app", "main");
                e.count = (i as u64 + 1) * 2;
                e
            })
            .collect();
        let mut table = KSuccessorTable::new(1);
        table.add_trace(&trace_of("c1", &[0, 1, 2]));
        let mut graph = ClusterGraph::new(&events, |e| &e.origin);
        graph.add_edges(&table).unwrap();
        graph
    }

    #[test]
    fn layout_graph_materializes_out_edges_once() {
        let graph = sample_graph();
        let layout = cluster_graph_to_layout_graph(&graph);
        assert_eq!(layout.node_count(), 3);
        assert_eq!(layout.edge_count(), 2);
    }

    #[test]
    fn dot_output_is_deterministic_and_labeled() {
        let graph = sample_graph();
        let dot = graph.to_dot();
        assert_eq!(dot, graph.to_dot());
        assert!(dot.contains("digraph"));
        assert!(dot.contains("shape = box"));
        assert!(dot.contains("label = \"2\""));
        // Busiest node (count 6) saturates the fill hint
        assert!(dot.contains("fillcolor = \"#ffffff\""));
    }

    #[test]
    fn zero_call_counts_use_the_default_fill() {
        assert_eq!(fill_hint(0, 0), u8::MAX);
        assert_eq!(fill_hint(0, 10), 0);
        assert_eq!(fill_hint(10, 10), 255);
        // Halfway scales inside the byte range
        assert_eq!(fill_hint(2, 10), 102);
    }

    #[test]
    fn cluster_vertices_grow_with_leaf_count() {
        let mut graph = sample_graph();
        graph.contract(&[0, 1, 2], 1, None).unwrap();
        let layout = cluster_graph_to_layout_graph(&graph);
        let vertex = layout.node_weights().next().unwrap();
        // ceil(sqrt(3)) = 2
        assert_eq!(vertex.side, 2);
    }
}
