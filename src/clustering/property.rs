use std::collections::BTreeMap;

use itertools::Itertools;

use crate::event_log::event_log_struct::Event;
use crate::relations::succession::KSuccessorTable;

use super::cluster_graph::{ClusterGraph, ClusterGraphError};

/// One group of nodes sharing an identifier segment at some level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyGroup {
    /// The identifier segment the group shares (`""` when the members'
    /// identifiers have no segment that deep)
    pub key: String,
    /// Active node ids of the group, ascending
    pub members: Vec<usize>,
}

///
/// One-shot, attribute-driven hierarchical grouping
///
/// Groups leaves by a dotted hierarchical attribute selected from their
/// source event (e.g. origin or thread), independent of graph topology.
/// All grouping levels are precomputed at construction; a single call to
/// [`PropertyClustering::compute`] then contracts the groups of the chosen
/// level. An instance is single-use: computing a second level on the same
/// instance would retire nodes twice and is unsupported — build a fresh
/// instance per level instead.
///
#[derive(Debug)]
pub struct PropertyClustering {
    /// The underlying cluster graph
    pub graph: ClusterGraph,
    /// Longest segment count over all leaves' selected attributes
    pub max_depth: usize,
    /// Precomputed groupings; `levels[i]` groups by the segments `0..=i`
    pub levels: Vec<Vec<PropertyGroup>>,
}

impl PropertyClustering {
    ///
    /// Build the graph and precompute all grouping levels
    ///
    /// `selector` maps each event to its dotted grouping attribute.
    /// Level 0 groups the leaves by their first segment; every further level
    /// refines each group by the next segment, except groups whose key is
    /// empty (identifier exhausted), which pass through unchanged.
    ///
    pub fn new<F>(
        events: &[Event],
        table: &KSuccessorTable,
        selector: F,
    ) -> Result<Self, ClusterGraphError>
    where
        F: Fn(&Event) -> &str,
    {
        let mut graph = ClusterGraph::new(events, &selector);
        graph.add_edges(table)?;

        let max_depth = events
            .iter()
            .map(|e| selector(e).split('.').count())
            .max()
            .unwrap_or(0);

        let mut levels: Vec<Vec<PropertyGroup>> = Vec::with_capacity(max_depth);
        if max_depth > 0 {
            let mut first: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for node in graph.nodes.values() {
                first
                    .entry(node.identifier(0).to_string())
                    .or_default()
                    .push(node.id);
            }
            levels.push(
                first
                    .into_iter()
                    .map(|(key, mut members)| {
                        members.sort_unstable();
                        PropertyGroup { key, members }
                    })
                    .collect(),
            );
        }
        for level in 1..max_depth {
            let mut next: Vec<PropertyGroup> = Vec::new();
            for group in &levels[level - 1] {
                if group.key.is_empty() {
                    next.push(group.clone());
                    continue;
                }
                let mut refined: BTreeMap<String, Vec<usize>> = BTreeMap::new();
                for &id in &group.members {
                    refined
                        .entry(graph.nodes[&id].identifier(level).to_string())
                        .or_default()
                        .push(id);
                }
                next.extend(
                    refined
                        .into_iter()
                        .map(|(key, members)| PropertyGroup { key, members }),
                );
            }
            levels.push(next);
        }

        Ok(Self {
            graph,
            max_depth,
            levels,
        })
    }

    ///
    /// Contract every group of the given level into one cluster
    ///
    /// `level` is clamped to `[1, max_depth]`. Each cluster's identifier is
    /// its group's path segments truncated to `level`, rejoined with `'.'`.
    /// Single pass: every active node is retired into exactly one cluster.
    ///
    pub fn compute(&mut self, level: usize) -> Result<(), ClusterGraphError> {
        if self.levels.is_empty() {
            return Ok(());
        }
        let level = level.clamp(1, self.max_depth);

        for group in &self.levels[level - 1] {
            let identifier = self
                .graph
                .nodes
                .get(&group.members[0])
                .map(|first| first.identifier_split.iter().take(level).join("."));
            self.graph.contract(&group.members, level, identifier)?;
        }
        Ok(())
    }
}
