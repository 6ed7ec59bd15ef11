use std::cmp::Reverse;

use super::cluster_graph::{ClusterGraph, ClusterGraphError};

///
/// Select the next pair of nodes to contract, based on fan-in/fan-out
///
/// The first candidate is the active node maximizing
/// max(fan-in, fan-out), self-references excluded; the second is its
/// maximum-weight neighbor, drawn from the incoming side if fan-in ≥ fan-out
/// and from the outgoing side otherwise. All ties break towards the lowest
/// node id, so repeated runs over the same graph pick the same pairs.
///
/// Returns `None` when no beneficial contraction remains (the best candidate
/// has neither incoming nor outgoing neighbors besides itself); this is the
/// expected terminal state of the clustering loop, not an error.
///
pub fn merge_candidate(graph: &ClusterGraph) -> Option<(usize, usize)> {
    let candidate_one = graph
        .nodes
        .values()
        .min_by_key(|n| (Reverse(n.fan_in().max(n.fan_out())), n.id))?;

    if candidate_one.fan_in() == 0 && candidate_one.fan_out() == 0 {
        return None;
    }

    let neighbors = if candidate_one.fan_in() >= candidate_one.fan_out() {
        &candidate_one.inputs
    } else {
        &candidate_one.outputs
    };
    let candidate_two = neighbors
        .iter()
        .filter(|(&id, _)| id != candidate_one.id)
        .min_by_key(|(&id, &weight)| (Reverse(weight), id))
        .map(|(&id, _)| id)?;

    Some((candidate_one.id, candidate_two))
}

///
/// Iteratively contract the most hub-like node with its strongest neighbor
///
/// Performs at most `depth` contractions (and never more than
/// initial node count − 1), stopping early once no beneficial contraction
/// remains. The iteration index is recorded as the merge level of each
/// created cluster.
///
/// Returns the number of contractions performed.
///
pub fn fan_cluster(graph: &mut ClusterGraph, depth: usize) -> Result<usize, ClusterGraphError> {
    let initial = graph.nodes.len();
    let mut merges = 0;

    // n nodes allow at most n - 1 contractions
    for level in 1..initial {
        if merges >= depth {
            break;
        }
        match merge_candidate(graph) {
            Some((one, two)) => {
                graph.contract(&[one, two], level, None)?;
                merges += 1;
            }
            None => break,
        }
    }
    Ok(merges)
}
