//! Architectural-smell analyzers
//!
//! Pure functions over a [`CallGraph`]. Each analyzer reports one smell
//! family as a named, serializable record; [`analyze`] bundles them into
//! a single report. A graph with zero edges is valid input everywhere:
//! no services flagged, one singleton cluster per node, no cycles.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::CallGraph;

/// Out-degree at or above this flags a service as greedy.
pub const GREEDY_THRESHOLD: usize = 5;

/// Minimum combined degree before a service can be flagged hub-like.
pub const HUB_THRESHOLD: usize = 5;

/// Services issuing an excessive number of outbound calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreedyMicroservices {
    pub services: Vec<String>,
}

/// Services whose combined in/out traffic dominates the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubLikeMicroservices {
    pub services: Vec<String>,
}

/// Weakly-connected components, each a candidate wrong-cut cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongCuts {
    pub clusters: Vec<Vec<String>>,
}

/// Directed dependency cycles, each reported once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclicDependencies {
    pub cycles: Vec<Vec<String>>,
}

/// All analyzer outputs over one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub greedy: GreedyMicroservices,
    pub hub_like: HubLikeMicroservices,
    pub wrong_cuts: WrongCuts,
    pub cyclic_dependencies: CyclicDependencies,
}

/// Run every analyzer over the graph.
pub fn analyze(graph: &CallGraph) -> AnalysisReport {
    AnalysisReport {
        greedy: detect_greedy(graph),
        hub_like: detect_hub_like(graph),
        wrong_cuts: detect_wrong_cuts(graph),
        cyclic_dependencies: detect_cycles(graph),
    }
}

/// Flag services whose out-degree, multiplicity-counted, reaches
/// [`GREEDY_THRESHOLD`].
pub fn detect_greedy(graph: &CallGraph) -> GreedyMicroservices {
    let services = graph
        .nodes
        .iter()
        .filter(|node| graph.out_degree(node) >= GREEDY_THRESHOLD)
        .cloned()
        .collect();
    GreedyMicroservices { services }
}

/// Flag services whose combined in/out degree is at least twice the
/// graph's mean combined degree and reaches [`HUB_THRESHOLD`].
pub fn detect_hub_like(graph: &CallGraph) -> HubLikeMicroservices {
    if graph.edges.is_empty() || graph.nodes.is_empty() {
        return HubLikeMicroservices { services: vec![] };
    }
    // Every edge contributes one out-degree and one in-degree
    let mean = 2.0 * graph.edges.len() as f64 / graph.nodes.len() as f64;
    let services = graph
        .nodes
        .iter()
        .filter(|node| {
            let combined = graph.out_degree(node) + graph.in_degree(node);
            combined >= HUB_THRESHOLD && combined as f64 >= 2.0 * mean
        })
        .cloned()
        .collect();
    HubLikeMicroservices { services }
}

/// Weakly-connected components via depth-first traversal with edge
/// direction ignored. Clusters are sorted internally and ordered by
/// their first member.
pub fn detect_wrong_cuts(graph: &CallGraph) -> WrongCuts {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();

    for node in &graph.nodes {
        if visited.contains(node.as_str()) {
            continue;
        }
        let mut cluster = Vec::new();
        let mut stack = vec![node.as_str()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            cluster.push(current.to_string());
            for neighbor in graph.neighbors(current) {
                if !visited.contains(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        cluster.sort();
        clusters.push(cluster);
    }

    clusters.sort_by(|a, b| a.first().cmp(&b.first()));
    WrongCuts { clusters }
}

/// Directed cycles via depth-first search with a recursion stack. Each
/// cycle is reported once, rotated so its lexicographically smallest
/// member comes first.
pub fn detect_cycles(graph: &CallGraph) -> CyclicDependencies {
    let mut visited: HashSet<String> = HashSet::new();
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut cycles = Vec::new();

    for start in &graph.nodes {
        if !visited.contains(start.as_str()) {
            let mut path = Vec::new();
            walk(graph, start, &mut visited, &mut path, &mut seen, &mut cycles);
        }
    }

    CyclicDependencies { cycles }
}

fn walk(
    graph: &CallGraph,
    node: &str,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
    seen: &mut BTreeSet<Vec<String>>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node.to_string());
    path.push(node.to_string());

    for next in graph.successors(node) {
        if let Some(pos) = path.iter().position(|n| n == next) {
            // Back edge: the cycle is the path suffix from the first
            // occurrence of `next`
            let cycle = rotate_smallest_first(path[pos..].to_vec());
            if seen.insert(cycle.clone()) {
                cycles.push(cycle);
            }
        } else if !visited.contains(next) {
            walk(graph, next, visited, path, seen, cycles);
        }
    }

    path.pop();
}

fn rotate_smallest_first(mut cycle: Vec<String>) -> Vec<String> {
    if let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(min_pos);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.into(),
            target: target.into(),
            url: format!("/api/{target}"),
            http_method: "GET".into(),
        }
    }

    fn graph(nodes: &[&str], edges: Vec<Edge>) -> CallGraph {
        CallGraph {
            label: "acme".into(),
            commit_id: "c1".into(),
            directed: true,
            multigraph: true,
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            edges,
        }
    }

    #[test]
    fn greedy_flags_at_threshold() {
        let five = graph(
            &["a", "b"],
            (0..5).map(|_| edge("a", "b")).collect(),
        );
        assert_eq!(detect_greedy(&five).services, vec!["a"]);

        let four = graph(
            &["a", "b"],
            (0..4).map(|_| edge("a", "b")).collect(),
        );
        assert!(detect_greedy(&four).services.is_empty());
    }

    #[test]
    fn hub_like_requires_degree_dominance() {
        // hub touches every edge; spokes each touch one
        let edges = vec![
            edge("spoke1", "hub"),
            edge("spoke2", "hub"),
            edge("spoke3", "hub"),
            edge("hub", "spoke4"),
            edge("hub", "spoke5"),
        ];
        let g = graph(&["hub", "spoke1", "spoke2", "spoke3", "spoke4", "spoke5"], edges);
        assert_eq!(detect_hub_like(&g).services, vec!["hub"]);
    }

    #[test]
    fn hub_like_ignores_edgeless_graph() {
        let g = graph(&["a", "b"], vec![]);
        assert!(detect_hub_like(&g).services.is_empty());
    }

    #[test]
    fn wrong_cuts_reports_components() {
        let g = graph(&["a", "b", "c"], vec![edge("a", "b")]);
        let cuts = detect_wrong_cuts(&g);
        assert_eq!(
            cuts.clusters,
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }

    #[test]
    fn fully_connected_system_is_one_cluster() {
        let g = graph(&["a", "b", "c"], vec![edge("a", "b"), edge("c", "b")]);
        let cuts = detect_wrong_cuts(&g);
        assert_eq!(cuts.clusters.len(), 1);
        assert_eq!(cuts.clusters[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn three_cycle_is_reported_once() {
        let g = graph(
            &["a", "b", "c"],
            vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
        );
        let cycles = detect_cycles(&g);
        assert_eq!(cycles.cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph(
            &["a", "b", "c"],
            vec![edge("a", "b"), edge("a", "c"), edge("b", "c")],
        );
        assert!(detect_cycles(&g).cycles.is_empty());
    }

    #[test]
    fn two_cycle_not_duplicated_by_parallel_edges() {
        let g = graph(
            &["a", "b"],
            vec![edge("a", "b"), edge("a", "b"), edge("b", "a")],
        );
        let cycles = detect_cycles(&g);
        assert_eq!(cycles.cycles, vec![vec!["a", "b"]]);
    }

    #[test]
    fn empty_graph_yields_empty_report() {
        let g = graph(&["a", "b"], vec![]);
        let report = analyze(&g);
        assert!(report.greedy.services.is_empty());
        assert!(report.hub_like.services.is_empty());
        assert_eq!(
            report.wrong_cuts.clusters,
            vec![vec!["a".to_string()], vec!["b".to_string()]]
        );
        assert!(report.cyclic_dependencies.cycles.is_empty());
    }
}
