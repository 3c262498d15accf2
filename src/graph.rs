//! Call-graph projection
//!
//! Projects a [`MicroserviceSystem`] onto a service-level call graph:
//! one node per microservice, one edge per rest call whose target was
//! resolved to another service in the system. Parallel edges between the
//! same pair are retained, multiplicity feeds the coupling analyzers.
//! The projection is pure: no I/O and no mutation of the input system.

use serde::{Deserialize, Serialize};

use crate::model::MicroserviceSystem;

/// One service-to-service call. `url` and `http_method` come from the
/// originating rest call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub url: String,
    pub http_method: String,
}

/// A directed multigraph over microservice names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraph {
    /// Name of the projected system.
    pub label: String,
    /// Commit the projected snapshot was taken at.
    pub commit_id: String,
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

impl CallGraph {
    /// Outbound edge count of a node, multiplicity-counted.
    pub fn out_degree(&self, node: &str) -> usize {
        self.edges.iter().filter(|e| e.source == node).count()
    }

    /// Inbound edge count of a node, multiplicity-counted.
    pub fn in_degree(&self, node: &str) -> usize {
        self.edges.iter().filter(|e| e.target == node).count()
    }

    /// Distinct successors of a node, in edge order.
    pub fn successors(&self, node: &str) -> Vec<&str> {
        let mut seen = Vec::new();
        for edge in &self.edges {
            if edge.source == node && !seen.contains(&edge.target.as_str()) {
                seen.push(edge.target.as_str());
            }
        }
        seen
    }

    /// Distinct neighbors of a node with edge direction ignored.
    pub fn neighbors(&self, node: &str) -> Vec<&str> {
        let mut seen = Vec::new();
        for edge in &self.edges {
            let other = if edge.source == node {
                &edge.target
            } else if edge.target == node {
                &edge.source
            } else {
                continue;
            };
            if !seen.contains(&other.as_str()) {
                seen.push(other.as_str());
            }
        }
        seen
    }
}

/// Project a system snapshot onto its call graph.
///
/// A rest call contributes an edge only when its target is resolved,
/// names another service of the system and differs from the calling
/// service; self-calls and unresolved targets contribute nothing.
/// Edges are sorted by `(source, target, url)` so two projections of
/// value-equal systems are value-equal graphs.
pub fn build_call_graph(system: &MicroserviceSystem) -> CallGraph {
    let nodes: Vec<String> = system.microservices.iter().map(|m| m.name.clone()).collect();

    let mut edges = Vec::new();
    for service in &system.microservices {
        for call in service.rest_calls() {
            if call.target.is_empty()
                || call.target == service.name
                || !nodes.contains(&call.target)
            {
                continue;
            }
            edges.push(Edge {
                source: service.name.clone(),
                target: call.target.clone(),
                url: call.url.clone(),
                http_method: call.http_method.to_string(),
            });
        }
    }
    edges.sort_by(|a, b| {
        (&a.source, &a.target, &a.url).cmp(&(&b.source, &b.target, &b.url))
    });

    CallGraph {
        label: system.name.clone(),
        commit_id: system.commit_id.clone(),
        directed: true,
        multigraph: true,
        nodes,
        edges,
    }
}
