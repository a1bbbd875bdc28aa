use std::collections::BTreeMap;

use cf_core::{FlowGraph, FlowMetadata};

/// Aggregates counts from the resolved graph. Both projections report
/// against the same summary; `total_nodes` always equals the flat array's
/// length and `total_connections` the full edge-list length.
#[must_use]
pub fn summarize(graph: &FlowGraph, source: &str) -> FlowMetadata {
    let mut node_type_counts: BTreeMap<String, usize> = BTreeMap::new();
    for node in &graph.nodes {
        *node_type_counts.entry(node.node_type.clone()).or_default() += 1;
    }
    FlowMetadata {
        source: source.to_string(),
        total_nodes: graph.nodes.len(),
        root_nodes: graph
            .nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .count(),
        total_connections: graph.edges.len(),
        node_type_counts,
    }
}
