//! Turns scanned cells into the resolved [`FlowGraph`]: node interning with
//! last-write-wins semantics, the encounter-ordered edge list, children and
//! single-parent assignment.

use cf_core::{
    DEFAULT_NODE_TYPE, Diagnostic, DiagnosticCategory, FlowEdge, FlowGraph, FlowNode,
    NAVIGATION_TYPE, PromptFile,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::scanner::RawCell;

pub(crate) fn build_graph(cells: Vec<RawCell>) -> (FlowGraph, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut nodes: Vec<FlowNode> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    // First pass: one node per distinct id. A repeated id keeps its original
    // document position but the later occurrence's fields win.
    for cell in &cells {
        let Some(id) = cell.id.as_deref().filter(|id| !id.is_empty()) else {
            debug!("skipping cell without id");
            continue;
        };
        let node = node_from(id, cell);
        match index.get(id) {
            Some(&position) => {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCategory::Model,
                    format!("node id '{id}' defined more than once; later definition wins"),
                ));
                nodes[position] = node;
            }
            None => {
                index.insert(id.to_string(), nodes.len());
                nodes.push(node);
            }
        }
    }

    // Second pass: edges, in overall encounter order, never de-duplicated.
    let mut edges: Vec<FlowEdge> = Vec::new();
    for cell in &cells {
        let (Some(source), Some(target)) = (
            cell.source.as_deref().filter(|s| !s.is_empty()),
            cell.target.as_deref().filter(|t| !t.is_empty()),
        ) else {
            continue;
        };
        edges.push(FlowEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: cell.value.clone().unwrap_or_default(),
            edge_id: cell.id.clone().unwrap_or_default(),
        });
    }

    // Children: ordered targets of each node's outgoing edges, dangling ids
    // included. Parent: source of the first edge targeting the node.
    for edge in &edges {
        if !index.contains_key(&edge.target) {
            debug!(edge_target = %edge.target, edge_id = %edge.edge_id, "edge targets unknown node");
            diagnostics.push(Diagnostic::warning(
                DiagnosticCategory::Reference,
                format!(
                    "edge '{}' targets unknown node '{}'",
                    edge.edge_id, edge.target
                ),
            ));
        }
        if let Some(&position) = index.get(&edge.source) {
            nodes[position].children.push(edge.target.clone());
        }
        if let Some(&position) = index.get(&edge.target) {
            if nodes[position].parent.is_none() {
                nodes[position].parent = Some(edge.source.clone());
            }
        }
    }

    (FlowGraph { nodes, edges }, diagnostics)
}

fn node_from(id: &str, cell: &RawCell) -> FlowNode {
    let node_type = cell
        .cell_type
        .clone()
        .unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string());
    let prompt_files = if node_type == NAVIGATION_TYPE {
        cell.prompt_files
            .iter()
            .map(|path| PromptFile::new(path.as_str()))
            .collect()
    } else {
        Vec::new()
    };
    FlowNode {
        id: id.to_string(),
        node_type,
        value: cell.value.clone().unwrap_or_default(),
        prompt_files,
        children: Vec::new(),
        parent: None,
    }
}
