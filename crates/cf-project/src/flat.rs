use cf_core::{AnnotationPolicy, FlatNode, FlatProjection, FlowGraph, NodeIdKey};
use tracing::debug;

use crate::classify::annotate;
use crate::metadata::summarize;

/// Projects the graph into the sorted flat traversal array (Output A).
/// Integer ids sort numerically first, the rest lexicographically after;
/// the same graph always yields the identical sequence.
#[must_use]
pub fn project_flat(
    graph: &FlowGraph,
    policy: &dyn AnnotationPolicy,
    source: &str,
) -> FlatProjection {
    let mut nodes: Vec<FlatNode> = graph
        .nodes
        .iter()
        .map(|node| {
            let annotations = annotate(node, policy);
            FlatNode {
                id: node.id.clone(),
                node_type: node.node_type.clone(),
                value: node.value.clone(),
                children: node.children.clone(),
                parent: node.parent.clone(),
                is_skippable: annotations.is_skippable,
                land_before: annotations.land_before,
            }
        })
        .collect();
    nodes.sort_by_key(|node| NodeIdKey::from_id(&node.id));

    let metadata = summarize(graph, source);
    debug!(
        total_nodes = metadata.total_nodes,
        root_nodes = metadata.root_nodes,
        "flat projection built"
    );
    FlatProjection { metadata, nodes }
}

#[cfg(test)]
mod tests {
    use cf_core::{FlowEdge, FlowGraph, FlowNode, PolicyConfig, PromptFile};

    use super::project_flat;

    fn graph_with_ids(ids: &[&str]) -> FlowGraph {
        let mut graph = FlowGraph::default();
        for id in ids {
            graph.nodes.push(FlowNode {
                id: (*id).to_string(),
                node_type: "Normal".to_string(),
                ..FlowNode::default()
            });
        }
        graph
    }

    #[test]
    fn sorts_integer_ids_numerically_before_text_ids() {
        let graph = graph_with_ids(&["2", "b", "10", "a"]);
        let projection = project_flat(&graph, &PolicyConfig::default(), "test");
        let order: Vec<&str> = projection.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["2", "10", "a", "b"]);
    }

    #[test]
    fn metadata_is_consistent_with_the_array() {
        let mut graph = graph_with_ids(&["1", "2", "3"]);
        graph.nodes[1].parent = Some("1".to_string());
        graph.edges.push(FlowEdge {
            source: "1".to_string(),
            target: "2".to_string(),
            ..FlowEdge::default()
        });

        let projection = project_flat(&graph, &PolicyConfig::default(), "test");
        assert_eq!(projection.metadata.total_nodes, projection.nodes.len());
        assert_eq!(
            projection.metadata.root_nodes,
            projection
                .nodes
                .iter()
                .filter(|node| node.parent.is_none())
                .count()
        );
        assert_eq!(projection.metadata.total_connections, 1);
    }

    #[test]
    fn annotations_follow_type_and_prompt_files() {
        let mut graph = FlowGraph::default();
        graph.nodes.push(FlowNode {
            id: "1".to_string(),
            node_type: "Navigation".to_string(),
            prompt_files: vec![PromptFile::new("1-greeting_VOICEPROMPT.wav")],
            ..FlowNode::default()
        });
        graph.nodes.push(FlowNode {
            id: "2".to_string(),
            node_type: "Navigation".to_string(),
            prompt_files: vec![PromptFile::new("2-menu.wav")],
            ..FlowNode::default()
        });
        graph.nodes.push(FlowNode {
            id: "3".to_string(),
            node_type: "Exit".to_string(),
            ..FlowNode::default()
        });

        let projection = project_flat(&graph, &PolicyConfig::default(), "test");
        assert!(!projection.nodes[0].is_skippable);
        assert!(!projection.nodes[0].land_before);
        assert!(projection.nodes[1].is_skippable);
        assert!(projection.nodes[2].is_skippable);
        assert!(projection.nodes[2].land_before);
    }

    #[test]
    fn dangling_children_survive_projection() {
        let mut graph = graph_with_ids(&["1"]);
        graph.nodes[0].children = vec!["ghost".to_string()];
        let projection = project_flat(&graph, &PolicyConfig::default(), "test");
        assert_eq!(projection.nodes[0].children, vec!["ghost"]);
    }

    #[test]
    fn projection_is_byte_identical_across_runs() {
        let graph = graph_with_ids(&["7", "alpha", "3"]);
        let policy = PolicyConfig::default();
        let first = serde_json::to_vec(&project_flat(&graph, &policy, "test"))
            .expect("serialize projection");
        let second = serde_json::to_vec(&project_flat(&graph, &policy, "test"))
            .expect("serialize projection");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_graph_projects_to_empty_structures() {
        let projection = project_flat(&FlowGraph::default(), &PolicyConfig::default(), "test");
        assert!(projection.nodes.is_empty());
        assert_eq!(projection.metadata.total_nodes, 0);
    }
}
