use std::collections::BTreeMap;

use cf_core::{
    FlowGraph, FlowNode, LanguageProjection, LanguageSelection, NodePrompts, PromptPaths,
    PromptStt, SelectionChild, normalize_prompt_path,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Picks the language-selection node and its language-setting children.
/// Pluggable so the substring heuristic can be replaced or tested apart
/// from graph traversal.
pub trait SelectionHeuristic {
    fn select(&self, graph: &FlowGraph) -> LanguageSelection;
}

/// Default heuristic: the first Navigation node whose value mentions
/// "language" or "choose" (case-insensitively) is the selection node; its
/// children whose value mentions "setlanguage" set the caller's language,
/// marked `_E` for English and `_F` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringSelection;

impl SelectionHeuristic for SubstringSelection {
    fn select(&self, graph: &FlowGraph) -> LanguageSelection {
        // Empty node set: the selection has no valid id. Never index into
        // an empty collection here.
        if graph.nodes.is_empty() {
            return LanguageSelection::default();
        }

        let lookup: FxHashMap<&str, &FlowNode> = graph
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node))
            .collect();

        let chosen = graph.nodes.iter().find(|node| {
            let value = node.value.to_lowercase();
            node.is_navigation() && (value.contains("language") || value.contains("choose"))
        });

        let Some(node) = chosen else {
            debug!("no language-selection match; falling back to first node");
            return LanguageSelection {
                selected_node_id: Some(graph.nodes[0].id.clone()),
                set_language_children: Vec::new(),
            };
        };

        let set_language_children = node
            .children
            .iter()
            .filter_map(|id| lookup.get(id.as_str()))
            .filter(|child| child.value.to_lowercase().contains("setlanguage"))
            .map(|child| SelectionChild {
                id: child.id.clone(),
                node_type: child.node_type.clone(),
                value: child.value.clone(),
                marker: if child.value.to_lowercase().contains("english") {
                    "_E".to_string()
                } else {
                    "_F".to_string()
                },
            })
            .collect();

        LanguageSelection {
            selected_node_id: Some(node.id.clone()),
            set_language_children,
        }
    }
}

/// Projects the graph into the language prompt map (Output B). One
/// canonical skeleton is built over the Navigation nodes that carry prompt
/// files; [`LanguageProjection::render`] replicates it per language code.
/// Transcript slots start empty and are filled by a transcription pass.
#[must_use]
pub fn project_languages(
    graph: &FlowGraph,
    languages: &[String],
    heuristic: &dyn SelectionHeuristic,
) -> LanguageProjection {
    let mut nodes = BTreeMap::new();
    for node in &graph.nodes {
        if !node.is_navigation() || node.prompt_files.is_empty() {
            continue;
        }
        let mut paths = PromptPaths::default();
        for file in &node.prompt_files {
            let normalized = normalize_prompt_path(&file.path).to_string();
            if file.is_voice_prompt {
                paths.voice.push(normalized);
            } else {
                paths.dtmf.push(normalized);
            }
        }
        let stt = PromptStt {
            voice: vec![String::new(); paths.voice.len()],
            dtmf: vec![String::new(); paths.dtmf.len()],
            original_filenames: paths,
        };
        nodes.insert(
            node.id.clone(),
            NodePrompts {
                stt,
                children: node.children.clone(),
            },
        );
    }

    debug!(prompt_nodes = nodes.len(), "language projection built");
    LanguageProjection {
        languages: languages.to_vec(),
        nodes,
        selection: heuristic.select(graph),
    }
}
