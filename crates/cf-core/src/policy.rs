use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::NAVIGATION_TYPE;

/// Per-type annotation policy consumed by the node classifier. Implementors
/// decide base skippability and land-before; the classifier layers the
/// Navigation voice-prompt override on top.
pub trait AnnotationPolicy {
    /// Whether a caller may interrupt a prompt of this node type.
    fn is_skippable(&self, node_type: &str) -> bool;

    /// Whether the runtime must finish this node's prompt before accepting
    /// further input.
    fn land_before(&self, node_type: &str) -> bool;

    /// Node types that are inherently non-skippable, for runtimes that need
    /// the set up front.
    fn non_skippable_types(&self) -> Vec<String>;
}

/// Externally configurable policy. The defaults match the reference call
/// engine: Unknown/DTMF/Normal/Exit prompts are skippable, and only
/// Navigation accepts input concurrently with its prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    pub skippable_types: BTreeSet<String>,
    pub non_skippable_types: BTreeSet<String>,
    /// Types whose prompt does NOT have to finish before input is accepted.
    pub concurrent_input_types: BTreeSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let skippable = ["Unknown", "DTMF", "Normal", "Exit"];
        Self {
            skippable_types: skippable.iter().map(ToString::to_string).collect(),
            non_skippable_types: [NAVIGATION_TYPE.to_string()].into_iter().collect(),
            concurrent_input_types: [NAVIGATION_TYPE.to_string()].into_iter().collect(),
        }
    }
}

impl PolicyConfig {
    /// Loads a policy from its JSON representation. Missing fields fall back
    /// to the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl AnnotationPolicy for PolicyConfig {
    fn is_skippable(&self, node_type: &str) -> bool {
        self.skippable_types.contains(node_type)
    }

    fn land_before(&self, node_type: &str) -> bool {
        !self.concurrent_input_types.contains(node_type)
    }

    fn non_skippable_types(&self) -> Vec<String> {
        self.non_skippable_types.iter().cloned().collect()
    }
}
