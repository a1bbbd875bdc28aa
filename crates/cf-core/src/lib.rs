#![forbid(unsafe_code)]

mod policy;
mod prompt;

pub use policy::{AnnotationPolicy, PolicyConfig};
pub use prompt::{PromptFile, VOICE_PROMPT_MARKER, is_voice_prompt, normalize_prompt_path};

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Node type assigned when the source element carries no `type` attribute.
pub const DEFAULT_NODE_TYPE: &str = "Unknown";

/// Node type representing an IVR step that may play one or more audio prompts.
pub const NAVIGATION_TYPE: &str = "Navigation";

/// Fatal transformation failures. Everything else degrades to documented
/// defaults and is reported through [`Diagnostic`]s instead.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum FlowError {
    /// Every sanitizing rewrite failed to produce parseable markup. Carries
    /// the last parse failure for diagnostics.
    #[error("markup recovery exhausted: {detail}")]
    RecoveryExhausted { detail: String },
    /// The markup parsed but no `root` container element was found.
    #[error("no `root` container element found")]
    MissingRoot,
}

impl FlowError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RecoveryExhausted { .. } => "callflow/error/recovery-exhausted",
            Self::MissingRoot => "callflow/error/missing-root",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DiagnosticSeverity {
    #[default]
    Info,
    Warning,
}

impl DiagnosticSeverity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

/// Category of a non-fatal irregularity observed while building the graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DiagnosticCategory {
    /// A sanitizing rewrite was required to parse the input.
    Recovery,
    /// An edge references a target id absent from the node set.
    Reference,
    /// An element was skipped or overridden while building the model.
    #[default]
    Model,
}

impl DiagnosticCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recovery => "callflow/warn/recovery",
            Self::Reference => "callflow/warn/reference",
            Self::Model => "callflow/warn/model",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub category: DiagnosticCategory,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn info(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Info,
            category,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            category,
            message: message.into(),
        }
    }
}

/// One diagram node. `children` and `parent` are filled in by the
/// relationship resolver; `children` may contain ids with no matching node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub value: String,
    pub prompt_files: Vec<PromptFile>,
    pub children: Vec<String>,
    pub parent: Option<String>,
}

impl FlowNode {
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.node_type == NAVIGATION_TYPE
    }

    /// True when at least one prompt file carries the voice-prompt marker.
    #[must_use]
    pub fn has_voice_prompt(&self) -> bool {
        self.prompt_files.iter().any(|file| file.is_voice_prompt)
    }
}

/// One source→target connection. Encounter order across the whole document
/// is significant: it decides parent assignment and children ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub edge_id: String,
}

/// The resolved diagram: nodes in document order, edges in encounter order.
/// The graph is not required to be acyclic.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Ordered targets of every edge leaving `id`, duplicates preserved.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.source == id)
            .map(|edge| edge.target.as_str())
            .collect()
    }
}

/// Total order over node ids: integer ids sort numerically before every
/// non-integer id; non-integer ids sort lexicographically among themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdKey {
    Numeric(i64),
    Text(String),
}

impl NodeIdKey {
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        id.parse::<i64>()
            .map_or_else(|_| Self::Text(id.to_string()), Self::Numeric)
    }
}

impl Ord for NodeIdKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for NodeIdKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One entry of the flat traversal array (Output A).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlatNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub value: String,
    pub children: Vec<String>,
    pub parent: Option<String>,
    #[serde(rename = "isSkippable")]
    pub is_skippable: bool,
    pub land_before: bool,
}

/// Aggregate counts over the resolved graph, shared by both projections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlowMetadata {
    pub source: String,
    pub total_nodes: usize,
    pub root_nodes: usize,
    pub total_connections: usize,
    pub node_type_counts: BTreeMap<String, usize>,
}

/// Output A: metadata plus the sorted flat node sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FlatProjection {
    pub metadata: FlowMetadata,
    pub nodes: Vec<FlatNode>,
}

/// Original prompt paths of one node, split by the voice-prompt marker.
/// Paths are normalized (leading numeric prefix stripped).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PromptPaths {
    pub voice: Vec<String>,
    pub dtmf: Vec<String>,
}

/// Transcript slots plus the paths they were (or will be) produced from.
/// `voice` and `dtmf` stay empty until a transcription pass merges results;
/// a failed transcription leaves an empty string in its slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PromptStt {
    pub voice: Vec<String>,
    pub dtmf: Vec<String>,
    pub original_filenames: PromptPaths,
}

/// Per-node entry of the language prompt map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NodePrompts {
    pub stt: PromptStt,
    pub children: Vec<String>,
}

/// One language's slice of the rendered map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LanguageNodes {
    pub nodes: BTreeMap<String, NodePrompts>,
    pub children: Vec<String>,
}

/// A child of the language-selection node that sets the caller's language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SelectionChild {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub value: String,
    pub marker: String,
}

/// Result of the language-selection heuristic. `selected_node_id` is absent
/// when the node set is empty; no fallback ever indexes into emptiness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LanguageSelection {
    pub selected_node_id: Option<String>,
    pub set_language_children: Vec<SelectionChild>,
}

/// Output B before rendering: one canonical skeleton, replicated per
/// language only when [`render`](Self::render) is called.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LanguageProjection {
    pub languages: Vec<String>,
    pub nodes: BTreeMap<String, NodePrompts>,
    pub selection: LanguageSelection,
}

impl LanguageProjection {
    /// Replicates the canonical skeleton under every configured language
    /// code. Structure is identical per language; text content is localized
    /// downstream.
    #[must_use]
    pub fn render(&self) -> LanguageMap {
        let mut language_mappings = BTreeMap::new();
        for language in &self.languages {
            language_mappings.insert(
                language.clone(),
                LanguageNodes {
                    nodes: self.nodes.clone(),
                    children: Vec::new(),
                },
            );
        }
        LanguageMap {
            language_mappings,
            language_selection: self.selection.clone(),
        }
    }
}

/// Output B: language code → node id → prompt entry, plus the selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LanguageMap {
    pub language_mappings: BTreeMap<String, LanguageNodes>,
    pub language_selection: LanguageSelection,
}

/// Language codes emitted when no explicit list is configured.
#[must_use]
pub fn default_languages() -> Vec<String> {
    vec!["default".to_string(), "en-US".to_string(), "F".to_string()]
}
