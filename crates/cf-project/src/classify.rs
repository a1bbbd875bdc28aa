use cf_core::{AnnotationPolicy, FlowNode};

/// Traversal annotations for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAnnotations {
    pub is_skippable: bool,
    pub land_before: bool,
}

/// Applies the injected policy, then the Navigation override: a Navigation
/// node is skippable iff none of its prompt files carries the voice-prompt
/// marker. One mandatory announcement forces the caller to listen,
/// regardless of what the base policy says.
#[must_use]
pub fn annotate(node: &FlowNode, policy: &dyn AnnotationPolicy) -> NodeAnnotations {
    let is_skippable = if node.is_navigation() {
        !node.has_voice_prompt()
    } else {
        policy.is_skippable(&node.node_type)
    };
    NodeAnnotations {
        is_skippable,
        land_before: policy.land_before(&node.node_type),
    }
}

#[cfg(test)]
mod tests {
    use cf_core::{FlowNode, PolicyConfig, PromptFile};

    use super::annotate;

    fn node(node_type: &str, prompts: &[&str]) -> FlowNode {
        FlowNode {
            id: "1".to_string(),
            node_type: node_type.to_string(),
            prompt_files: prompts.iter().copied().map(PromptFile::new).collect(),
            ..FlowNode::default()
        }
    }

    #[test]
    fn base_policy_decides_non_navigation_types() {
        let policy = PolicyConfig::default();
        assert!(annotate(&node("Unknown", &[]), &policy).is_skippable);
        assert!(annotate(&node("Exit", &[]), &policy).is_skippable);
        assert!(!annotate(&node("Transfer", &[]), &policy).is_skippable);
        assert!(annotate(&node("Exit", &[]), &policy).land_before);
    }

    #[test]
    fn navigation_with_voice_prompt_is_never_skippable() {
        let policy = PolicyConfig::default();
        let annotated = annotate(
            &node("Navigation", &["1-greeting_VOICEPROMPT.wav"]),
            &policy,
        );
        assert!(!annotated.is_skippable);
        assert!(!annotated.land_before);
    }

    #[test]
    fn navigation_without_voice_prompt_is_skippable() {
        let policy = PolicyConfig::default();
        assert!(annotate(&node("Navigation", &["2-menu.wav"]), &policy).is_skippable);
        assert!(annotate(&node("Navigation", &[]), &policy).is_skippable);
    }

    #[test]
    fn one_voice_prompt_among_many_forces_non_skippable() {
        let policy = PolicyConfig::default();
        let annotated = annotate(
            &node("Navigation", &["a.wav", "b.wav", "c_VOICEPROMPT.wav"]),
            &policy,
        );
        assert!(!annotated.is_skippable);
    }

    #[test]
    fn override_ignores_a_policy_that_marks_navigation_skippable() {
        let mut policy = PolicyConfig::default();
        policy.skippable_types.insert("Navigation".to_string());
        let annotated = annotate(
            &node("Navigation", &["x_VOICEPROMPT.wav"]),
            &policy,
        );
        assert!(!annotated.is_skippable);
    }
}
