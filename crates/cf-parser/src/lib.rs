#![forbid(unsafe_code)]

//! Turns exported call-flow markup into a resolved [`FlowGraph`]. The input
//! is frequently double-encoded and sometimes malformed; parsing first
//! decodes it, then attempts a strict parse, then walks an ordered cascade
//! of lossy sanitizing rewrites until one parses or the cascade is
//! exhausted.

mod builder;
mod normalize;
mod scanner;

use cf_core::{Diagnostic, DiagnosticCategory, FlowError, FlowGraph};
use serde::Serialize;
use tracing::{debug, warn};

pub use normalize::{RecoveryStrategy, decode, decode_entities, decode_escapes};

/// A successfully parsed document: the resolved graph, which recovery
/// strategy (if any) was needed, and the non-fatal irregularities observed
/// along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub graph: FlowGraph,
    pub recovery: RecoveryStrategy,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses call-flow markup into a [`FlowGraph`].
///
/// Fatal failures are [`FlowError::RecoveryExhausted`] (nothing parseable
/// even after every rewrite; carries the last parse failure) and
/// [`FlowError::MissingRoot`] (parseable but no `root` container). Every
/// other irregularity degrades to a diagnostic and is reflected in the
/// graph instead of raised.
pub fn parse(input: &str) -> Result<ParseOutcome, FlowError> {
    let decoded = normalize::decode(input);

    let mut last_failure = match scanner::scan_document(&decoded) {
        Ok(cells) => return Ok(assemble(cells, RecoveryStrategy::Strict)),
        Err(scanner::ScanError::MissingRoot) => return Err(FlowError::MissingRoot),
        Err(scanner::ScanError::Syntax(detail)) => detail,
    };

    for (strategy, rewrite) in normalize::rewrites() {
        let candidate = rewrite(&decoded);
        match scanner::scan_document(&candidate) {
            Ok(cells) => {
                warn!(strategy = strategy.as_str(), "markup recovered via sanitizing rewrite");
                let mut outcome = assemble(cells, strategy);
                outcome.diagnostics.insert(
                    0,
                    Diagnostic::info(
                        DiagnosticCategory::Recovery,
                        format!("markup recovered via '{}' rewrite", strategy.as_str()),
                    ),
                );
                return Ok(outcome);
            }
            Err(scanner::ScanError::MissingRoot) => return Err(FlowError::MissingRoot),
            Err(scanner::ScanError::Syntax(detail)) => {
                debug!(strategy = strategy.as_str(), %detail, "rewrite did not parse");
                last_failure = detail;
            }
        }
    }

    Err(FlowError::RecoveryExhausted {
        detail: last_failure,
    })
}

fn assemble(cells: Vec<scanner::RawCell>, recovery: RecoveryStrategy) -> ParseOutcome {
    let (graph, diagnostics) = builder::build_graph(cells);
    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        recovery = recovery.as_str(),
        "document parsed"
    );
    ParseOutcome {
        graph,
        recovery,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use cf_core::{DiagnosticCategory, FlowError};
    use proptest::prelude::*;

    use super::{ParseOutcome, RecoveryStrategy, parse};

    const MENU_DOC: &str = r#"<mxGraphModel><root>
        <mxCell id="0"/>
        <mxCell id="2" type="Navigation" value="Choose language">
            <mxParams>
                <mxParam promptfile="1-choose_VOICEPROMPT.wav"/>
                <mxParam promptfile="2-tones.wav"/>
            </mxParams>
        </mxCell>
        <mxCell id="3" type="Normal" value="SetLanguage English"/>
        <mxCell id="e1" source="2" target="3" value="1"/>
        <mxCell id="e2" source="2" target="99" value="2"/>
    </root></mxGraphModel>"#;

    fn parsed(input: &str) -> ParseOutcome {
        parse(input).expect("document parses")
    }

    #[test]
    fn strict_parse_resolves_the_graph() {
        let outcome = parsed(MENU_DOC);
        assert_eq!(outcome.recovery, RecoveryStrategy::Strict);
        assert_eq!(outcome.graph.nodes.len(), 5);
        assert_eq!(outcome.graph.edges.len(), 2);

        let menu = outcome.graph.node("2").expect("menu node");
        assert_eq!(menu.children, vec!["3", "99"]);
        assert_eq!(menu.prompt_files.len(), 2);

        let set_language = outcome.graph.node("3").expect("set-language node");
        assert_eq!(set_language.parent.as_deref(), Some("2"));
    }

    #[test]
    fn dangling_target_is_reported_not_fatal() {
        let outcome = parsed(MENU_DOC);
        assert!(
            outcome
                .diagnostics
                .iter()
                .any(|d| d.category == DiagnosticCategory::Reference && d.message.contains("99"))
        );
    }

    #[test]
    fn entity_encoded_document_parses_strictly() {
        let encoded = MENU_DOC
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;");
        let outcome = parsed(&encoded);
        assert_eq!(outcome.recovery, RecoveryStrategy::Strict);
        assert_eq!(outcome.graph.nodes.len(), 5);
    }

    #[test]
    fn decoded_params_blob_recovers_via_first_rewrite() {
        let input = r#"<mxGraphModel><root>
            <mxCell id="1" type="Navigation" value="Menu" xmlParamsData="<Params><P/></Params>"/>
        </root></mxGraphModel>"#;
        let outcome = parsed(input);
        assert_eq!(outcome.recovery, RecoveryStrategy::EmptyParamsValue);
        assert_eq!(outcome.graph.nodes.len(), 1);
        assert!(
            outcome
                .diagnostics
                .iter()
                .any(|d| d.category == DiagnosticCategory::Recovery)
        );
    }

    #[test]
    fn bare_ampersand_recovers_by_dropping_the_attribute() {
        let input = r#"<root><mxCell id="1" type="Normal" value="Sales & Support"/></root>"#;
        let outcome = parsed(input);
        assert_eq!(outcome.recovery, RecoveryStrategy::DropAmpAttributes);
        let node = outcome.graph.node("1").expect("node");
        // The rewrite is lossy: the offending attribute is gone entirely.
        assert_eq!(node.value, "");
        assert_eq!(node.node_type, "Normal");
    }

    #[test]
    fn unrecoverable_markup_exhausts_the_cascade() {
        let result = parse("<root><mxCell id=");
        match result {
            Err(FlowError::RecoveryExhausted { detail }) => assert!(!detail.is_empty()),
            other => panic!("expected RecoveryExhausted, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_exhausts_the_cascade() {
        assert!(matches!(
            parse(""),
            Err(FlowError::RecoveryExhausted { .. })
        ));
    }

    #[test]
    fn missing_root_container_is_terminal() {
        let result = parse("<mxGraphModel><mxCell id=\"1\"/></mxGraphModel>");
        assert_eq!(result, Err(FlowError::MissingRoot));
    }

    #[test]
    fn empty_root_yields_an_empty_graph() {
        let outcome = parsed("<mxGraphModel><root/></mxGraphModel>");
        assert!(outcome.graph.is_empty());
        assert!(outcome.graph.edges.is_empty());
    }

    #[test]
    fn parse_is_idempotent_over_the_same_input() {
        let first = parsed(MENU_DOC);
        let second = parsed(MENU_DOC);
        assert_eq!(first, second);

        let encoded = serde_json::to_string(&first.graph).expect("serialize graph");
        let encoded_again = serde_json::to_string(&second.graph).expect("serialize graph");
        assert_eq!(encoded, encoded_again);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_parse_is_total_and_deterministic(input in ".{0,256}") {
            let first = parse(&input);
            let second = parse(&input);
            prop_assert_eq!(first, second);
        }
    }
}
