//! Sequential batch transcription over a language projection: every
//! distinct normalized path is transcribed at most once, then results merge
//! back slot-for-slot. Failures become empty transcripts and are counted;
//! the projection structure itself is never at risk.

use cf_core::LanguageProjection;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Transcriber, TranscriptionOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TranscriptionSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

/// Fills the projection's transcript slots from `transcriber`. Counts are
/// per slot: the same path feeding two slots counts twice, but is only
/// transcribed once.
pub fn transcribe_projection(
    projection: &mut LanguageProjection,
    transcriber: &dyn Transcriber,
) -> TranscriptionSummary {
    let mut results: FxHashMap<String, TranscriptionOutcome> = FxHashMap::default();
    let mut order: Vec<String> = Vec::new();
    for entry in projection.nodes.values() {
        for path in entry
            .stt
            .original_filenames
            .voice
            .iter()
            .chain(&entry.stt.original_filenames.dtmf)
        {
            if !results.contains_key(path) {
                order.push(path.clone());
                results.insert(path.clone(), TranscriptionOutcome::default());
            }
        }
    }

    info!(files = order.len(), "starting batch transcription");
    for path in &order {
        let outcome = transcriber.transcribe(path);
        results.insert(path.clone(), outcome);
    }

    let mut summary = TranscriptionSummary::default();
    for entry in projection.nodes.values_mut() {
        let stt = &mut entry.stt;
        fill_slots(
            &stt.original_filenames.voice,
            &mut stt.voice,
            &results,
            &mut summary,
        );
        fill_slots(
            &stt.original_filenames.dtmf,
            &mut stt.dtmf,
            &results,
            &mut summary,
        );
    }
    summary.total = summary.successful + summary.failed;
    info!(
        successful = summary.successful,
        failed = summary.failed,
        "batch transcription merged"
    );
    summary
}

fn fill_slots(
    paths: &[String],
    slots: &mut Vec<String>,
    results: &FxHashMap<String, TranscriptionOutcome>,
    summary: &mut TranscriptionSummary,
) {
    slots.clear();
    for path in paths {
        match results.get(path) {
            Some(outcome) if outcome.is_success() => {
                slots.push(outcome.transcript.clone());
                summary.successful += 1;
            }
            _ => {
                slots.push(String::new());
                summary.failed += 1;
            }
        }
    }
}
