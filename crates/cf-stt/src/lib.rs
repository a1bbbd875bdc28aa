#![forbid(unsafe_code)]

//! Speech transcription collaborator. The graph pipeline never depends on
//! this crate succeeding: a failed transcription is data (an error outcome
//! merged as an empty transcript), never control flow.

mod batch;
mod client;

pub use batch::{TranscriptionSummary, transcribe_projection};
pub use client::{SpeechClientError, SpeechConfig, SpeechHttpClient};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    Success,
    #[default]
    Error,
}

/// Result of transcribing one audio file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TranscriptionOutcome {
    pub status: TranscriptionStatus,
    pub transcript: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptionOutcome {
    #[must_use]
    pub fn success(transcript: impl Into<String>, confidence: f64) -> Self {
        Self {
            status: TranscriptionStatus::Success,
            transcript: transcript.into(),
            confidence,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: TranscriptionStatus::Error,
            transcript: String::new(),
            confidence: 0.0,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TranscriptionStatus::Success
    }
}

/// A speech-to-text backend. Called with a normalized file path, at most
/// once per distinct path per batch.
pub trait Transcriber {
    fn transcribe(&self, path: &str) -> TranscriptionOutcome;
}
