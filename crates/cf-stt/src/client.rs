//! Blocking HTTP client for a hosted speech-recognition endpoint. All
//! connection material (key, region, endpoint, timeout) is supplied by
//! configuration; nothing is embedded here.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{Transcriber, TranscriptionOutcome};

const KEY_ENV: &str = "CALLFLOW_SPEECH_KEY";
const REGION_ENV: &str = "CALLFLOW_SPEECH_REGION";
const ENDPOINT_ENV: &str = "CALLFLOW_SPEECH_ENDPOINT";
const LANGUAGE_ENV: &str = "CALLFLOW_SPEECH_LANGUAGE";
const TIMEOUT_ENV: &str = "CALLFLOW_SPEECH_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum SpeechClientError {
    #[error("missing speech configuration: {0}")]
    MissingConfig(&'static str),
    #[error("invalid speech endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Connection settings for the speech service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SpeechConfig {
    pub subscription_key: String,
    pub region: String,
    /// Full recognition URL. When unset, the conversational endpoint for
    /// `region` is used.
    pub endpoint: Option<String>,
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: String::new(),
            endpoint: None,
            language: "en-US".to_string(),
            timeout_secs: 60,
        }
    }
}

impl SpeechConfig {
    /// Reads the configuration from `CALLFLOW_SPEECH_*` environment
    /// variables. Key and region are required unless a full endpoint is
    /// given, in which case the region header is optional.
    pub fn from_env() -> Result<Self, SpeechClientError> {
        let mut config = Self {
            subscription_key: std::env::var(KEY_ENV).unwrap_or_default(),
            region: std::env::var(REGION_ENV).unwrap_or_default(),
            endpoint: std::env::var(ENDPOINT_ENV).ok().filter(|v| !v.is_empty()),
            ..Self::default()
        };
        if let Ok(language) = std::env::var(LANGUAGE_ENV) {
            if !language.is_empty() {
                config.language = language;
            }
        }
        if let Ok(timeout) = std::env::var(TIMEOUT_ENV) {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.timeout_secs = seconds;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SpeechClientError> {
        if self.subscription_key.is_empty() {
            return Err(SpeechClientError::MissingConfig(KEY_ENV));
        }
        if self.region.is_empty() && self.endpoint.is_none() {
            return Err(SpeechClientError::MissingConfig(REGION_ENV));
        }
        Ok(())
    }

    fn recognition_url(&self) -> Result<Url, SpeechClientError> {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
                self.region
            ),
        };
        let mut url = Url::parse(&base)?;
        url.query_pairs_mut()
            .append_pair("language", &self.language)
            .append_pair("format", "detailed");
        Ok(url)
    }
}

/// What the recognition endpoint returns for one utterance.
#[derive(Debug, Deserialize, Default)]
struct RecognitionResponse {
    #[serde(rename = "DisplayText", default)]
    display_text: String,
    #[serde(rename = "Confidence", default)]
    confidence: f64,
}

pub struct SpeechHttpClient {
    config: SpeechConfig,
    url: Url,
    http: Client,
}

impl SpeechHttpClient {
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechClientError> {
        config.validate()?;
        let url = config.recognition_url()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, url, http })
    }

    fn post_audio(&self, audio: Vec<u8>) -> Result<TranscriptionOutcome, reqwest::Error> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header("Content-Type", "audio/wav; codecs=audio/pcm; samplerate=16000")
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("Accept", "application/json")
            .body(audio);
        if !self.config.region.is_empty() {
            request = request.header("Ocp-Apim-Subscription-Region", &self.config.region);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Ok(TranscriptionOutcome::failure(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: RecognitionResponse = response.json()?;
        if parsed.display_text.is_empty() {
            return Ok(TranscriptionOutcome::failure(
                "empty transcription from speech service",
            ));
        }
        Ok(TranscriptionOutcome::success(
            parsed.display_text,
            parsed.confidence,
        ))
    }
}

impl Transcriber for SpeechHttpClient {
    fn transcribe(&self, path: &str) -> TranscriptionOutcome {
        debug!(%path, "transcribing audio file");
        let audio = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%path, %error, "audio file unreadable");
                return TranscriptionOutcome::failure(format!("file not found: {path}"));
            }
        };

        match self.post_audio(audio) {
            Ok(outcome) => {
                if outcome.is_success() {
                    debug!(%path, confidence = outcome.confidence, "transcription complete");
                } else {
                    warn!(%path, error = outcome.error.as_deref().unwrap_or(""), "transcription failed");
                }
                outcome
            }
            Err(error) => {
                warn!(%path, %error, "speech request failed");
                TranscriptionOutcome::failure(error.to_string())
            }
        }
    }
}
