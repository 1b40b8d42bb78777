//! Speech recognition: backend contract, engine selection, dispatcher.

pub mod acoustic;
pub mod cloud;
pub mod dispatcher;
pub mod neural;

pub use acoustic::AcousticRecognizer;
pub use cloud::CloudSttClient;
pub use dispatcher::{RecognitionDispatcher, QUEUE_CAPACITY};
pub use neural::NeuralRecognizer;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audio::AudioSegment;

/// Confidence reported by local models that do not score their output
pub const DEFAULT_MODEL_CONFIDENCE: f32 = 0.9;

/// The closed set of recognizer backends.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecognitionEngine {
    #[serde(rename = "cloud")]
    CloudStt,
    #[serde(rename = "acoustic")]
    OfflineAcoustic,
    #[serde(rename = "neural")]
    NeuralTranscription,
}

impl Default for RecognitionEngine {
    fn default() -> Self {
        RecognitionEngine::CloudStt
    }
}

impl RecognitionEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionEngine::CloudStt => "cloud",
            RecognitionEngine::OfflineAcoustic => "acoustic",
            RecognitionEngine::NeuralTranscription => "neural",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cloud" => Some(RecognitionEngine::CloudStt),
            "acoustic" => Some(RecognitionEngine::OfflineAcoustic),
            "neural" => Some(RecognitionEngine::NeuralTranscription),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecognitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized recognizer output. Empty text means "no speech detected" and
/// short-circuits the rest of the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Recognizer backend contract. Errors are treated as an empty result by
/// the dispatcher; a dropped utterance is acceptable, a stalled pipeline is
/// not.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, segment: &AudioSegment) -> Result<RecognitionResult>;
}

/// The configured backends, looked up per processed segment so mid-stream
/// engine switches take effect on the next utterance.
#[derive(Clone, Default)]
pub struct BackendSet {
    pub cloud: Option<Arc<dyn Recognizer>>,
    pub acoustic: Option<Arc<dyn Recognizer>>,
    pub neural: Option<Arc<dyn Recognizer>>,
}

impl BackendSet {
    pub fn get(&self, engine: RecognitionEngine) -> Option<Arc<dyn Recognizer>> {
        match engine {
            RecognitionEngine::CloudStt => self.cloud.clone(),
            RecognitionEngine::OfflineAcoustic => self.acoustic.clone(),
            RecognitionEngine::NeuralTranscription => self.neural.clone(),
        }
    }

    /// One backend serving every engine slot; used by tests and callers
    /// that only configure a single recognizer.
    pub fn uniform(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            cloud: Some(recognizer.clone()),
            acoustic: Some(recognizer.clone()),
            neural: Some(recognizer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_round_trip() {
        for engine in [
            RecognitionEngine::CloudStt,
            RecognitionEngine::OfflineAcoustic,
            RecognitionEngine::NeuralTranscription,
        ] {
            assert_eq!(RecognitionEngine::parse(engine.as_str()), Some(engine));
        }
        assert_eq!(RecognitionEngine::parse("vosk"), None);
    }

    #[test]
    fn empty_result_detection() {
        assert!(RecognitionResult::empty().is_empty());
        assert!(RecognitionResult {
            text: "   ".to_string(),
            confidence: 0.5
        }
        .is_empty());
        assert!(!RecognitionResult {
            text: "hello".to_string(),
            confidence: 0.5
        }
        .is_empty());
    }
}
