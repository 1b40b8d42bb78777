//! Continuous speech-to-translation pipeline.
//!
//! Audio capture feeds a bounded recognition queue serviced by a worker
//! pool; recognized phrases are routed by conversation mode, translated
//! through a layered cache with offline fallback, and fanned out to the
//! overlay event channel, spoken output and persistent history. Capture
//! never blocks on downstream work; saturated queues drop instead.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod history;
pub mod net;
pub mod pipeline;
pub mod recognition;
pub mod storage;
pub mod translation;
pub mod tts;

pub use audio::AudioSegment;
pub use config::{Config, SharedConfig};
pub use conversation::ConversationMode;
pub use history::{HistoryManager, HistoryRecord};
pub use pipeline::{EventSender, PerfSnapshot, Pipeline, PipelineEvent};
pub use recognition::{
    BackendSet, RecognitionEngine, RecognitionResult, Recognizer,
};
pub use storage::CacheStore;
pub use translation::{
    OfflineTranslator, PairTranslator, TranslationBackend, TranslationEngine, TranslationOutcome,
};
pub use tts::TtsManager;
