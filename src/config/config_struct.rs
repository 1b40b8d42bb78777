//! Config struct definition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::defaults::*;
use crate::recognition::RecognitionEngine;

/// Config shared between the UI thread and pipeline workers. Engine and
/// language changes take effect on the next processed segment.
pub type SharedConfig = Arc<Mutex<Config>>;

/// Where captured audio comes from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioSourceKind {
    Microphone,
    System,
}

impl Default for AudioSourceKind {
    fn default() -> Self {
        AudioSourceKind::Microphone
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    // --- Languages ---
    #[serde(default = "default_source_language")]
    pub source_language: String, // "auto" enables detection
    #[serde(default = "default_target_language")]
    pub target_language: String,

    // --- Recognition ---
    #[serde(default)]
    pub recognition_engine: RecognitionEngine,
    #[serde(default)]
    pub audio_source: AudioSourceKind,
    #[serde(default)]
    pub input_device: Option<String>,
    #[serde(default)]
    pub loopback_device: Option<String>,
    #[serde(default = "default_cloud_stt_url")]
    pub cloud_stt_url: String,
    #[serde(default)]
    pub cloud_stt_api_key: String,
    #[serde(default)]
    pub whisper_model_path: Option<PathBuf>,
    #[serde(default)]
    pub acoustic_model_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub use_gpu: bool,

    // --- Translation ---
    #[serde(default = "default_true")]
    pub cache_translations: bool,
    #[serde(default = "default_true")]
    pub use_contextual: bool,
    #[serde(default = "default_true")]
    pub use_slang_expansion: bool,
    #[serde(default = "default_true")]
    pub use_autocorrect: bool,

    // --- Conversation mode ---
    #[serde(default)]
    pub conversation_mode: bool,
    #[serde(default = "default_language_a")]
    pub language_a: String,
    #[serde(default = "default_language_b")]
    pub language_b: String,
    #[serde(default)]
    pub conversation_auto: bool,

    // --- Output ---
    #[serde(default = "default_true")]
    pub auto_speak: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_history_limit")]
    pub max_history_items: usize,
}
