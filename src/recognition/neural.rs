//! Neural transcription via a local whisper model.

use anyhow::Result;
use std::path::Path;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{RecognitionResult, Recognizer, DEFAULT_MODEL_CONFIDENCE};
use crate::audio::{resample_linear, AudioSegment, TARGET_SAMPLE_RATE};

pub struct NeuralRecognizer {
    ctx: WhisperContext,
    /// Forced decode language; None lets the model detect
    language: Option<String>,
}

impl NeuralRecognizer {
    pub fn new(model_path: &Path, language: Option<String>) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!(
                "whisper model not found at {}. Download a ggml model file first.",
                model_path.display()
            );
        }
        let params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(&model_path.to_string_lossy(), params)
            .map_err(|e| anyhow::anyhow!("failed to load whisper model: {:?}", e))?;
        Ok(Self { ctx, language })
    }
}

impl Recognizer for NeuralRecognizer {
    fn recognize(&self, segment: &AudioSegment) -> Result<RecognitionResult> {
        let samples = if segment.sample_rate != TARGET_SAMPLE_RATE {
            resample_linear(&segment.samples, segment.sample_rate, TARGET_SAMPLE_RATE)
        } else {
            segment.samples.clone()
        };

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow::anyhow!("whisper state error: {:?}", e))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if let Some(ref lang) = self.language {
            params.set_language(Some(lang.as_str()));
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| anyhow::anyhow!("whisper transcription failed: {:?}", e))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| anyhow::anyhow!("whisper segment count failed: {:?}", e))?;
        let mut transcription = String::new();
        for i in 0..num_segments {
            let segment_text = state
                .full_get_segment_text(i)
                .map_err(|e| anyhow::anyhow!("whisper segment read failed: {:?}", e))?;
            transcription.push_str(&segment_text);
        }

        Ok(RecognitionResult {
            text: transcription.trim().to_string(),
            confidence: DEFAULT_MODEL_CONFIDENCE,
        })
    }
}
