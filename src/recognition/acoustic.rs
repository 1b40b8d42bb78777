//! Offline acoustic model via parakeet-rs.
//!
//! The model consumes fixed 160 ms chunks at 16 kHz and emits incremental
//! sentencepiece text. A few chunks of silence flush the decoder at the end
//! of a segment.

use anyhow::Result;
use parakeet_rs::{ExecutionConfig, ParakeetEOU};
use std::path::Path;
use std::sync::Mutex;

use super::{RecognitionResult, Recognizer, DEFAULT_MODEL_CONFIDENCE};
use crate::audio::{resample_linear, AudioSegment, TARGET_SAMPLE_RATE};

/// 160ms chunk at 16kHz = 2560 samples (recommended by parakeet-rs)
const CHUNK_SIZE: usize = 2560;

/// Silence chunks fed after the segment to flush pending text
const FLUSH_CHUNKS: usize = 3;

pub struct AcousticRecognizer {
    model: Mutex<ParakeetEOU>,
}

impl AcousticRecognizer {
    pub fn new(model_dir: &Path, use_gpu: bool) -> Result<Self> {
        if !model_dir.exists() {
            anyhow::bail!(
                "acoustic model directory not found at {}",
                model_dir.display()
            );
        }
        // Library default may pick an accelerator; an explicit plain config
        // pins execution to the CPU
        let exec = if use_gpu {
            None
        } else {
            Some(ExecutionConfig::new())
        };
        let model = ParakeetEOU::from_pretrained(model_dir, exec)
            .map_err(|e| anyhow::anyhow!("failed to load acoustic model: {:?}", e))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Recognizer for AcousticRecognizer {
    fn recognize(&self, segment: &AudioSegment) -> Result<RecognitionResult> {
        let samples = if segment.sample_rate != TARGET_SAMPLE_RATE {
            resample_linear(&segment.samples, segment.sample_rate, TARGET_SAMPLE_RATE)
        } else {
            segment.samples.clone()
        };

        let mut model = self.model.lock().unwrap();
        let mut text = String::new();

        for chunk in samples.chunks(CHUNK_SIZE) {
            let piece = if chunk.len() == CHUNK_SIZE {
                transcribe_chunk(&mut model, chunk)?
            } else {
                // Zero-pad the trailing partial chunk
                let mut padded = chunk.to_vec();
                padded.resize(CHUNK_SIZE, 0.0);
                transcribe_chunk(&mut model, &padded)?
            };
            text.push_str(&piece);
        }

        let silence = vec![0.0f32; CHUNK_SIZE];
        for _ in 0..FLUSH_CHUNKS {
            text.push_str(&transcribe_chunk(&mut model, &silence)?);
        }

        Ok(RecognitionResult {
            text: text.trim().to_string(),
            confidence: DEFAULT_MODEL_CONFIDENCE,
        })
    }
}

fn transcribe_chunk(model: &mut ParakeetEOU, chunk: &[f32]) -> Result<String> {
    let raw = model
        .transcribe(chunk, false)
        .map_err(|e| anyhow::anyhow!("acoustic transcription error: {:?}", e))?;
    Ok(process_sentencepiece_text(&raw))
}

/// Sentencepiece marks word starts with U+2581; turn them back into spaces.
fn process_sentencepiece_text(text: &str) -> String {
    let starts_with_word = text.starts_with('\u{2581}');
    let processed = text.replace('\u{2581}', " ");
    let processed = processed.trim();

    if processed.is_empty() {
        return String::new();
    }

    if starts_with_word {
        format!(" {}", processed)
    } else {
        processed.to_string()
    }
}
