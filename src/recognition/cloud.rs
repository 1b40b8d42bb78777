//! Cloud speech-to-text over HTTP.
//!
//! Segments are WAV-encoded, base64'd and POSTed as JSON to the configured
//! service endpoint. The service contract is a single JSON object with the
//! transcript and an optional confidence.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{RecognitionResult, Recognizer};
use crate::audio::AudioSegment;
use crate::net::UREQ_AGENT;

#[derive(Debug, Clone, Serialize)]
struct SttRequest {
    /// Base64 encoded audio (WAV, mono)
    audio_b64: String,
    /// Language code, None for auto-detect
    language: Option<String>,
    task: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SttResponse {
    text: String,
    confidence: Option<f32>,
}

pub struct CloudSttClient {
    endpoint: String,
    api_key: String,
    language: Option<String>,
}

impl CloudSttClient {
    /// `endpoint` is the service base URL, e.g. "http://127.0.0.1:6006".
    /// `language` of None lets the service auto-detect.
    pub fn new(endpoint: &str, api_key: &str, language: Option<String>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language,
        }
    }
}

impl Recognizer for CloudSttClient {
    fn recognize(&self, segment: &AudioSegment) -> Result<RecognitionResult> {
        let wav = encode_wav(segment).context("failed to encode segment")?;
        let request = SttRequest {
            audio_b64: BASE64.encode(&wav),
            language: self.language.clone(),
            task: "transcribe".to_string(),
        };

        let url = format!("{}/asr", self.endpoint);
        let mut call = UREQ_AGENT.post(&url).header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            call = call.header("Authorization", &format!("Bearer {}", self.api_key));
        }
        let resp = call
            .send_json(&request)
            .with_context(|| format!("STT request to {} failed", url))?;

        let body: SttResponse = resp
            .into_body()
            .read_json()
            .context("invalid STT response")?;

        Ok(RecognitionResult {
            text: body.text.trim().to_string(),
            confidence: body.confidence.unwrap_or(1.0),
        })
    }
}

/// Serialize a segment as 16-bit PCM WAV in memory.
fn encode_wav(segment: &AudioSegment) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: segment.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &segment.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_produces_valid_header() {
        let segment = AudioSegment::new(vec![0.0, 0.5, -0.5, 1.0], 16_000);
        let wav = encode_wav(&segment).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + 8);
    }

    #[test]
    fn wav_encoding_clamps_out_of_range_samples() {
        let segment = AudioSegment::new(vec![2.0, -2.0], 16_000);
        let wav = encode_wav(&segment).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }
}
