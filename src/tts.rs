//! Spoken output: one FIFO queue, one worker, one utterance at a time.
//!
//! Speech fetch and playback are deliberately serialized so translations
//! never talk over each other. Failed fetches drop the utterance with a
//! warning; the queue keeps draining.

use minimp3::{Decoder, Frame};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::net::UREQ_AGENT;

/// Fetch retry backoff, in milliseconds
const RETRY_DELAYS: [u64; 3] = [200, 500, 1000];

struct TtsInner {
    queue: Mutex<VecDeque<(String, String)>>,
    signal: Condvar,
    shutdown: AtomicBool,
    volume: Mutex<f32>,
}

#[derive(Clone)]
pub struct TtsManager {
    inner: Arc<TtsInner>,
}

impl TtsManager {
    pub fn new(volume: f32) -> Self {
        let inner = Arc::new(TtsInner {
            queue: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
            volume: Mutex::new(volume.clamp(0.0, 1.0)),
        });

        {
            let inner = inner.clone();
            std::thread::Builder::new()
                .name("tts-player".to_string())
                .spawn(move || run_player(inner))
                .expect("failed to spawn TTS thread");
        }

        Self { inner }
    }

    /// Queue an utterance. Blank text is ignored.
    pub fn speak(&self, text: &str, lang: &str) {
        if text.trim().is_empty() {
            return;
        }
        {
            let mut queue = self.inner.queue.lock().unwrap();
            queue.push_back((text.to_string(), lang.to_string()));
        }
        self.inner.signal.notify_one();
    }

    /// Drop everything still queued. The utterance currently playing
    /// finishes; there is no per-utterance cancellation.
    pub fn stop(&self) {
        self.inner.queue.lock().unwrap().clear();
    }

    pub fn set_volume(&self, volume: f32) {
        *self.inner.volume.lock().unwrap() = volume.clamp(0.0, 1.0);
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.signal.notify_all();
    }
}

fn run_player(inner: Arc<TtsInner>) {
    loop {
        let (text, lang) = {
            let mut queue = inner.queue.lock().unwrap();
            loop {
                if inner.shutdown.load(Ordering::Relaxed) {
                    return;
                }
                if let Some(item) = queue.pop_front() {
                    break item;
                }
                queue = inner.signal.wait(queue).unwrap();
            }
        };

        let mp3 = match fetch_speech(&text, &lang) {
            Some(data) => data,
            None => {
                log::warn!("TTS fetch failed, dropping utterance");
                continue;
            }
        };

        let (samples, sample_rate) = match decode_mp3(&mp3) {
            Some(decoded) => decoded,
            None => {
                log::warn!("TTS decode failed, dropping utterance");
                continue;
            }
        };

        let volume = *inner.volume.lock().unwrap();
        if let Err(e) = play_blocking(samples, sample_rate, volume) {
            log::warn!("TTS playback failed: {}", e);
        }
    }
}

/// Google Translate TTS fetch with retry backoff.
fn fetch_speech(text: &str, lang: &str) -> Option<Vec<u8>> {
    let encoded = urlencoding::encode(text);
    let url = format!(
        "https://translate.google.com/translate_tts?ie=UTF-8&q={}&tl={}&client=tw-ob",
        encoded, lang
    );

    for (attempt, delay_ms) in RETRY_DELAYS.iter().enumerate() {
        match UREQ_AGENT
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .call()
        {
            Ok(resp) => {
                use std::io::Read;
                let mut data = Vec::new();
                let mut reader = resp.into_body().into_reader();
                if reader.read_to_end(&mut data).is_ok() && !data.is_empty() {
                    return Some(data);
                }
            }
            Err(e) => {
                log::debug!("TTS fetch attempt {} failed: {}", attempt + 1, e);
            }
        }
        if attempt < RETRY_DELAYS.len() - 1 {
            std::thread::sleep(Duration::from_millis(*delay_ms));
        }
    }
    None
}

/// Decode MP3 to mono PCM, returning samples and the source rate.
fn decode_mp3(data: &[u8]) -> Option<(Vec<i16>, u32)> {
    let mut decoder = Decoder::new(Cursor::new(data.to_vec()));
    let mut all_samples: Vec<i16> = Vec::new();
    let mut source_rate = 24_000u32;

    loop {
        match decoder.next_frame() {
            Ok(Frame {
                data,
                sample_rate,
                channels,
                ..
            }) => {
                source_rate = sample_rate as u32;
                if channels == 2 {
                    all_samples.extend(
                        data.chunks(2)
                            .map(|chunk| ((chunk[0] as i32 + chunk[1] as i32) / 2) as i16),
                    );
                } else {
                    all_samples.extend(data);
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(_) => break,
        }
    }

    if all_samples.is_empty() {
        None
    } else {
        Some((all_samples, source_rate))
    }
}

fn play_blocking(samples: Vec<i16>, sample_rate: u32, volume: f32) -> anyhow::Result<()> {
    let (_stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.set_volume(volume);
    sink.append(SamplesBuffer::new(1, sample_rate, samples));
    sink.sleep_until_end();
    Ok(())
}
