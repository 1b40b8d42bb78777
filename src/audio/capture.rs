//! Microphone and system-loopback capture.
//!
//! Both modes share the same discipline: the cpal callback only converts
//! samples and appends them to a shared buffer, while the capture loop owns
//! segmentation and hands finished segments to the dispatcher. The capture
//! loop never waits on downstream queue space.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::{Duration, Instant};

use super::{
    clamp_sample_rate, downmix_mono, resample_linear, rms, AudioSegment, SILENCE_RMS_THRESHOLD,
    TARGET_SAMPLE_RATE,
};

/// Pause length that closes a phrase in microphone mode
const PAUSE_THRESHOLD: Duration = Duration::from_millis(1200);

/// A phrase is force-closed after this long even without a pause
const PHRASE_CEILING: Duration = Duration::from_secs(15);

/// System-audio segments are sliced off once this much accumulates
const SYSTEM_SEGMENT_SECS: f32 = 5.0;

/// Ambient calibration duration for microphone mode
const CALIBRATION: Duration = Duration::from_secs(1);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Device or configuration failure with remediation guidance for the UI.
#[derive(Debug, Clone)]
pub struct DeviceError {
    pub message: String,
    pub remediation: String,
}

impl DeviceError {
    fn new(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remediation: remediation.into(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DeviceError {}

/// Continuous phrase-delimited microphone capture. Blocks until `stop` is
/// set; segments go to `on_segment` as they close.
pub fn run_microphone(
    device_name: Option<&str>,
    stop: Arc<AtomicBool>,
    on_segment: &(dyn Fn(AudioSegment) + Sync),
) -> Result<(), DeviceError> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => find_device_by_name(&host, name).ok_or_else(|| {
            DeviceError::new(
                format!("Input device '{}' not found", name),
                "Run with --list-devices to see available input devices.",
            )
        })?,
        None => host.default_input_device().ok_or_else(|| {
            DeviceError::new(
                "No microphone available",
                "Connect a microphone or select a device with --list-devices.",
            )
        })?,
    };

    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let _stream = build_capture_stream(&device, TARGET_SAMPLE_RATE, buffer.clone(), stop.clone())?;

    // Calibrate ambient noise once, then listen forever
    log::info!("calibrating ambient noise");
    std::thread::sleep(CALIBRATION);
    let ambient = {
        let mut buf = buffer.lock().unwrap();
        let samples = std::mem::take(&mut *buf);
        rms(&samples)
    };
    let threshold = (ambient * 1.5).max(0.005);
    log::info!(
        "microphone listening (ambient rms {:.4}, threshold {:.4})",
        ambient,
        threshold
    );

    let mut phrase: Vec<f32> = Vec::new();
    let mut in_phrase = false;
    let mut silence = Duration::ZERO;
    let mut phrase_start = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(POLL_INTERVAL);

        let chunk: Vec<f32> = {
            let mut buf = buffer.lock().unwrap();
            std::mem::take(&mut *buf)
        };
        if chunk.is_empty() {
            continue;
        }

        let energy = rms(&chunk);

        if !in_phrase {
            if energy >= threshold {
                in_phrase = true;
                silence = Duration::ZERO;
                phrase_start = Instant::now();
                phrase.extend(chunk);
            }
            continue;
        }

        phrase.extend(chunk);
        if energy < threshold {
            silence += POLL_INTERVAL;
        } else {
            silence = Duration::ZERO;
        }

        if silence >= PAUSE_THRESHOLD || phrase_start.elapsed() >= PHRASE_CEILING {
            let samples = std::mem::take(&mut phrase);
            in_phrase = false;
            silence = Duration::ZERO;
            if samples.len() >= (TARGET_SAMPLE_RATE / 4) as usize {
                on_segment(AudioSegment::new(samples, TARGET_SAMPLE_RATE));
            }
        }
    }

    Ok(())
}

/// Continuous system-audio capture via a loopback/monitor input device.
/// Accumulates a rolling buffer and slices off fixed 5 s segments; segments
/// below the silence threshold are discarded before dispatch.
pub fn run_system_audio(
    device_name: Option<&str>,
    stop: Arc<AtomicBool>,
    on_segment: &(dyn Fn(AudioSegment) + Sync),
) -> Result<(), DeviceError> {
    let host = cpal::default_host();
    let device = find_loopback_device(&host, device_name).ok_or_else(|| {
        DeviceError::new(
            "No working loopback device found",
            "Windows: enable 'Stereo Mix' under Sound Settings > Recording. \
             macOS: install BlackHole or Soundflower. \
             Linux: use the PulseAudio monitor device.",
        )
    })?;

    let native_rate = device
        .default_input_config()
        .map(|c| c.sample_rate() as u32)
        .unwrap_or(TARGET_SAMPLE_RATE);
    let target_rate = clamp_sample_rate(native_rate);
    let samples_needed = (target_rate as f32 * SYSTEM_SEGMENT_SECS) as usize;

    let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let _stream = build_capture_stream(&device, target_rate, buffer.clone(), stop.clone())?;

    log::info!(
        "capturing system audio ({} Hz, {:.0} s segments)",
        target_rate,
        SYSTEM_SEGMENT_SECS
    );

    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));

        let segment: Option<Vec<f32>> = {
            let mut buf = buffer.lock().unwrap();
            if buf.len() >= samples_needed {
                Some(buf.drain(..samples_needed).collect())
            } else {
                None
            }
        };

        if let Some(samples) = segment {
            // Cheap VAD substitute: skip segments with no audible energy
            if rms(&samples) < SILENCE_RMS_THRESHOLD {
                log::debug!("dropping silent system-audio segment");
                continue;
            }
            on_segment(AudioSegment::new(samples, target_rate));
        }
    }

    Ok(())
}

fn find_device_by_name(host: &cpal::Host, name: &str) -> Option<cpal::Device> {
    let wanted = name.to_lowercase();
    host.input_devices().ok()?.find(|d| {
        d.name()
            .map(|n| n.to_lowercase().contains(&wanted))
            .unwrap_or(false)
    })
}

/// Loopback devices show up as input devices with platform-specific names.
fn find_loopback_device(host: &cpal::Host, name: Option<&str>) -> Option<cpal::Device> {
    if let Some(name) = name {
        return find_device_by_name(host, name);
    }
    const LOOPBACK_HINTS: [&str; 5] = ["monitor", "stereo mix", "loopback", "blackhole", "wave out"];
    host.input_devices().ok()?.find(|d| {
        d.name()
            .map(|n| {
                let n = n.to_lowercase();
                LOOPBACK_HINTS.iter().any(|hint| n.contains(hint))
            })
            .unwrap_or(false)
    })
}

/// Build an input stream that appends mono samples, resampled to
/// `target_rate`, onto the shared buffer. The returned stream must be kept
/// alive for capture to continue.
fn build_capture_stream(
    device: &cpal::Device,
    target_rate: u32,
    buffer: Arc<Mutex<Vec<f32>>>,
    stop: Arc<AtomicBool>,
) -> Result<cpal::Stream, DeviceError> {
    let config = device.default_input_config().map_err(|e| {
        DeviceError::new(
            format!("Failed to read device configuration: {}", e),
            "The device may be in use by another application. Close other \
             apps using it or pick a different device.",
        )
    })?;

    let sample_rate = config.sample_rate() as u32;
    let channels = config.channels() as usize;
    let err_fn = |err| log::warn!("audio stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let stop = stop.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    let mono = downmix_mono(data, channels);
                    let resampled = resample_linear(&mono, sample_rate, target_rate);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(resampled);
                    }
                },
                err_fn,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let stop = stop.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    let mono = downmix_mono(&floats, channels);
                    let resampled = resample_linear(&mono, sample_rate, target_rate);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(resampled);
                    }
                },
                err_fn,
                None,
            )
        }
        other => {
            return Err(DeviceError::new(
                format!("Unsupported audio format: {:?}", other),
                "Pick a device with 16-bit integer or 32-bit float samples.",
            ))
        }
    }
    .map_err(|e| {
        DeviceError::new(
            format!("Failed to open audio stream: {}", e),
            "Close other apps using the audio device, check it is enabled in \
             system settings, or try another device.",
        )
    })?;

    stream.play().map_err(|e| {
        DeviceError::new(
            format!("Failed to start audio stream: {}", e),
            "Check the device is enabled and not exclusively held by another \
             application.",
        )
    })?;

    Ok(stream)
}
