//! Pipeline wiring: capture thread, dispatcher, router, engine, sinks.
//!
//! One dedicated thread captures audio continuously and never performs
//! recognition itself. Recognition workers hand non-empty phrases to the
//! router and submit translations asynchronously; completed translations
//! fan out to the overlay event channel, the TTS queue and the history
//! store. There is no ordering guarantee across utterances.

pub mod events;
pub mod monitor;
pub mod pool;

pub use events::{channel, EventSender, PipelineEvent};
pub use monitor::{PerfSnapshot, PerformanceMonitor};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::{self, AudioSegment};
use crate::config::{AudioSourceKind, SharedConfig};
use crate::conversation::ConversationMode;
use crate::history::{HistoryManager, HistoryRecord};
use crate::recognition::{BackendSet, RecognitionDispatcher, RecognitionResult};
use crate::translation::TranslationEngine;
use crate::tts::TtsManager;

pub struct Pipeline {
    config: SharedConfig,
    dispatcher: RecognitionDispatcher,
    engine: Arc<TranslationEngine>,
    events: EventSender,
    stop: Arc<AtomicBool>,
    monitor: Arc<PerformanceMonitor>,
}

impl Pipeline {
    pub fn new(
        config: SharedConfig,
        backends: BackendSet,
        engine: Arc<TranslationEngine>,
        conversation: Arc<Mutex<ConversationMode>>,
        history: Arc<HistoryManager>,
        tts: Option<TtsManager>,
        events: EventSender,
    ) -> Self {
        let handler = phrase_handler(
            config.clone(),
            engine.clone(),
            conversation,
            history,
            tts,
            events.clone(),
        );
        let dispatcher = RecognitionDispatcher::new(config.clone(), backends, handler);

        Self {
            config,
            dispatcher,
            engine,
            events,
            stop: Arc::new(AtomicBool::new(false)),
            monitor: Arc::new(PerformanceMonitor::new()),
        }
    }

    /// Spawn the capture and monitor threads. Capture failures surface as
    /// error events; they end the listening session, not the process.
    pub fn start(self: &Arc<Self>) {
        self.stop.store(false, Ordering::SeqCst);

        let (source, input_device, loopback_device) = {
            let config = self.config.lock().unwrap();
            (
                config.audio_source,
                config.input_device.clone(),
                config.loopback_device.clone(),
            )
        };

        {
            let pipeline = self.clone();
            let stop = self.stop.clone();
            std::thread::Builder::new()
                .name("audio-capture".to_string())
                .spawn(move || {
                    let submit = {
                        let pipeline = pipeline.clone();
                        move |segment: AudioSegment| {
                            pipeline.dispatcher.submit(segment);
                        }
                    };
                    let result = match source {
                        AudioSourceKind::Microphone => audio::run_microphone(
                            input_device.as_deref(),
                            stop,
                            &submit,
                        ),
                        AudioSourceKind::System => audio::run_system_audio(
                            loopback_device.as_deref(),
                            stop,
                            &submit,
                        ),
                    };
                    if let Err(e) = result {
                        log::error!("capture failed: {}", e.message);
                        pipeline.events.send(PipelineEvent::Error {
                            message: e.message,
                            remediation: Some(e.remediation),
                        });
                    }
                })
                .expect("failed to spawn capture thread");
        }

        {
            let pipeline = self.clone();
            let stop = self.stop.clone();
            std::thread::Builder::new()
                .name("perf-monitor".to_string())
                .spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        std::thread::sleep(Duration::from_millis(250));
                        if pipeline.monitor.should_emit() {
                            pipeline
                                .events
                                .send(PipelineEvent::Performance(pipeline.snapshot()));
                        }
                    }
                })
                .expect("failed to spawn monitor thread");
        }

        self.events
            .send(PipelineEvent::Status("listening".to_string()));
    }

    /// Non-accepting stop: the capture loop and pools wind down, in-flight
    /// work finishes.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.dispatcher.shutdown();
        self.engine.shutdown();
        self.events
            .send(PipelineEvent::Status("stopped".to_string()));
    }

    /// Feed a segment directly, bypassing audio capture. Used by tests and
    /// by callers that source audio elsewhere.
    pub fn submit_segment(&self, segment: AudioSegment) -> bool {
        self.dispatcher.submit(segment)
    }

    pub fn snapshot(&self) -> PerfSnapshot {
        PerfSnapshot {
            recognition_queue: self.dispatcher.queue_depth(),
            translation_queue: self.engine.queue_depth(),
            avg_processing_ms: self.dispatcher.avg_processing_ms(),
            dropped_segments: self.dispatcher.dropped_segments(),
        }
    }
}

/// Build the per-phrase handler run on recognition worker threads.
fn phrase_handler(
    config: SharedConfig,
    engine: Arc<TranslationEngine>,
    conversation: Arc<Mutex<ConversationMode>>,
    history: Arc<HistoryManager>,
    tts: Option<TtsManager>,
    events: EventSender,
) -> Arc<dyn Fn(RecognitionResult) + Send + Sync> {
    Arc::new(move |result: RecognitionResult| {
        events.send(PipelineEvent::PhraseDetected {
            text: result.text.clone(),
            confidence: result.confidence,
        });

        let (source_language, target_language, auto_speak, engine_name, conversation_enabled) = {
            let config = config.lock().unwrap();
            (
                config.source_language.clone(),
                config.target_language.clone(),
                config.auto_speak,
                config.recognition_engine.as_str().to_string(),
                config.conversation_mode,
            )
        };

        let (src, tgt) = if conversation_enabled {
            let mut conversation = conversation.lock().unwrap();
            let route = conversation.route(&result.text, Some(&source_language));
            if !conversation.should_translate(&route.source) {
                log::debug!("skipping no-op translation for '{}'", route.source);
                return;
            }
            (route.source, route.target)
        } else {
            (source_language, target_language)
        };

        // Cheap no-op check outside conversation mode too
        if src == tgt {
            return;
        }

        let mode = if conversation_enabled {
            "conversation"
        } else {
            "standard"
        };

        let history = history.clone();
        let tts = tts.clone();
        let events = events.clone();
        let original = result.text.clone();
        let recognition_confidence = result.confidence;
        let mode = mode.to_string();
        let tgt_for_callback = tgt.clone();
        let src_for_callback = src.clone();

        engine.translate_async(&result.text, &src, &tgt, move |outcome| {
            events.send(PipelineEvent::TranslationComplete {
                original: original.clone(),
                translated: outcome.text.clone(),
                source_lang: src_for_callback.clone(),
                target_lang: tgt_for_callback.clone(),
                confidence: outcome.confidence,
                duration_ms: outcome.duration_ms,
            });

            if auto_speak {
                if let Some(tts) = &tts {
                    tts.speak(&outcome.text, &tgt_for_callback);
                }
            }

            history.append(HistoryRecord {
                source_text: original,
                translated_text: outcome.text,
                source_lang: src_for_callback,
                target_lang: tgt_for_callback,
                mode,
                engine: engine_name,
                confidence: recognition_confidence,
                duration_ms: outcome.duration_ms,
                timestamp: String::new(),
            });
        });
    })
}
