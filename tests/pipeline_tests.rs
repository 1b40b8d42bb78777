// End-to-end pipeline tests with mock recognizer and translation backends.
//
// These drive the public pipeline surface the way the capture thread does:
// segments in, events and history records out.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use live_translator::audio::AudioSegment;
use live_translator::config::Config;
use live_translator::conversation::ConversationMode;
use live_translator::history::HistoryManager;
use live_translator::pipeline::{self, Pipeline, PipelineEvent};
use live_translator::recognition::{BackendSet, RecognitionResult, Recognizer};
use live_translator::translation::{OfflineTranslator, TranslationBackend, TranslationEngine};

struct MockRecognizer {
    text: &'static str,
    confidence: f32,
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, _segment: &AudioSegment) -> Result<RecognitionResult> {
        Ok(RecognitionResult {
            text: self.text.to_string(),
            confidence: self.confidence,
        })
    }
}

struct MockOnline {
    response: &'static str,
    delay: Duration,
    calls: AtomicUsize,
}

impl TranslationBackend for MockOnline {
    fn translate(&self, _text: &str, _src: &str, _tgt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.response.to_string())
    }
}

fn segment() -> AudioSegment {
    AudioSegment::new(vec![0.1; 16_000], 16_000)
}

struct Harness {
    pipeline: Pipeline,
    history: Arc<HistoryManager>,
    online: Arc<MockOnline>,
    rx: std::sync::mpsc::Receiver<PipelineEvent>,
    _dir: tempfile::TempDir,
}

fn harness(configure: impl FnOnce(&mut Config), conversation: ConversationMode) -> Harness {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "fr".to_string();
    config.auto_speak = false;
    configure(&mut config);
    let config = Arc::new(Mutex::new(config));

    let online = Arc::new(MockOnline {
        response: "bonjour",
        delay: Duration::from_millis(50),
        calls: AtomicUsize::new(0),
    });

    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryManager::new(&dir.path().join("history.db"), 100));

    let engine = TranslationEngine::new(
        config.clone(),
        online.clone(),
        Arc::new(OfflineTranslator::new()),
        None,
    );

    let (events, rx) = pipeline::channel();
    let pipeline = Pipeline::new(
        config,
        BackendSet::uniform(Arc::new(MockRecognizer {
            text: "hello there",
            confidence: 0.95,
        })),
        engine,
        Arc::new(Mutex::new(conversation)),
        history.clone(),
        None,
        events,
    );

    Harness {
        pipeline,
        history,
        online,
        rx,
        _dir: dir,
    }
}

fn wait_for_history(history: &HistoryManager) -> Vec<live_translator::HistoryRecord> {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        history.flush();
        let records = history.query("", 10).unwrap();
        if !records.is_empty() || Instant::now() > deadline {
            return records;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn end_to_end_scenario_produces_expected_history_record() {
    let h = harness(|_| {}, ConversationMode::new("en", "fr"));

    assert!(h.pipeline.submit_segment(segment()));

    // Phrase event first, then the translation
    let mut saw_phrase = false;
    let mut translation = None;
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        match h.rx.recv_timeout(Duration::from_millis(200)) {
            Ok(PipelineEvent::PhraseDetected { text, confidence }) => {
                assert_eq!(text, "hello there");
                assert!((confidence - 0.95).abs() < f32::EPSILON);
                saw_phrase = true;
            }
            Ok(PipelineEvent::TranslationComplete {
                original,
                translated,
                source_lang,
                target_lang,
                confidence,
                duration_ms,
            }) => {
                assert_eq!(original, "hello there");
                assert_eq!(translated, "bonjour");
                assert_eq!(source_lang, "en");
                assert_eq!(target_lang, "fr");
                assert!((confidence - 1.0).abs() < f32::EPSILON);
                assert!(duration_ms >= 50, "mocked backend takes 50 ms");
                translation = Some(translated);
                break;
            }
            _ => {}
        }
    }
    assert!(saw_phrase, "phrase-detected event must precede translation");
    assert!(translation.is_some(), "translation event never arrived");

    let records = wait_for_history(&h.history);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.source_text, "hello there");
    assert_eq!(record.translated_text, "bonjour");
    assert_eq!(record.source_lang, "en");
    assert_eq!(record.target_lang, "fr");
    assert_eq!(record.mode, "standard");
    assert_eq!(record.engine, "cloud");
    assert!((record.confidence - 0.95).abs() < f32::EPSILON);
    assert!(record.duration_ms >= 50);
}

#[test]
fn no_op_routes_skip_the_translation_engine() {
    // Degenerate conversation pair: every utterance already is the target
    let mut conversation = ConversationMode::new("en", "en");
    conversation.enable("en", "en", false);
    let h = harness(|config| config.conversation_mode = true, conversation);

    assert!(h.pipeline.submit_segment(segment()));

    // The phrase is still surfaced to the UI
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut saw_phrase = false;
    while Instant::now() < deadline && !saw_phrase {
        if let Ok(PipelineEvent::PhraseDetected { .. }) =
            h.rx.recv_timeout(Duration::from_millis(100))
        {
            saw_phrase = true;
        }
    }
    assert!(saw_phrase);

    // But nothing reaches the engine or the history
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(h.online.calls.load(Ordering::SeqCst), 0);
    h.history.flush();
    assert!(h.history.query("", 10).unwrap().is_empty());
}

#[test]
fn conversation_mode_routes_to_the_other_language() {
    let mut conversation = ConversationMode::new("en", "fr");
    conversation.enable("en", "fr", false);
    let h = harness(
        |config| {
            config.conversation_mode = true;
            config.source_language = "en".to_string();
        },
        conversation,
    );

    assert!(h.pipeline.submit_segment(segment()));

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        assert!(Instant::now() < deadline, "translation event never arrived");
        if let Ok(PipelineEvent::TranslationComplete {
            source_lang,
            target_lang,
            ..
        }) = h.rx.recv_timeout(Duration::from_millis(200))
        {
            assert_eq!(source_lang, "en");
            assert_eq!(target_lang, "fr");
            break;
        }
    }

    let records = wait_for_history(&h.history);
    assert_eq!(records[0].mode, "conversation");
}

#[test]
fn stopped_pipeline_rejects_segments() {
    let h = harness(|_| {}, ConversationMode::new("en", "fr"));
    h.pipeline.stop();
    assert!(!h.pipeline.submit_segment(segment()));
}

#[test]
fn repeated_phrases_hit_the_cache() {
    let h = harness(|_| {}, ConversationMode::new("en", "fr"));

    assert!(h.pipeline.submit_segment(segment()));

    // Wait for the first translation to complete and populate the cache
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        assert!(Instant::now() < deadline);
        if let Ok(PipelineEvent::TranslationComplete { .. }) =
            h.rx.recv_timeout(Duration::from_millis(200))
        {
            break;
        }
    }

    assert!(h.pipeline.submit_segment(segment()));
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        assert!(Instant::now() < deadline);
        if let Ok(PipelineEvent::TranslationComplete { duration_ms, .. }) =
            h.rx.recv_timeout(Duration::from_millis(200))
        {
            assert_eq!(duration_ms, 0, "second identical phrase must be served from cache");
            break;
        }
    }
    assert_eq!(h.online.calls.load(Ordering::SeqCst), 1);
}
