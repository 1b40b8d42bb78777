//! Headless entry point: wires the real backends, runs the pipeline, and
//! owns the UI thread (a stdin command loop plus an event printer).

use anyhow::Result;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use live_translator::config::{self, AudioSourceKind, SharedConfig};
use live_translator::conversation::ConversationMode;
use live_translator::history::HistoryManager;
use live_translator::pipeline::{self, EventSender, Pipeline, PipelineEvent};
use live_translator::recognition::{
    AcousticRecognizer, BackendSet, CloudSttClient, NeuralRecognizer, RecognitionEngine,
};
use live_translator::storage::CacheStore;
use live_translator::translation::{GtxTranslator, OfflineTranslator, TranslationEngine};
use live_translator::tts::TtsManager;

#[derive(Parser, Debug)]
#[command(name = "live-translator", about = "Continuous speech translation")]
struct Args {
    /// Audio source: "mic" or "system"
    #[arg(long)]
    source: Option<String>,

    /// Recognition engine: "cloud", "acoustic" or "neural"
    #[arg(long)]
    engine: Option<String>,

    /// Target language code, e.g. "fr"
    #[arg(long)]
    target: Option<String>,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// List supported languages and exit
    #[arg(long)]
    list_languages: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        list_devices();
        return Ok(());
    }
    if args.list_languages {
        for language in config::get_all_languages() {
            println!("{}", language);
        }
        return Ok(());
    }

    let mut loaded = config::load_config();
    if let Some(source) = &args.source {
        loaded.audio_source = match source.as_str() {
            "system" => AudioSourceKind::System,
            _ => AudioSourceKind::Microphone,
        };
    }
    if let Some(engine) = &args.engine {
        match RecognitionEngine::parse(engine) {
            Some(parsed) => loaded.recognition_engine = parsed,
            None => anyhow::bail!("unknown engine '{}'", engine),
        }
    }
    if let Some(target) = &args.target {
        loaded.target_language = target.clone();
    }

    let config: SharedConfig = Arc::new(Mutex::new(loaded));

    // Services
    let db_path = config::data_file_path("translator_history.db");
    let max_items = config.lock().unwrap().max_history_items;
    let history = Arc::new(HistoryManager::new(&db_path, max_items));
    let store = match CacheStore::open(&db_path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            log::warn!("persistent cache unavailable: {:#}", e);
            None
        }
    };
    let offline = Arc::new(OfflineTranslator::new());
    let volume = config.lock().unwrap().volume;
    let tts = TtsManager::new(volume);

    let conversation = {
        let config = config.lock().unwrap();
        let mut mode = ConversationMode::new(&config.language_a, &config.language_b);
        if config.conversation_mode {
            mode.enable(
                &config.language_a,
                &config.language_b,
                config.conversation_auto,
            );
        }
        Arc::new(Mutex::new(mode))
    };

    let (events, rx) = pipeline::channel();

    let build_pipeline = {
        let config = config.clone();
        let offline = offline.clone();
        let store = store.clone();
        let conversation = conversation.clone();
        let history = history.clone();
        let tts = tts.clone();
        let events = events.clone();
        move || -> Arc<Pipeline> {
            let engine = TranslationEngine::new(
                config.clone(),
                Arc::new(GtxTranslator),
                offline.clone(),
                store.clone(),
            );
            let pipeline = Arc::new(Pipeline::new(
                config.clone(),
                build_backends(&config, &events),
                engine,
                conversation.clone(),
                history.clone(),
                Some(tts.clone()),
                events.clone(),
            ));
            pipeline.start();
            pipeline
        }
    };

    let pipeline = Arc::new(Mutex::new(Some(build_pipeline())));
    let quit = Arc::new(AtomicBool::new(false));

    // Command thread: reads stdin and applies start/stop/engine/mode changes
    {
        let pipeline = pipeline.clone();
        let config = config.clone();
        let conversation = conversation.clone();
        let history = history.clone();
        let quit = quit.clone();
        let tts = tts.clone();
        std::thread::Builder::new()
            .name("command-loop".to_string())
            .spawn(move || {
                command_loop(
                    pipeline,
                    build_pipeline,
                    config,
                    conversation,
                    history,
                    tts,
                    quit,
                );
            })
            .expect("failed to spawn command thread");
    }

    // This thread owns the UI: pipeline events render here and nowhere else
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => render_event(event),
            Err(RecvTimeoutError::Timeout) => {
                if quit.load(Ordering::Relaxed) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    history.flush();
    Ok(())
}

fn render_event(event: PipelineEvent) {
    match event {
        PipelineEvent::PhraseDetected { text, confidence } => {
            println!("heard: {} (confidence {:.2})", text, confidence);
        }
        PipelineEvent::TranslationComplete {
            original,
            translated,
            source_lang,
            target_lang,
            confidence,
            duration_ms,
        } => {
            println!(
                "[{}->{}] {} => {} ({:.2}, {} ms)",
                source_lang, target_lang, original, translated, confidence, duration_ms
            );
        }
        PipelineEvent::Performance(snapshot) => {
            log::debug!(
                "queues: recognition {} / translation {}, avg {:.0} ms ({}), dropped {}",
                snapshot.recognition_queue,
                snapshot.translation_queue,
                snapshot.avg_processing_ms,
                snapshot.band(),
                snapshot.dropped_segments
            );
        }
        PipelineEvent::Status(status) => println!("status: {}", status),
        PipelineEvent::Error {
            message,
            remediation,
        } => {
            eprintln!("error: {}", message);
            if let Some(remediation) = remediation {
                eprintln!("  hint: {}", remediation);
            }
        }
    }
}

fn command_loop(
    pipeline: Arc<Mutex<Option<Arc<Pipeline>>>>,
    build_pipeline: impl Fn() -> Arc<Pipeline>,
    config: SharedConfig,
    conversation: Arc<Mutex<ConversationMode>>,
    history: Arc<HistoryManager>,
    tts: TtsManager,
    quit: Arc<AtomicBool>,
) {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["stop"] => {
                if let Some(pipeline) = pipeline.lock().unwrap().take() {
                    pipeline.stop();
                }
            }
            ["start"] => {
                let mut guard = pipeline.lock().unwrap();
                if guard.is_none() {
                    *guard = Some(build_pipeline());
                } else {
                    println!("already listening");
                }
            }
            ["engine", name] => match RecognitionEngine::parse(name) {
                Some(engine) => {
                    config.lock().unwrap().recognition_engine = engine;
                    println!("engine: {} (applies to the next segment)", engine);
                }
                None => println!("unknown engine '{}', expected cloud|acoustic|neural", name),
            },
            ["target", lang] => {
                config.lock().unwrap().target_language = lang.to_string();
                println!("target language: {}", lang);
            }
            ["mode", "off"] => {
                config.lock().unwrap().conversation_mode = false;
                conversation.lock().unwrap().disable();
                println!("conversation mode disabled");
            }
            ["mode", a, b] | ["mode", a, b, "auto"] => {
                let auto = parts.len() == 4;
                {
                    let mut config = config.lock().unwrap();
                    config.conversation_mode = true;
                    config.language_a = a.to_string();
                    config.language_b = b.to_string();
                    config.conversation_auto = auto;
                }
                conversation.lock().unwrap().enable(a, b, auto);
                println!("{}", conversation.lock().unwrap().status_message());
            }
            ["status"] => {
                println!("{}", conversation.lock().unwrap().status_message());
                if let Some(pipeline) = pipeline.lock().unwrap().as_ref() {
                    let snapshot = pipeline.snapshot();
                    println!(
                        "queues: recognition {} / translation {}, avg {:.0} ms ({})",
                        snapshot.recognition_queue,
                        snapshot.translation_queue,
                        snapshot.avg_processing_ms,
                        snapshot.band()
                    );
                }
            }
            ["history"] => match history.query("", 10) {
                Ok(records) => {
                    for r in records {
                        println!(
                            "[{}] {} => {} ({}->{})",
                            r.timestamp, r.source_text, r.translated_text, r.source_lang,
                            r.target_lang
                        );
                    }
                }
                Err(e) => println!("history query failed: {}", e),
            },
            ["clear-history"] => {
                history.clear_all();
                println!("history cleared");
            }
            ["quit"] | ["exit"] => {
                if let Some(pipeline) = pipeline.lock().unwrap().take() {
                    pipeline.stop();
                }
                tts.shutdown();
                quit.store(true, Ordering::SeqCst);
                break;
            }
            [] => {}
            _ => println!(
                "commands: start | stop | engine <name> | target <lang> | \
                 mode <a> <b> [auto] | mode off | status | history | \
                 clear-history | quit"
            ),
        }
    }
}

/// Wire the recognizer backends the current configuration can support.
/// Missing local models degrade to an unconfigured slot with a warning; a
/// mid-session switch to that engine drops segments instead of crashing.
fn build_backends(config: &SharedConfig, events: &EventSender) -> BackendSet {
    let (endpoint, api_key, source_language, whisper_model, acoustic_dir, use_gpu) = {
        let config = config.lock().unwrap();
        (
            config.cloud_stt_url.clone(),
            config.cloud_stt_api_key.clone(),
            config.source_language.clone(),
            config.whisper_model_path.clone(),
            config.acoustic_model_dir.clone(),
            config.use_gpu,
        )
    };

    let language = if source_language == "auto" {
        None
    } else {
        Some(source_language)
    };

    let mut backends = BackendSet {
        cloud: Some(Arc::new(CloudSttClient::new(
            &endpoint,
            &api_key,
            language.clone(),
        ))),
        acoustic: None,
        neural: None,
    };

    if let Some(dir) = acoustic_dir {
        match AcousticRecognizer::new(&dir, use_gpu) {
            Ok(recognizer) => backends.acoustic = Some(Arc::new(recognizer)),
            Err(e) => {
                log::warn!("acoustic model unavailable: {:#}", e);
                events.send(PipelineEvent::Status(
                    "acoustic model unavailable, engine disabled".to_string(),
                ));
            }
        }
    }

    if let Some(path) = whisper_model {
        match NeuralRecognizer::new(&path, language) {
            Ok(recognizer) => backends.neural = Some(Arc::new(recognizer)),
            Err(e) => {
                log::warn!("whisper model unavailable: {:#}", e);
                events.send(PipelineEvent::Status(
                    "whisper model unavailable, engine disabled".to_string(),
                ));
            }
        }
    }

    backends
}

fn list_devices() {
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => {
            println!("input devices:");
            for device in devices {
                match device.name() {
                    Ok(name) => println!("  {}", name),
                    Err(_) => println!("  <unnamed>"),
                }
            }
        }
        Err(e) => eprintln!("failed to enumerate devices: {}", e),
    }
}
