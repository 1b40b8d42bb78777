//! Events crossing from pipeline workers to the UI-owning thread.
//!
//! Workers never touch UI state directly; everything goes over this
//! channel and the receiving thread applies it.

use std::sync::mpsc::{self, Receiver, Sender};

use super::monitor::PerfSnapshot;

#[derive(Clone, Debug)]
pub enum PipelineEvent {
    /// A phrase was recognized (before translation)
    PhraseDetected { text: String, confidence: f32 },
    /// A translation finished for an earlier phrase
    TranslationComplete {
        original: String,
        translated: String,
        source_lang: String,
        target_lang: String,
        confidence: f32,
        duration_ms: u64,
    },
    Performance(PerfSnapshot),
    Status(String),
    Error {
        message: String,
        remediation: Option<String>,
    },
}

/// Cloneable sending half. Send failures mean the UI went away; workers
/// must keep running regardless, so they are ignored.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<PipelineEvent>,
}

impl EventSender {
    pub fn send(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

pub fn channel() -> (EventSender, Receiver<PipelineEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, rx)
}
