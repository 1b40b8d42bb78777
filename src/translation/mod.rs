//! Translation engine with layered caching and graceful offline fallback.
//!
//! Lookup order per request: in-process cache, persistent cache, online
//! backend, offline pair models, identity. The engine always returns a
//! result; degradation shows up only in the confidence score.

pub mod cache;
pub mod contextual;
pub mod offline;
pub mod online;

pub use cache::{MemoryCache, MEMORY_CACHE_CAPACITY};
pub use contextual::{ContextKind, ContextualProcessor};
pub use offline::{
    OfflineTranslator, PairTranslator, OFFLINE_DIRECT_CONFIDENCE, OFFLINE_PIVOT_CONFIDENCE,
};
pub use online::GtxTranslator;

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::SharedConfig;
use crate::conversation::detect_language;
use crate::pipeline::pool::WorkerPool;
use crate::storage::CacheStore;

/// Confidence reported for online translations
pub const ONLINE_CONFIDENCE: f32 = 1.0;

/// Confidence when every backend failed and the text passed through
pub const FAILURE_CONFIDENCE: f32 = 0.0;

const TRANSLATION_THREADS: usize = 6;

/// Online translation backend contract. May fail; the engine falls back.
pub trait TranslationBackend: Send + Sync {
    fn translate(&self, text: &str, src: &str, tgt: &str) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TranslationOutcome {
    pub text: String,
    pub duration_ms: u64,
    pub confidence: f32,
}

pub struct TranslationEngine {
    online: Arc<dyn TranslationBackend>,
    offline: Arc<OfflineTranslator>,
    memory_cache: Mutex<MemoryCache>,
    store: Option<Arc<CacheStore>>,
    contextual: ContextualProcessor,
    config: SharedConfig,
    pool: WorkerPool,
}

impl TranslationEngine {
    pub fn new(
        config: SharedConfig,
        online: Arc<dyn TranslationBackend>,
        offline: Arc<OfflineTranslator>,
        store: Option<Arc<CacheStore>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            online,
            offline,
            memory_cache: Mutex::new(MemoryCache::new(MEMORY_CACHE_CAPACITY)),
            store,
            contextual: ContextualProcessor::new(),
            config,
            pool: WorkerPool::new("translate", TRANSLATION_THREADS, None),
        })
    }

    /// Translate text, never failing: worst case is identity text with zero
    /// confidence. Cached results come back with `duration_ms == 0`.
    pub fn translate(&self, text: &str, src: &str, tgt: &str) -> TranslationOutcome {
        if text.trim().is_empty() {
            return TranslationOutcome {
                text: String::new(),
                duration_ms: 0,
                confidence: 1.0,
            };
        }

        let (cache_enabled, use_contextual, use_slang, use_autocorrect) = {
            let config = self.config.lock().unwrap();
            (
                config.cache_translations,
                config.use_contextual,
                config.use_slang_expansion,
                config.use_autocorrect,
            )
        };

        let original_text = text;

        // Auto-detection is resolved before any cache lookup so nothing is
        // ever keyed under "auto".
        let src = if src == "auto" {
            resolve_source_language(text)
        } else {
            src.to_string()
        };

        let mut work_text = original_text.to_string();
        if use_autocorrect {
            work_text = self.contextual.autocorrect(&work_text, &src);
        }
        if use_slang {
            let (expanded, was_expanded) = self.contextual.expand_slang(&work_text, &src);
            if was_expanded {
                log::debug!("slang expanded: {} -> {}", original_text, expanded);
            }
            work_text = expanded;
        }

        let key = MemoryCache::key(&work_text, &src, tgt);

        // Tier 1: in-process
        if let Some((cached, confidence)) = self.memory_cache.lock().unwrap().get(&key) {
            log::debug!("memory cache hit for {}->{}", src, tgt);
            let text = self.maybe_enhance(use_contextual, original_text, &cached, tgt);
            return TranslationOutcome {
                text,
                duration_ms: 0,
                confidence,
            };
        }

        // Tier 2: persistent store
        if cache_enabled {
            if let Some(store) = &self.store {
                if let Some(cached) = store.get(&work_text, &src, tgt) {
                    log::debug!("persistent cache hit for {}->{}", src, tgt);
                    self.memory_cache
                        .lock()
                        .unwrap()
                        .insert(key, cached.clone(), ONLINE_CONFIDENCE);
                    let text = self.maybe_enhance(use_contextual, original_text, &cached, tgt);
                    return TranslationOutcome {
                        text,
                        duration_ms: 0,
                        confidence: ONLINE_CONFIDENCE,
                    };
                }
            }
        }

        // Live path: online, then offline, then identity
        let start = Instant::now();
        let (translated, confidence) = match self.online.translate(&work_text, &src, tgt) {
            Ok(translated) => (translated, ONLINE_CONFIDENCE),
            Err(e) => {
                log::warn!("online translation failed: {:#}", e);
                match self.offline.translate_offline(&work_text, &src, tgt) {
                    Some((translated, confidence)) => (translated, confidence),
                    None => (work_text.clone(), FAILURE_CONFIDENCE),
                }
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let enhanced = self.maybe_enhance(use_contextual, original_text, &translated, tgt);

        // Write-through, keyed by the preprocessed text. Total failures are
        // not cached so a later retry can still succeed.
        if cache_enabled && confidence > FAILURE_CONFIDENCE {
            self.memory_cache
                .lock()
                .unwrap()
                .insert(key, enhanced.clone(), confidence);
            if let Some(store) = &self.store {
                store.put(&work_text, &enhanced, &src, tgt);
            }
        }

        TranslationOutcome {
            text: enhanced,
            duration_ms,
            confidence,
        }
    }

    /// Non-blocking translation on the dedicated pool. The callback runs on
    /// a worker thread; UI state must be updated via the event channel, not
    /// from the callback directly.
    pub fn translate_async<F>(self: &Arc<Self>, text: &str, src: &str, tgt: &str, callback: F)
    where
        F: FnOnce(TranslationOutcome) + Send + 'static,
    {
        let engine = self.clone();
        let text = text.to_string();
        let src = src.to_string();
        let tgt = tgt.to_string();
        self.pool.submit(move || {
            let outcome = engine.translate(&text, &src, &tgt);
            callback(outcome);
        });
    }

    pub fn queue_depth(&self) -> usize {
        self.pool.depth()
    }

    /// (hits, misses) for the in-process tier.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.memory_cache.lock().unwrap().stats()
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn maybe_enhance(
        &self,
        use_contextual: bool,
        original: &str,
        translated: &str,
        tgt: &str,
    ) -> String {
        if use_contextual {
            self.contextual.enhance(original, translated, tgt)
        } else {
            translated.to_string()
        }
    }
}

/// Resolve an "auto" source to a concrete language before caching. Falls
/// back to English when detection is unreliable.
fn resolve_source_language(text: &str) -> String {
    match detect_language(text) {
        Some((lang, confidence)) if confidence >= 0.8 => lang,
        _ => "en".to_string(),
    }
}
