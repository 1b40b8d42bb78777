//! Offline translation over registered language-pair models.
//!
//! Pair models are external collaborators registered at startup. A direct
//! pair is preferred; otherwise the text pivots through English at a
//! confidence discount. The discounts are policy constants, not measured
//! probabilities.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Confidence for a direct offline pair
pub const OFFLINE_DIRECT_CONFIDENCE: f32 = 0.85;

/// Confidence when pivoting through English
pub const OFFLINE_PIVOT_CONFIDENCE: f32 = 0.75;

const PIVOT_LANG: &str = "en";

/// A single installed translation model for one language direction.
pub trait PairTranslator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String>;
}

#[derive(Default)]
pub struct OfflineTranslator {
    pairs: Mutex<HashMap<(String, String), Arc<dyn PairTranslator>>>,
}

impl OfflineTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pair(&self, from: &str, to: &str, translator: Arc<dyn PairTranslator>) {
        let mut pairs = self.pairs.lock().unwrap();
        pairs.insert((from.to_string(), to.to_string()), translator);
        log::info!("offline pair registered: {}-{}", from, to);
    }

    pub fn installed_pairs(&self) -> Vec<String> {
        let pairs = self.pairs.lock().unwrap();
        let mut list: Vec<String> = pairs.keys().map(|(f, t)| format!("{}-{}", f, t)).collect();
        list.sort();
        list
    }

    /// Direct pair installed, or both pivot legs through English.
    pub fn is_pair_available(&self, from: &str, to: &str) -> bool {
        let pairs = self.pairs.lock().unwrap();
        if pairs.contains_key(&(from.to_string(), to.to_string())) {
            return true;
        }
        from != PIVOT_LANG
            && to != PIVOT_LANG
            && pairs.contains_key(&(from.to_string(), PIVOT_LANG.to_string()))
            && pairs.contains_key(&(PIVOT_LANG.to_string(), to.to_string()))
    }

    /// Translate using installed models. Returns `None` when no path exists
    /// or every model along the path fails.
    pub fn translate_offline(&self, text: &str, from: &str, to: &str) -> Option<(String, f32)> {
        if text.trim().is_empty() {
            return None;
        }

        let (direct, leg_in, leg_out) = {
            let pairs = self.pairs.lock().unwrap();
            (
                pairs.get(&(from.to_string(), to.to_string())).cloned(),
                pairs.get(&(from.to_string(), PIVOT_LANG.to_string())).cloned(),
                pairs.get(&(PIVOT_LANG.to_string(), to.to_string())).cloned(),
            )
        };

        if let Some(model) = direct {
            match model.translate(text) {
                Ok(translated) => return Some((translated, OFFLINE_DIRECT_CONFIDENCE)),
                Err(e) => log::warn!("offline pair {}-{} failed: {:#}", from, to, e),
            }
        }

        if from != PIVOT_LANG && to != PIVOT_LANG {
            if let (Some(first), Some(second)) = (leg_in, leg_out) {
                log::debug!("using pivot translation: {} -> en -> {}", from, to);
                let pivoted = first
                    .translate(text)
                    .and_then(|english| second.translate(&english));
                match pivoted {
                    Ok(translated) => return Some((translated, OFFLINE_PIVOT_CONFIDENCE)),
                    Err(e) => log::warn!("pivot translation {}-{} failed: {:#}", from, to, e),
                }
            }
        }

        log::warn!("no offline translation available for {} -> {}", from, to);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Uppercase;
    impl PairTranslator for Uppercase {
        fn translate(&self, text: &str) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct Tagged(&'static str);
    impl PairTranslator for Tagged {
        fn translate(&self, text: &str) -> Result<String> {
            Ok(format!("{}:{}", self.0, text))
        }
    }

    struct Failing;
    impl PairTranslator for Failing {
        fn translate(&self, _text: &str) -> Result<String> {
            anyhow::bail!("model not loaded")
        }
    }

    #[test]
    fn direct_pair_has_direct_confidence() {
        let offline = OfflineTranslator::new();
        offline.register_pair("en", "fr", Arc::new(Uppercase));
        let (text, confidence) = offline.translate_offline("hello", "en", "fr").unwrap();
        assert_eq!(text, "HELLO");
        assert!((confidence - OFFLINE_DIRECT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn pivot_path_has_discounted_confidence() {
        let offline = OfflineTranslator::new();
        offline.register_pair("de", "en", Arc::new(Tagged("de-en")));
        offline.register_pair("en", "fr", Arc::new(Tagged("en-fr")));

        let (text, confidence) = offline.translate_offline("hallo", "de", "fr").unwrap();
        assert_eq!(text, "en-fr:de-en:hallo");
        assert!((confidence - OFFLINE_PIVOT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn no_path_returns_none() {
        let offline = OfflineTranslator::new();
        assert!(offline.translate_offline("hello", "en", "fr").is_none());
    }

    #[test]
    fn failed_direct_pair_falls_back_to_pivot() {
        let offline = OfflineTranslator::new();
        offline.register_pair("de", "fr", Arc::new(Failing));
        offline.register_pair("de", "en", Arc::new(Tagged("de-en")));
        offline.register_pair("en", "fr", Arc::new(Tagged("en-fr")));

        let (_, confidence) = offline.translate_offline("hallo", "de", "fr").unwrap();
        assert!((confidence - OFFLINE_PIVOT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn availability_covers_pivot() {
        let offline = OfflineTranslator::new();
        offline.register_pair("de", "en", Arc::new(Uppercase));
        offline.register_pair("en", "fr", Arc::new(Uppercase));
        assert!(offline.is_pair_available("de", "fr"));
        assert!(offline.is_pair_available("de", "en"));
        assert!(!offline.is_pair_available("fr", "de"));
    }
}
