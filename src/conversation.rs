//! Conversation mode: bidirectional language routing for live speech.
//!
//! When enabled, each utterance is language-detected and routed to the
//! opposite side of the configured pair. Third languages are paired against
//! recent detection history. All state is cleared on disable.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

/// Minimum detection confidence before a result is trusted
const MIN_DETECTION_CONFIDENCE: f32 = 0.8;

/// Minimum characters for reliable detection
const MIN_TEXT_LENGTH: usize = 3;

/// Detection history ring buffer capacity
const HISTORY_CAP: usize = 20;

/// How many recent detections feed routing decisions
const ROUTING_WINDOW: usize = 10;

#[derive(Clone, Debug)]
pub struct Detection {
    pub lang: String,
    pub confidence: f32,
    pub at: Instant,
}

/// Resolved routing decision for one utterance.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub source: String,
    pub target: String,
    pub confidence: f32,
}

#[derive(Clone, Debug, Default)]
pub struct ConversationStats {
    pub total_detections: usize,
    pub languages: HashMap<String, usize>,
    pub average_confidence: f32,
    pub last_detected: Option<String>,
    pub unique_languages: usize,
}

pub struct ConversationMode {
    enabled: bool,
    language_a: String,
    language_b: String,
    auto_mode: bool,
    detection_history: VecDeque<Detection>,
    detected_languages: HashSet<String>,
    last_detected: Option<String>,
}

impl Default for ConversationMode {
    fn default() -> Self {
        Self::new("en", "fr")
    }
}

impl ConversationMode {
    pub fn new(language_a: &str, language_b: &str) -> Self {
        Self {
            enabled: false,
            language_a: language_a.to_string(),
            language_b: language_b.to_string(),
            auto_mode: false,
            detection_history: VecDeque::with_capacity(HISTORY_CAP),
            detected_languages: HashSet::new(),
            last_detected: None,
        }
    }

    /// Enable with the given pair. In auto mode any newly seen language is
    /// paired against recent history instead of being forced onto A/B.
    pub fn enable(&mut self, language_a: &str, language_b: &str, auto_mode: bool) {
        self.enabled = true;
        self.language_a = language_a.to_string();
        self.language_b = language_b.to_string();
        self.auto_mode = auto_mode;
        log::info!(
            "conversation mode enabled: {} <-> {} (auto: {})",
            language_a,
            language_b,
            auto_mode
        );
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.clear_history();
        log::info!("conversation mode disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn languages(&self) -> (&str, &str) {
        (&self.language_a, &self.language_b)
    }

    pub fn update_languages(&mut self, language_a: &str, language_b: &str) {
        self.language_a = language_a.to_string();
        self.language_b = language_b.to_string();
    }

    pub fn clear_history(&mut self) {
        self.detection_history.clear();
        self.detected_languages.clear();
        self.last_detected = None;
    }

    /// Decide (source, target) for an utterance and record the detection.
    ///
    /// `source_hint` short-circuits detection when the caller already knows
    /// the language ("auto" counts as unknown).
    pub fn route(&mut self, text: &str, source_hint: Option<&str>) -> Route {
        if !self.enabled {
            return Route {
                source: source_hint.unwrap_or("auto").to_string(),
                target: self.language_b.clone(),
                confidence: 1.0,
            };
        }

        let (detected, confidence) = match source_hint.filter(|s| *s != "auto") {
            Some(hint) => (normalize_code(hint), 1.0),
            None => match detect_language(text) {
                Some((lang, conf)) if conf >= MIN_DETECTION_CONFIDENCE => (lang, conf),
                _ => {
                    // Fall back to the last known detection, or language A
                    let lang = self
                        .last_detected
                        .clone()
                        .unwrap_or_else(|| self.language_a.clone());
                    (lang, 0.5)
                }
            },
        };

        if self.detection_history.len() >= HISTORY_CAP {
            self.detection_history.pop_front();
        }
        self.detection_history.push_back(Detection {
            lang: detected.clone(),
            confidence,
            at: Instant::now(),
        });
        self.detected_languages.insert(detected.clone());
        self.last_detected = Some(detected.clone());

        let target = self.determine_target(&detected);
        log::debug!(
            "conversation routing: {} -> {} (confidence {:.2})",
            detected,
            target,
            confidence
        );

        Route {
            source: detected,
            target,
            confidence,
        }
    }

    /// False when the resolved target equals the utterance language, so the
    /// caller can skip a no-op translation without touching the engine.
    pub fn should_translate(&self, detected_lang: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let target = self.determine_target(detected_lang);
        normalize_code(detected_lang) != normalize_code(&target)
    }

    fn determine_target(&self, source_lang: &str) -> String {
        let source = normalize_code(source_lang);
        let lang_a = normalize_code(&self.language_a);
        let lang_b = normalize_code(&self.language_b);

        if source == lang_a {
            return self.language_b.clone();
        }
        if source == lang_b {
            return self.language_a.clone();
        }

        if self.auto_mode {
            // Pair a new language with the most frequent different language
            // in the recent window, defaulting to language A.
            let mut counts: Vec<(String, usize)> = Vec::new();
            for d in self.detection_history.iter().rev().take(ROUTING_WINDOW) {
                match counts.iter_mut().find(|(l, _)| *l == d.lang) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((d.lang.clone(), 1)),
                }
            }
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            for (lang, _) in counts {
                if normalize_code(&lang) != source {
                    return lang;
                }
            }
            self.language_a.clone()
        } else {
            // Unknown language in standard mode: target whichever of the
            // pair has been detected less recently (tie goes to B).
            let recent_a = self
                .detection_history
                .iter()
                .filter(|d| normalize_code(&d.lang) == lang_a)
                .count();
            let recent_b = self
                .detection_history
                .iter()
                .filter(|d| normalize_code(&d.lang) == lang_b)
                .count();
            if recent_a >= recent_b {
                self.language_b.clone()
            } else {
                self.language_a.clone()
            }
        }
    }

    /// One-line status for the UI.
    pub fn status_message(&self) -> String {
        if !self.enabled {
            return "Conversation Mode: Disabled".to_string();
        }
        let mode_type = if self.auto_mode { "Auto" } else { "Bidirectional" };
        if self.auto_mode && self.detected_languages.len() > 2 {
            let mut langs: Vec<&str> = self.detected_languages.iter().map(|s| s.as_str()).collect();
            langs.sort();
            format!("Conversation Mode (Auto): {}", langs.join(", "))
        } else {
            format!(
                "Conversation Mode ({}): {} <-> {}",
                mode_type, self.language_a, self.language_b
            )
        }
    }

    pub fn statistics(&self) -> ConversationStats {
        if self.detection_history.is_empty() {
            return ConversationStats::default();
        }
        let mut languages: HashMap<String, usize> = HashMap::new();
        let mut confidence_sum = 0.0f32;
        for d in &self.detection_history {
            *languages.entry(d.lang.clone()).or_insert(0) += 1;
            confidence_sum += d.confidence;
        }
        ConversationStats {
            total_detections: self.detection_history.len(),
            average_confidence: confidence_sum / self.detection_history.len() as f32,
            languages,
            last_detected: self.last_detected.clone(),
            unique_languages: self.detected_languages.len(),
        }
    }
}

/// Detect the language of a text with a confidence score. Returns `None`
/// for texts too short or scripts the detector cannot place.
pub fn detect_language(text: &str) -> Option<(String, f32)> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_TEXT_LENGTH {
        return None;
    }
    let info = whatlang::detect(trimmed)?;
    let code = whatlang_to_iso(info.lang());
    Some((normalize_code(&code), info.confidence() as f32))
}

/// Normalize language codes to base 2-letter ISO codes (regional variants
/// collapse to the base language).
pub fn normalize_code(code: &str) -> String {
    let lower = code.to_lowercase();
    match lower.as_str() {
        "zh-cn" | "zh-tw" => "zh".to_string(),
        "pt-br" | "pt-pt" => "pt".to_string(),
        _ => lower.chars().take(2).collect(),
    }
}

/// whatlang reports ISO 639-3; collapse to the 639-1 codes the rest of the
/// pipeline uses. Macrolanguages that 639-1 has no code for are mapped by
/// hand.
fn whatlang_to_iso(lang: whatlang::Lang) -> String {
    match lang {
        whatlang::Lang::Cmn => "zh".to_string(),
        whatlang::Lang::Vie => "vi".to_string(),
        whatlang::Lang::Kor => "ko".to_string(),
        whatlang::Lang::Jpn => "ja".to_string(),
        whatlang::Lang::Fra => "fr".to_string(),
        whatlang::Lang::Deu => "de".to_string(),
        whatlang::Lang::Spa => "es".to_string(),
        whatlang::Lang::Rus => "ru".to_string(),
        whatlang::Lang::Ita => "it".to_string(),
        whatlang::Lang::Por => "pt".to_string(),
        whatlang::Lang::Nld => "nl".to_string(),
        whatlang::Lang::Ara => "ar".to_string(),
        whatlang::Lang::Eng => "en".to_string(),
        other => isolang::Language::from_639_3(other.code())
            .and_then(|l| l.to_639_1())
            .map(|c| c.to_string())
            .unwrap_or_else(|| other.code().chars().take(2).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_mode() -> ConversationMode {
        let mut mode = ConversationMode::new("en", "fr");
        mode.enable("en", "fr", false);
        mode
    }

    #[test]
    fn routes_bidirectionally() {
        let mut mode = enabled_mode();
        let route = mode.route("hello", Some("en"));
        assert_eq!(route.source, "en");
        assert_eq!(route.target, "fr");

        let route = mode.route("bonjour", Some("fr"));
        assert_eq!(route.source, "fr");
        assert_eq!(route.target, "en");
    }

    #[test]
    fn never_routes_source_to_itself() {
        let mut mode = enabled_mode();
        for hint in ["en", "fr", "de", "ja"] {
            let route = mode.route("text", Some(hint));
            assert_ne!(normalize_code(&route.source), normalize_code(&route.target));
        }
    }

    #[test]
    fn third_language_targets_less_frequent_side() {
        let mut mode = enabled_mode();
        // English detected twice, French once
        mode.route("one", Some("en"));
        mode.route("two", Some("en"));
        mode.route("trois", Some("fr"));

        // fr has fewer recent detections, so the German utterance targets fr
        let route = mode.route("hallo welt", Some("de"));
        assert_eq!(route.target, "fr");

        // Flip the balance toward French
        let mut mode = enabled_mode();
        mode.route("un", Some("fr"));
        mode.route("deux", Some("fr"));
        mode.route("three", Some("en"));
        let route = mode.route("hallo welt", Some("de"));
        assert_eq!(route.target, "en");
    }

    #[test]
    fn third_language_with_empty_history_defaults_to_b() {
        // Initial-condition case: no detections recorded yet, tie rule applies
        let mut mode = enabled_mode();
        let route = mode.route("hallo welt", Some("de"));
        assert_eq!(route.target, "fr");
    }

    #[test]
    fn auto_mode_empty_history_defaults_to_a() {
        let mut mode = ConversationMode::new("en", "fr");
        mode.enable("en", "fr", true);
        let route = mode.route("ciao mondo", Some("it"));
        // History only holds the utterance itself, so pairing falls back to A
        assert_eq!(route.target, "en");
    }

    #[test]
    fn auto_mode_pairs_with_most_frequent_other_language() {
        let mut mode = ConversationMode::new("en", "fr");
        mode.enable("en", "fr", true);
        mode.route("guten tag", Some("de"));
        mode.route("guten morgen", Some("de"));
        mode.route("hello", Some("en"));

        let route = mode.route("ciao mondo", Some("it"));
        assert_eq!(route.target, "de");
    }

    #[test]
    fn should_translate_is_false_for_no_op_targets() {
        let mut mode = enabled_mode();
        mode.route("bonjour", Some("fr"));
        // fr routes to en and vice versa, so both directions are meaningful
        assert!(mode.should_translate("fr"));
        assert!(mode.should_translate("en"));

        // A degenerate pair routes every utterance onto itself
        let mut same = ConversationMode::new("en", "en");
        same.enable("en", "en", false);
        assert!(!same.should_translate("en"));

        // Disabled mode always translates
        mode.disable();
        assert!(mode.should_translate("fr"));
    }

    #[test]
    fn regional_variants_collapse() {
        assert_eq!(normalize_code("zh-CN"), "zh");
        assert_eq!(normalize_code("pt-BR"), "pt");
        assert_eq!(normalize_code("EN"), "en");
        assert_eq!(normalize_code("fra"), "fr");
    }

    #[test]
    fn detection_requires_minimum_length() {
        assert!(detect_language("hi").is_none());
        assert!(detect_language("  a ").is_none());
    }

    #[test]
    fn low_confidence_falls_back_to_last_detected() {
        let mut mode = enabled_mode();
        mode.route("this is clearly an english sentence", Some("en"));
        // Ambiguous two-character text cannot be detected; falls back
        let route = mode.route("ok", None);
        assert_eq!(route.source, "en");
        assert!((route.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn history_is_bounded() {
        let mut mode = enabled_mode();
        for i in 0..50 {
            let hint = if i % 2 == 0 { "en" } else { "fr" };
            mode.route("text", Some(hint));
        }
        assert_eq!(mode.statistics().total_detections, HISTORY_CAP);
    }

    #[test]
    fn disable_clears_state() {
        let mut mode = enabled_mode();
        mode.route("hello there", Some("en"));
        mode.disable();
        assert_eq!(mode.statistics().total_detections, 0);
        assert!(mode.statistics().last_detected.is_none());
    }

    #[test]
    fn status_message_reflects_mode() {
        let mut mode = ConversationMode::new("en", "fr");
        assert!(mode.status_message().contains("Disabled"));
        mode.enable("en", "fr", false);
        assert!(mode.status_message().contains("Bidirectional"));
    }
}
