//! Contextual text processing around the raw translation call.
//!
//! Preprocessing rewrites informal spellings and expands slang so the
//! engine translates (and caches) clean text. Postprocessing nudges the
//! translated text toward the register and emphasis of the original. The
//! postprocessing side is cosmetic by design and never required for
//! correctness.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextKind {
    Greeting,
    Farewell,
    Question,
    EmotionPositive,
    EmotionNegative,
    Formal,
    Informal,
}

lazy_static! {
    /// Slang and abbreviation expansions per source language.
    static ref SLANG_DB: HashMap<&'static str, HashMap<&'static str, &'static str>> = {
        let mut db = HashMap::new();

        let mut en = HashMap::new();
        en.insert("lol", "laughing out loud");
        en.insert("lmao", "laughing my ass off");
        en.insert("rofl", "rolling on floor laughing");
        en.insert("brb", "be right back");
        en.insert("btw", "by the way");
        en.insert("tbh", "to be honest");
        en.insert("imo", "in my opinion");
        en.insert("imho", "in my humble opinion");
        en.insert("fyi", "for your information");
        en.insert("omg", "oh my god");
        en.insert("idk", "I don't know");
        en.insert("afaik", "as far as I know");
        en.insert("asap", "as soon as possible");
        en.insert("dm", "direct message");
        en.insert("irl", "in real life");
        en.insert("ftw", "for the win");
        en.insert("rn", "right now");
        en.insert("nvm", "never mind");
        en.insert("smh", "shaking my head");
        en.insert("fomo", "fear of missing out");
        en.insert("yolo", "you only live once");
        en.insert("sus", "suspicious");
        en.insert("deadass", "seriously");
        en.insert("lowkey", "slightly or secretly");
        en.insert("highkey", "very or extremely");
        en.insert("goat", "greatest of all time");
        en.insert("salty", "upset or bitter");
        en.insert("lit", "exciting or excellent");
        en.insert("flex", "show off");
        en.insert("shook", "shocked or surprised");
        en.insert("tea", "gossip");
        en.insert("no cap", "no lie");
        en.insert("rent free", "constantly thinking about");
        en.insert("hits different", "uniquely good");
        db.insert("en", en);

        let mut fr = HashMap::new();
        fr.insert("mdr", "mort de rire");
        fr.insert("ptdr", "pété de rire");
        fr.insert("stp", "s'il te plaît");
        fr.insert("svp", "s'il vous plaît");
        fr.insert("tlm", "tout le monde");
        fr.insert("bcp", "beaucoup");
        fr.insert("pk", "pourquoi");
        fr.insert("pcq", "parce que");
        fr.insert("dsl", "désolé");
        fr.insert("jsp", "je sais pas");
        fr.insert("jpp", "j'en peux plus");
        fr.insert("meuf", "femme");
        fr.insert("relou", "lourd");
        fr.insert("kiffer", "aimer");
        fr.insert("thune", "argent");
        fr.insert("bouffer", "manger");
        db.insert("fr", fr);

        let mut es = HashMap::new();
        es.insert("tq", "te quiero");
        es.insert("xq", "porque");
        es.insert("tb", "también");
        es.insert("tmb", "también");
        es.insert("bn", "bien");
        es.insert("msj", "mensaje");
        es.insert("guay", "genial");
        es.insert("chulo", "bonito");
        es.insert("currar", "trabajar");
        es.insert("curro", "trabajo");
        es.insert("pasta", "dinero");
        es.insert("mogollón", "mucho");
        db.insert("es", es);

        let mut de = HashMap::new();
        de.insert("geil", "großartig");
        de.insert("krass", "extrem");
        de.insert("digger", "Kumpel");
        de.insert("alter", "Mann");
        de.insert("chillen", "entspannen");
        de.insert("checken", "verstehen");
        de.insert("pennen", "schlafen");
        de.insert("labern", "Unsinn reden");
        de.insert("schnallen", "verstehen");
        de.insert("kumpel", "Freund");
        db.insert("de", de);

        db
    };

    /// Word-boundary autocorrect patterns per language.
    static ref CORRECTIONS: HashMap<&'static str, Vec<(Regex, &'static str)>> = {
        let mut map = HashMap::new();

        let en: Vec<(Regex, &'static str)> = [
            (r"(?i)\bim\b", "I'm"),
            (r"(?i)\bill\b", "I'll"),
            (r"(?i)\bu\b", "you"),
            (r"(?i)\bur\b", "your"),
            (r"(?i)\btho\b", "though"),
            (r"(?i)\bcuz\b", "because"),
            (r"(?i)\bcoz\b", "because"),
            (r"(?i)\bgonna\b", "going to"),
            (r"(?i)\bwanna\b", "want to"),
            (r"(?i)\bgotta\b", "got to"),
            (r"(?i)\bkinda\b", "kind of"),
            (r"(?i)\bsorta\b", "sort of"),
            (r"(?i)\byeah\b", "yes"),
            (r"(?i)\bnah\b", "no"),
            (r"(?i)\byep\b", "yes"),
            (r"(?i)\bnope\b", "no"),
        ]
        .into_iter()
        .map(|(p, r)| (Regex::new(p).unwrap(), r))
        .collect();
        map.insert("en", en);

        let fr: Vec<(Regex, &'static str)> = [
            (r"(?i)\bké\b", "que"),
            (r"(?i)\bki\b", "qui"),
            (r"(?i)\bkom\b", "comme"),
            (r"(?i)\bcé\b", "c'est"),
            (r"(?i)\bté\b", "t'es"),
        ]
        .into_iter()
        .map(|(p, r)| (Regex::new(p).unwrap(), r))
        .collect();
        map.insert("fr", fr);

        map
    };

    static ref FORMAL_FR: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\btu\b").unwrap(), "vous"),
        (Regex::new(r"(?i)\bton\b").unwrap(), "votre"),
        (Regex::new(r"(?i)\bta\b").unwrap(), "votre"),
    ];

    static ref FORMAL_ES: Vec<(Regex, &'static str)> =
        vec![(Regex::new(r"(?i)\btú\b").unwrap(), "usted")];

    static ref INFORMAL_FR: Vec<(Regex, &'static str)> =
        vec![(Regex::new(r"(?i)\bvous\b").unwrap(), "tu")];
}

/// Substring cues used to classify the register of an utterance.
const GREETING: [&str; 7] = ["hello", "hi ", "hey", "bonjour", "hola", "salut", "buenos días"];
const FAREWELL: [&str; 6] = ["bye", "goodbye", "see you", "au revoir", "adiós", "hasta luego"];
const QUESTION: [&str; 9] = ["?", "how", "what", "when", "where", "why", "who", "comment", "pourquoi"];
const EMOTION_POSITIVE: [&str; 9] = [
    "happy", "great", "awesome", "excellent", "wonderful", "fantastic", "heureux", "génial",
    "feliz",
];
const EMOTION_NEGATIVE: [&str; 7] =
    ["sad", "bad", "terrible", "awful", "horrible", "triste", "mal"];
const FORMAL: [&str; 8] = [
    "sir", "madam", "monsieur", "madame", "señor", "señora", "please", "s'il vous plaît",
];
const INFORMAL: [&str; 7] = ["dude", "bro", "mate", "buddy", "mec", "tío", "colega"];

/// Maximum exclamation marks restored when preserving emphasis
const MAX_EXCLAMATIONS: usize = 3;

#[derive(Default)]
pub struct ContextualProcessor;

impl ContextualProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Expand slang and abbreviations to full form for better translation.
    /// Capitalization style and trailing punctuation of each token survive
    /// the rewrite. Returns the expanded text and whether anything changed.
    pub fn expand_slang(&self, text: &str, lang: &str) -> (String, bool) {
        let dict = match SLANG_DB.get(lang) {
            Some(d) => d,
            None => return (text.to_string(), false),
        };

        let mut modified = false;
        let mut new_words: Vec<String> = Vec::new();

        for word in text.split_whitespace() {
            let clean: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();

            match dict.get(clean.as_str()) {
                Some(expansion) => {
                    let replacement = if is_all_caps(word) {
                        expansion.to_uppercase()
                    } else if word.chars().next().map_or(false, |c| c.is_uppercase()) {
                        capitalize(expansion)
                    } else {
                        expansion.to_string()
                    };
                    let punctuation: String =
                        word.chars().filter(|c| !c.is_alphanumeric()).collect();
                    new_words.push(format!("{}{}", replacement, punctuation));
                    modified = true;
                }
                None => new_words.push(word.to_string()),
            }
        }

        let mut expanded = new_words.join(" ");

        // Multi-word slang expressions
        let lowered = expanded.to_lowercase();
        for (slang, expansion) in dict.iter() {
            if slang.contains(' ') && lowered.contains(slang) {
                let pattern = Regex::new(&format!("(?i){}", regex::escape(slang))).unwrap();
                expanded = pattern.replace_all(&expanded, *expansion).into_owned();
                modified = true;
            }
        }

        (expanded, modified)
    }

    /// Rewrite common informal spellings ("u" -> "you", "gonna" -> "going to").
    pub fn autocorrect(&self, text: &str, lang: &str) -> String {
        let mut corrected = text.to_string();
        if let Some(rules) = CORRECTIONS.get(lang) {
            for (pattern, replacement) in rules {
                corrected = pattern.replace_all(&corrected, *replacement).into_owned();
            }
        }
        corrected
    }

    pub fn detect_context(&self, text: &str) -> Vec<ContextKind> {
        let lower = text.to_lowercase();
        let mut kinds = Vec::new();
        let mut check = |patterns: &[&str], kind: ContextKind| {
            if patterns.iter().any(|p| lower.contains(p)) {
                kinds.push(kind);
            }
        };
        check(&GREETING, ContextKind::Greeting);
        check(&FAREWELL, ContextKind::Farewell);
        check(&QUESTION, ContextKind::Question);
        check(&EMOTION_POSITIVE, ContextKind::EmotionPositive);
        check(&EMOTION_NEGATIVE, ContextKind::EmotionNegative);
        check(&FORMAL, ContextKind::Formal);
        check(&INFORMAL, ContextKind::Informal);
        kinds
    }

    /// Adjust the translated text toward the original's register and
    /// emphasis. Purely cosmetic.
    pub fn enhance(&self, original: &str, translated: &str, target_lang: &str) -> String {
        let kinds = self.detect_context(original);
        let mut enhanced = translated.to_string();

        if kinds.contains(&ContextKind::Formal) {
            enhanced = apply_formal_tone(&enhanced, target_lang);
        } else if kinds.contains(&ContextKind::Informal) {
            enhanced = apply_informal_tone(&enhanced, target_lang);
        }

        if kinds.contains(&ContextKind::EmotionPositive)
            || kinds.contains(&ContextKind::EmotionNegative)
        {
            enhanced = preserve_emotion(original, &enhanced);
        }

        enhanced
    }
}

fn apply_formal_tone(text: &str, lang: &str) -> String {
    let rules: &[(Regex, &str)] = match lang {
        "fr" => &FORMAL_FR,
        "es" => &FORMAL_ES,
        _ => return text.to_string(),
    };
    let mut out = text.to_string();
    for (pattern, replacement) in rules {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

fn apply_informal_tone(text: &str, lang: &str) -> String {
    if lang != "fr" {
        return text.to_string();
    }
    let mut out = text.to_string();
    for (pattern, replacement) in INFORMAL_FR.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

/// Pad trailing exclamation marks when the translation under-represents the
/// original's emphasis.
fn preserve_emotion(original: &str, translated: &str) -> String {
    let exclamations = original.matches('!').count();
    if exclamations > 0 && translated.matches('!').count() < exclamations {
        let base = translated.trim_end_matches('.');
        format!("{}{}", base, "!".repeat(exclamations.min(MAX_EXCLAMATIONS)))
    } else {
        translated.to_string()
    }
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase()) && !word.chars().any(|c| c.is_lowercase())
}

/// Python-style capitalize: first character upper, the rest lower.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
