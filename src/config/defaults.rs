//! Default values for config fields.

use super::config_struct::Config;

pub fn default_true() -> bool {
    true
}

pub fn default_source_language() -> String {
    "auto".to_string()
}

pub fn default_target_language() -> String {
    "fr".to_string()
}

pub fn default_language_a() -> String {
    "en".to_string()
}

pub fn default_language_b() -> String {
    "fr".to_string()
}

pub fn default_cloud_stt_url() -> String {
    // Local speech-to-text service endpoint
    "http://127.0.0.1:6006".to_string()
}

pub fn default_volume() -> f32 {
    0.75
}

pub fn default_history_limit() -> usize {
    500
}

impl Default for Config {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty config must deserialize via defaults")
    }
}
