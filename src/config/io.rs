//! Config I/O operations: load, save, and language utilities.

use std::path::PathBuf;

use super::config_struct::Config;

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("live-translator");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join("config.json")
}

/// Path for a data file (database etc.) next to the config
pub fn data_file_path(name: &str) -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("live-translator");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join(name)
}

/// Load config from disk, merging with defaults as needed
pub fn load_config() -> Config {
    let path = get_config_path();

    if !path.exists() {
        return Config::default();
    }

    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("failed to read config: {}", e);
            return Config::default();
        }
    };

    match serde_json::from_str(&data) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("failed to parse config, using defaults: {}", e);
            Config::default()
        }
    }
}

/// Save config to disk
pub fn save_config(config: &Config) {
    let path = get_config_path();
    if let Ok(data) = serde_json::to_string_pretty(config) {
        if let Err(e) = std::fs::write(path, data) {
            log::error!("save config failed: {}", e);
        }
    }
}

lazy_static::lazy_static! {
    /// All available language names (sorted, deduplicated)
    static ref ALL_LANGUAGES: Vec<String> = {
        let mut languages = Vec::new();
        for i in 0..10000 {
            if let Some(lang) = isolang::Language::from_usize(i) {
                // Only include languages with ISO 639-1 codes (major languages)
                if lang.to_639_1().is_some() {
                    languages.push(lang.to_name().to_string());
                }
            }
        }
        languages.sort();
        languages.dedup();
        languages
    };
}

/// Get all available language names
pub fn get_all_languages() -> &'static Vec<String> {
    &ALL_LANGUAGES
}
