//! Configuration module for live-translator.
//!
//! Split into sub-modules:
//! - `config_struct`: Config struct and enums
//! - `defaults`: default value functions and the Default impl
//! - `io`: loading, saving, and language utilities

mod config_struct;
mod defaults;
mod io;

pub use config_struct::{AudioSourceKind, Config, SharedConfig};
pub use io::{data_file_path, get_all_languages, get_config_path, load_config, save_config};
