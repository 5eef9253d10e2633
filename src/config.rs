//! Configuration for relaycon.
//!
//! Loaded from `~/.relaycon/config.toml`; every field falls back to its
//! default when the file or the field is missing.
//!
//! ```toml
//! # Prompt shown at the start of each input line
//! prompt = "> "
//!
//! # Maximum number of characters on an input line
//! line_limit = 80
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default console prompt.
pub const DEFAULT_PROMPT: &str = "> ";
/// Default maximum input line length.
pub const DEFAULT_LINE_LIMIT: usize = 80;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Console prompt, re-emitted after every submitted line.
    pub prompt: String,
    /// Maximum number of characters on an input line.
    pub line_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            line_limit: DEFAULT_LINE_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".relaycon").join("config.toml"))
    }
}

/// Get home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.line_limit, 80);
    }

    #[test]
    fn test_parse_full() {
        let config: Config = toml::from_str("prompt = \"ec> \"\nline_limit = 120\n").unwrap();
        assert_eq!(config.prompt, "ec> ");
        assert_eq!(config.line_limit, 120);
    }

    #[test]
    fn test_parse_partial_falls_back() {
        let config: Config = toml::from_str("prompt = \"$ \"\n").unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.line_limit, DEFAULT_LINE_LIMIT);
    }
}
