//! Settings taken from the environment
//!
//! `CELLSH_PROMPT` sets the interactive prompt. `CELLSH_HISTORY` names the
//! history file; without it history lives in `~/.cellsh_history`.

use std::env;
use std::path::PathBuf;

const DEFAULT_PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".cellsh_history";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub history: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: DEFAULT_PROMPT.to_string(),
            history: None,
        }
    }
}

/// Get home directory
pub(crate) fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prompt = lookup("CELLSH_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string());
        let history = match lookup("CELLSH_HISTORY") {
            Some(path) if path.is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => dirs_home().map(|h| h.join(HISTORY_FILE)),
        };
        Config { prompt, history }
    }
}
