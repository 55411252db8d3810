//! CLI configuration: the engine config plus the `[formatter]`, `[cache]`
//! and `[conversation]` sections, resolved from `--config`,
//! `$VELOCITY_CONFIG` or the user config dir.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use velocity_core::VelocityConfig;

pub const CONFIG_ENV: &str = "VELOCITY_CONFIG";

/// Read when `[formatter] api_key` is not set
pub const GROQ_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterProvider {
    #[default]
    None,
    Ollama,
    Groq,
}

impl std::fmt::Display for FormatterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Ollama => "ollama",
            Self::Groq => "groq",
        };
        write!(f, "{}", s)
    }
}

/// Optional natural-language formatting of answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default)]
    pub provider: FormatterProvider,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_groq_model")]
    pub groq_model: String,

    /// Groq API key; never written back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3:8b".to_string()
}

fn default_groq_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            provider: FormatterProvider::default(),
            host: default_host(),
            model: default_model(),
            groq_model: default_groq_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FormatterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, else `env_key` (the `$GROQ_API_KEY` value)
    pub fn groq_key(&self, env_key: Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .or(env_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// REPL answer cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// 0 keeps entries for the whole session
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    256
}

fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// REPL conversation memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Turns consulted when resolving a follow-up
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Turns kept before the older half is dropped
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_context_window() -> usize {
    6
}

fn default_max_turns() -> usize {
    50
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            context_window: default_context_window(),
            max_turns: default_max_turns(),
        }
    }
}

/// Whole config file as the CLI sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub velocity: VelocityConfig,

    #[serde(default)]
    pub formatter: FormatterConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the first path that applies, or fall back to defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match config_path(explicit, env, dirs::config_dir()) {
            Some(path) => Self::load(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// `--config` wins, then `$VELOCITY_CONFIG`, then `<config dir>/velocity/config.toml`
/// if it exists. An explicit path is returned even when missing, so the
/// caller reports it.
pub fn config_path(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    config_dir
        .map(|dir| dir.join("velocity").join("config.toml"))
        .filter(|path| path.exists())
}
