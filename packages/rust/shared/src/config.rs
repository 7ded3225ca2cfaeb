//! Application configuration for scriptcrew.
//!
//! User config lives at `~/.scriptcrew/scriptcrew.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptCrewError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "scriptcrew.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".scriptcrew";

/// Environment variable overriding the model identifier.
pub const ENV_MODEL: &str = "LLM_MODEL";
/// Environment variable overriding the chat-completion base URL.
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
/// Environment variable overriding the sampling temperature.
pub const ENV_TEMPERATURE: &str = "LLM_TEMPERATURE";

/// Placeholder key sent when no API key is configured (local Ollama ignores it).
pub const DEFAULT_API_KEY: &str = "ollama";

// ---------------------------------------------------------------------------
// Config structs (matching scriptcrew.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model endpoint settings.
    #[serde(default)]
    pub llm: LlmSection,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search tool settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Scrape tool settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    /// Model identifier sent with every chat-completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible base URL (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout for model calls.
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3:8b".into()
}
fn default_base_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_timeout() -> u64 {
    300
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Crew definition (agents + tasks) YAML file.
    #[serde(default = "default_crew_config")]
    pub crew_config: String,

    /// Directory where generated scripts are saved.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// How many trailing fragments feed the next topic's draft.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Tool-call rounds an agent may make before it must answer.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            crew_config: default_crew_config(),
            output_dir: default_output_dir(),
            context_window: default_context_window(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_crew_config() -> String {
    "config/crew.yaml".into()
}
fn default_output_dir() -> String {
    ".".into()
}
fn default_context_window() -> usize {
    2
}
fn default_max_tool_iterations() -> usize {
    5
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the DuckDuckGo HTML frontend.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Number of results returned to the agent.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Request timeout.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
            timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com".into()
}
fn default_max_results() -> usize {
    5
}
fn default_tool_timeout() -> u64 {
    20
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Request timeout.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Maximum characters of page text handed back to the agent.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    12_000
}

// ---------------------------------------------------------------------------
// LLM config (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime language-model configuration, read once at initialization and
/// passed explicitly to the client constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Model identifier.
    pub model: String,
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Bearer token (placeholder for local endpoints).
    pub api_key: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for LlmConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            base_url: config.llm.base_url.clone(),
            temperature: config.llm.temperature,
            api_key: DEFAULT_API_KEY.into(),
            request_timeout_secs: config.llm.request_timeout_secs,
        }
    }
}

impl LlmConfig {
    /// Resolve from the config file with process environment overrides.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::from_lookup(config, |key| std::env::var(key).ok())
    }

    /// Resolve from the config file with overrides from an arbitrary lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(config: &AppConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut resolved = Self::from(config);

        if let Some(model) = get(ENV_MODEL) {
            resolved.model = model;
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            resolved.base_url = base_url;
        }
        if let Some(raw) = get(ENV_TEMPERATURE) {
            resolved.temperature = raw.trim().parse().map_err(|e| {
                ScriptCrewError::config(format!("{ENV_TEMPERATURE}={raw:?} is not a number: {e}"))
            })?;
        }
        if let Some(key) = get(&config.llm.api_key_env) {
            resolved.api_key = key;
        }

        Ok(resolved)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.scriptcrew/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScriptCrewError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.scriptcrew/scriptcrew.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScriptCrewError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ScriptCrewError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScriptCrewError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScriptCrewError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScriptCrewError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
