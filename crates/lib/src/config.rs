//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.rosgpt/config.json`) and environment.
//! The OpenAI credential is never read from the file; see [`resolve_api_key`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the OpenAI API key. Required to run the node.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Message bus (rosbridge) connection and topic settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Completion service settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// rosbridge endpoint, node name, and topic wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    /// rosbridge WebSocket URL (default "ws://127.0.0.1:9090"). Overridden by ROSBRIDGE_URL env.
    #[serde(default = "default_bus_url")]
    pub url: String,

    /// Node name, used as the rosbridge operation id prefix.
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Topic carrying prompts (std_msgs/String).
    #[serde(default = "default_input_topic")]
    pub input_topic: String,

    /// Topic receiving replies (std_msgs/String).
    #[serde(default = "default_output_topic")]
    pub output_topic: String,

    /// Pending message buffer for both topics (default 10).
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

/// Chat completion request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API base URL including the version segment (default "https://api.openai.com/v1"). Overridden by OPENAI_BASE_URL env.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds. Unset means the HTTP client default (no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_bus_url() -> String {
    "ws://127.0.0.1:9090".to_string()
}

fn default_node_name() -> String {
    "rosgpt_node".to_string()
}

fn default_input_topic() -> String {
    "/gpt_input".to_string()
}

fn default_output_topic() -> String {
    "/gpt_output".to_string()
}

fn default_queue_size() -> usize {
    10
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            node_name: default_node_name(),
            input_topic: default_input_topic(),
            output_topic: default_output_topic(),
            queue_size: default_queue_size(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

/// Read a non-empty, trimmed environment variable.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the OpenAI API key from OPENAI_API_KEY. Unset or blank => None.
pub fn resolve_api_key() -> Option<String> {
    env_non_empty(API_KEY_ENV)
}

/// Resolve the rosbridge URL: env ROSBRIDGE_URL overrides config.
pub fn resolve_bus_url(config: &Config) -> String {
    env_non_empty("ROSBRIDGE_URL").unwrap_or_else(|| config.bus.url.trim().to_string())
}

/// Resolve the completion API base URL: env OPENAI_BASE_URL overrides config.
pub fn resolve_openai_base_url(config: &Config) -> String {
    env_non_empty("OPENAI_BASE_URL").unwrap_or_else(|| config.openai.base_url.trim().to_string())
}

/// Apply ROSBRIDGE_URL and OPENAI_BASE_URL to a loaded config.
pub fn apply_env_overrides(config: &mut Config) {
    config.bus.url = resolve_bus_url(config);
    config.openai.base_url = resolve_openai_base_url(config);
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ROSGPT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".rosgpt").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
