//! Configuration loading, validation, and management for Turnpike.
//!
//! Loads configuration from `~/.turnpike/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use turnpike_core::agent::Agent;
use turnpike_core::provider::ProviderKind;

/// The root configuration structure.
///
/// Maps directly to `~/.turnpike/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when a model spec cannot be routed (overrides priority order)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Configured providers, keyed by provider id
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// The active agent
    #[serde(default)]
    pub agent: AgentConfig,

    /// Turn loop limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Response channel settings
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Model spec, e.g. "gpt-4o", "claude-sonnet-4", "ollama:llama3.1"
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Allowed tool names; "*" allows every registered tool
    #[serde(default = "default_agent_tools")]
    pub tools: Vec<String>,
}

fn default_agent_name() -> String {
    "assistant".into()
}
fn default_instructions() -> String {
    Agent::default().instructions().to_string()
}
fn default_agent_tools() -> Vec<String> {
    vec![turnpike_core::agent::ALL_TOOLS.into()]
}

impl AgentConfig {
    /// Build the immutable agent value this section describes.
    pub fn to_agent(&self) -> Agent {
        Agent::new(&self.name, &self.model, &self.instructions, self.tools.iter().cloned())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            model: String::new(),
            instructions: default_instructions(),
            tools: default_agent_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Turn budget used when a request does not set one
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Hard upper bound; larger requested budgets are clamped
    #[serde(default = "default_max_turns_ceiling")]
    pub max_turns_ceiling: u32,

    /// Maximum caller messages per request
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_max_turns() -> u32 {
    10
}
fn default_max_turns_ceiling() -> u32 {
    50
}
fn default_max_messages() -> usize {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_turns_ceiling: default_max_turns_ceiling(),
            max_messages: default_max_messages(),
        }
    }
}

impl EngineConfig {
    pub fn limits(&self) -> EngineLimits {
        EngineLimits::builder()
            .default_max_turns(self.max_turns)
            .max_turns_ceiling(self.max_turns_ceiling)
            .max_messages(self.max_messages)
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Commands the shell tool may run. Empty = deny all.
    #[serde(default = "default_shell_commands")]
    pub shell_allowed_commands: Vec<String>,

    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Directories file_read may read under. Empty = anywhere.
    #[serde(default)]
    pub file_read_roots: Vec<String>,
}

fn default_shell_commands() -> Vec<String> {
    ["ls", "cat", "head", "tail", "echo", "pwd", "date", "wc", "grep"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_shell_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_allowed_commands: default_shell_commands(),
            shell_timeout_secs: default_shell_timeout(),
            file_read_roots: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Channel that receives responses addressed to unknown channels
    #[serde(default = "default_fallback_channel")]
    pub fallback: String,
}

fn default_fallback_channel() -> String {
    "log".into()
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_channel(),
        }
    }
}

/// Fully-initialized turn loop limits handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub default_max_turns: u32,
    pub max_turns_ceiling: u32,
    pub max_messages: usize,
}

impl EngineLimits {
    pub fn builder() -> EngineLimitsBuilder {
        EngineLimitsBuilder::default()
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`EngineLimits`]; unset fields take the config defaults.
#[derive(Debug, Default)]
pub struct EngineLimitsBuilder {
    default_max_turns: Option<u32>,
    max_turns_ceiling: Option<u32>,
    max_messages: Option<usize>,
}

impl EngineLimitsBuilder {
    pub fn default_max_turns(mut self, turns: u32) -> Self {
        self.default_max_turns = Some(turns);
        self
    }

    pub fn max_turns_ceiling(mut self, turns: u32) -> Self {
        self.max_turns_ceiling = Some(turns);
        self
    }

    pub fn max_messages(mut self, count: usize) -> Self {
        self.max_messages = Some(count);
        self
    }

    pub fn build(self) -> EngineLimits {
        let max_turns_ceiling = self
            .max_turns_ceiling
            .unwrap_or_else(default_max_turns_ceiling)
            .max(1);
        EngineLimits {
            default_max_turns: self
                .default_max_turns
                .unwrap_or_else(default_max_turns)
                .clamp(1, max_turns_ceiling),
            max_turns_ceiling,
            max_messages: self.max_messages.unwrap_or_else(default_max_messages),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.turnpike/config.toml).
    ///
    /// Environment overrides:
    /// - `TURNPIKE_MODEL` replaces the agent's model spec
    /// - `TURNPIKE_PROVIDER` replaces the default provider id
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("TURNPIKE_MODEL") {
            config.agent.model = model;
        }

        if let Ok(provider) = std::env::var("TURNPIKE_PROVIDER") {
            config.default_provider = Some(provider);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".turnpike")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_turns must be at least 1".into(),
            ));
        }

        if self.engine.max_turns > self.engine.max_turns_ceiling {
            return Err(ConfigError::ValidationError(format!(
                "engine.max_turns ({}) exceeds engine.max_turns_ceiling ({})",
                self.engine.max_turns, self.engine.max_turns_ceiling
            )));
        }

        if self.engine.max_messages == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_messages must be at least 1".into(),
            ));
        }

        if let Some(id) = &self.default_provider
            && !self.providers.contains_key(id)
        {
            return Err(ConfigError::ValidationError(format!(
                "default_provider '{id}' is not listed under [providers]"
            )));
        }

        Ok(())
    }

    /// Generate a starter config TOML string.
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                kind: ProviderKind::OpenAi,
                default_model: Some(ProviderKind::OpenAi.default_model().into()),
            },
        );
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                kind: ProviderKind::Local,
                default_model: None,
            },
        );
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for turnpike_core::Error {
    fn from(e: ConfigError) -> Self {
        turnpike_core::Error::config(e.to_string())
    }
}
