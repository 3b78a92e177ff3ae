//! Configuration loading, validation, and management for Codewright.
//!
//! Loads configuration from `~/.codewright/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The `[[tools]]` list (or a standalone `tools.toml` holding the same list)
//! is the tool configuration artifact: it decides which built-in tools are
//! registered and may override the routing description the model sees.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Providers that never need an API key.
const LOCAL_PROVIDERS: &[&str] = &["ollama", "vllm", "custom"];

/// Tokens of replayed conversation sent with each decision.
pub const DEFAULT_HISTORY_TOKEN_BUDGET: usize = 24_000;

/// The root configuration structure.
///
/// Maps directly to `~/.codewright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider: "openai", "openrouter", "ollama", or "custom"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL override (required for "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Chat model
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model used by the retrieval index
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Retrieval index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// External linter used by the `run_linter` tool
    #[serde(default)]
    pub linter: LinterConfig,

    /// Tool configuration artifact. Empty = every built-in tool enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("index", &self.index)
            .field("linter", &self.linter)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool calls allowed per user question before a forced answer
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,

    /// Upper bound on one selection-policy model call
    #[serde(default = "default_decision_timeout_secs")]
    pub decision_timeout_secs: u64,

    /// Upper bound on one tool execution
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Approximate tokens of earlier conversation replayed per decision;
    /// the oldest questions are dropped first
    #[serde(default = "default_history_token_budget")]
    pub history_token_budget: usize,

    /// Replace the built-in agent preamble
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_tool_calls() -> usize {
    5
}
fn default_decision_timeout_secs() -> u64 {
    60
}
fn default_tool_timeout_secs() -> u64 {
    120
}
fn default_history_token_budget() -> usize {
    DEFAULT_HISTORY_TOKEN_BUDGET
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            decision_timeout_secs: default_decision_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            history_token_budget: default_history_token_budget(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Where description caches live. Defaults to `~/.codewright/cache`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// File extensions to index (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped anywhere in the tree
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Files larger than this are skipped
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// File content sent to the describer is truncated to this many chars
    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,
}

fn default_extensions() -> Vec<String> {
    [
        "py", "rs", "go", "js", "ts", "java", "c", "h", "cpp", "hpp", "rb", "sh", "md", "txt",
        "toml", "yaml", "yml", "json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_exclude_dirs() -> Vec<String> {
    [
        ".git", "target", "node_modules", "vendor", ".venv", "venv", "__pycache__", "dist",
        "build",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_file_bytes() -> u64 {
    256 * 1024
}
fn default_description_max_chars() -> usize {
    12_000
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            max_file_bytes: default_max_file_bytes(),
            description_max_chars: default_description_max_chars(),
        }
    }
}

impl IndexConfig {
    /// The configured cache directory, or the default under the config dir.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("cache"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinterConfig {
    #[serde(default = "default_linter_command")]
    pub command: String,

    /// Arguments placed before the target path
    #[serde(default = "default_linter_args")]
    pub args: Vec<String>,
}

fn default_linter_command() -> String {
    "ruff".into()
}
fn default_linter_args() -> Vec<String> {
    vec!["check".into()]
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            command: default_linter_command(),
            args: default_linter_args(),
        }
    }
}

/// One entry of the tool configuration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Built-in tool name
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replaces the tool's routing description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolManifestFile {
    #[serde(default)]
    tools: Vec<ToolConfig>,
}

/// Load a standalone `tools.toml` holding a `[[tools]]` list.
pub fn load_tool_manifest(path: &Path) -> Result<Vec<ToolConfig>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let manifest: ToolManifestFile = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_tools(&manifest.tools)?;
    Ok(manifest.tools)
}

fn validate_tools(tools: &[ToolConfig]) -> Result<(), ConfigError> {
    for (i, tool) in tools.iter().enumerate() {
        if tool.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "tools[{i}] has an empty name"
            )));
        }
        if tools[..i].iter().any(|t| t.name == tool.name) {
            return Err(ConfigError::ValidationError(format!(
                "tool '{}' is listed more than once",
                tool.name
            )));
        }
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from the default path (~/.codewright/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CODEWRIGHT_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    ///
    /// A `tools.toml` next to `config.toml` replaces the inline `[[tools]]` list.
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        let mut config = Self::load_from(&config_dir.join("config.toml"))?;

        let manifest_path = config_dir.join("tools.toml");
        if manifest_path.exists() {
            config.tools = load_tool_manifest(&manifest_path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `CODEWRIGHT_*` and provider key environment variables.
    pub fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("CODEWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CODEWRIGHT_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("CODEWRIGHT_MODEL") {
            self.model = model;
        }
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

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codewright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be at least 1".into(),
            ));
        }

        if self.agent.decision_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be greater than zero".into(),
            ));
        }

        if self.agent.history_token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "agent.history_token_budget must be greater than zero".into(),
            ));
        }

        if self.index.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "index.extensions must list at least one extension".into(),
            ));
        }

        if self.provider == "custom" && self.api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "provider \"custom\" requires api_url".into(),
            ));
        }

        validate_tools(&self.tools)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The API key, or an error if the configured provider is remote and has none.
    pub fn require_api_key(&self) -> Result<Option<&str>, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) => Ok(Some(key)),
            None if LOCAL_PROVIDERS.contains(&self.provider.as_str()) => Ok(None),
            None => Err(ConfigError::MissingCredentials {
                provider: self.provider.clone(),
            }),
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            index: IndexConfig::default(),
            linter: LinterConfig::default(),
            tools: vec![],
        }
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

    #[error("No API key configured for provider '{provider}' (set CODEWRIGHT_API_KEY)")]
    MissingCredentials { provider: String },
}

impl From<ConfigError> for codewright_core::Error {
    fn from(err: ConfigError) -> Self {
        codewright_core::Error::Config {
            message: err.to_string(),
        }
    }
}
