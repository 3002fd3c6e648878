//! Process-wide settings, read once from the environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::errors::ProviderError;
use crate::providers::anthropic::{ANTHROPIC_HOST, ANTHROPIC_MODEL};
use crate::providers::configs::{
    AnthropicProviderConfig, GeminiProviderConfig, OpenAiProviderConfig, ProviderConfig,
};
use crate::providers::factory::ProviderType;
use crate::providers::gemini::{GEMINI_HOST, GEMINI_MODEL};
use crate::providers::openai::{OPENAI_HOST, OPENAI_MODEL};
use crate::tools::exa::EXA_HOST;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key for {provider}; set {env_var}")]
    MissingApiKey {
        provider: ProviderType,
        env_var: &'static str,
    },

    #[error("Unsupported model provider: {0}")]
    UnknownProvider(String),

    #[error("No valid API keys found for any provider")]
    NoProviders,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub anthropic_api_key: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub exa_api_key: String,

    #[serde(default = "default_anthropic_host")]
    pub anthropic_host: String,
    #[serde(default = "default_openai_host")]
    pub openai_host: String,
    #[serde(default = "default_gemini_host")]
    pub gemini_host: String,
    #[serde(default = "default_exa_host")]
    pub exa_host: String,

    #[serde(default = "default_model_provider")]
    pub default_model_provider: String,
    /// Applies to `default_model_provider` only
    #[serde(default)]
    pub default_model_name: Option<String>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default)]
    pub default_max_tokens: Option<i32>,
    /// Seconds
    #[serde(default = "default_timeout")]
    pub default_timeout: u64,

    #[serde(default = "default_session_log_dir")]
    pub session_log_dir: String,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub enable_code_execution: bool,
    #[serde(default = "default_allowed_code_types")]
    pub allowed_code_types: Vec<String>,
    /// Seconds
    #[serde(default = "default_timeout", rename = "code_execution_timeout")]
    pub code_execution_timeout_secs: u64,

    #[serde(default = "default_terminal_shell")]
    pub terminal_shell: String,
    /// Milliseconds
    #[serde(default = "default_terminal_timeout", rename = "terminal_timeout")]
    pub terminal_timeout_ms: u64,
    #[serde(default = "default_terminal_working_dir", rename = "terminal_working_dir")]
    pub terminal_working_dir_raw: String,

    #[serde(default)]
    pub enable_mcp: bool,
    #[serde(default = "default_mcp_browser_server")]
    pub mcp_browser_server: String,
    #[serde(default = "default_mcp_browser_command")]
    pub mcp_browser_command: String,
    #[serde(default = "default_mcp_browser_args")]
    pub mcp_browser_args: String,
    /// Seconds
    #[serde(default = "default_mcp_request_timeout", rename = "mcp_request_timeout")]
    pub mcp_request_timeout_secs: u64,
}

impl Settings {
    /// Load from the process environment
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    /// Load from an explicit set of `NAME=value` pairs. Empty values count as unset.
    pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();

        let config = Config::builder()
            .add_source(
                Environment::default()
                    .source(Some(vars))
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_code_types"),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.allowed_code_types = settings
            .allowed_code_types
            .iter()
            .map(|kind| kind.trim().to_lowercase())
            .filter(|kind| !kind.is_empty())
            .collect();
        tracing::debug!(
            provider = %settings.default_model_provider,
            mcp = settings.enable_mcp,
            "loaded settings"
        );
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout)
    }

    pub fn code_execution_timeout(&self) -> Duration {
        Duration::from_secs(self.code_execution_timeout_secs)
    }

    pub fn terminal_timeout(&self) -> Duration {
        Duration::from_millis(self.terminal_timeout_ms)
    }

    pub fn terminal_working_dir(&self) -> PathBuf {
        expand_path(&self.terminal_working_dir_raw)
    }

    pub fn session_log_dir(&self) -> PathBuf {
        expand_path(&self.session_log_dir)
    }

    pub fn mcp_request_timeout(&self) -> Duration {
        Duration::from_secs(self.mcp_request_timeout_secs)
    }

    pub fn api_key(&self, provider: ProviderType) -> &str {
        match provider {
            ProviderType::Anthropic => &self.anthropic_api_key,
            ProviderType::OpenAi => &self.openai_api_key,
            ProviderType::Gemini => &self.gemini_api_key,
        }
    }

    pub fn host(&self, provider: ProviderType) -> &str {
        match provider {
            ProviderType::Anthropic => &self.anthropic_host,
            ProviderType::OpenAi => &self.openai_host,
            ProviderType::Gemini => &self.gemini_host,
        }
    }

    pub fn api_key_var(provider: ProviderType) -> &'static str {
        match provider {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAi => "OPENAI_API_KEY",
            ProviderType::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(provider: ProviderType) -> &'static str {
        match provider {
            ProviderType::Anthropic => ANTHROPIC_MODEL,
            ProviderType::OpenAi => OPENAI_MODEL,
            ProviderType::Gemini => GEMINI_MODEL,
        }
    }

    pub fn default_provider(&self) -> Result<ProviderType, ConfigError> {
        ProviderType::from_str(self.default_model_provider.trim())
            .map_err(|_| ConfigError::UnknownProvider(self.default_model_provider.clone()))
    }

    /// Model used for `provider` when the caller names none
    pub fn model_for(&self, provider: ProviderType) -> String {
        match (&self.default_model_name, self.default_provider()) {
            (Some(name), Ok(default)) if default == provider => name.clone(),
            _ => Self::default_model(provider).to_string(),
        }
    }

    /// Everything needed to construct the adapter for `provider`
    pub fn provider_config(
        &self,
        provider: ProviderType,
        model: Option<&str>,
    ) -> Result<ProviderConfig, ConfigError> {
        let api_key = self.api_key(provider);
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey {
                provider,
                env_var: Self::api_key_var(provider),
            });
        }

        let host = self.host(provider).to_string();
        let api_key = api_key.to_string();
        let model = model
            .map(str::to_string)
            .unwrap_or_else(|| self.model_for(provider));
        let temperature = Some(self.default_temperature);
        let max_tokens = self.default_max_tokens;
        let timeout = self.timeout();

        Ok(match provider {
            ProviderType::OpenAi => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout,
            }),
            ProviderType::Anthropic => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout,
            }),
            ProviderType::Gemini => ProviderConfig::Gemini(GeminiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout,
            }),
        })
    }

    /// Providers with a configured API key, in declaration order
    pub fn available_providers(&self) -> Vec<ProviderType> {
        ProviderType::iter()
            .filter(|provider| !self.api_key(*provider).is_empty())
            .collect()
    }

    /// The default provider when its key is set, else the first available one
    pub fn preferred_provider(&self) -> Result<ProviderType, ConfigError> {
        let available = self.available_providers();
        if let Ok(default) = self.default_provider() {
            if available.contains(&default) {
                return Ok(default);
            }
        }
        available.first().copied().ok_or(ConfigError::NoProviders)
    }

    /// Services without credentials
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing: Vec<&'static str> = ProviderType::iter()
            .filter(|provider| self.api_key(*provider).is_empty())
            .map(|provider| match provider {
                ProviderType::Anthropic => "anthropic",
                ProviderType::OpenAi => "openai",
                ProviderType::Gemini => "gemini",
            })
            .collect();
        if self.exa_api_key.is_empty() {
            missing.push("exa");
        }
        missing
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            exa_api_key: String::new(),
            anthropic_host: default_anthropic_host(),
            openai_host: default_openai_host(),
            gemini_host: default_gemini_host(),
            exa_host: default_exa_host(),
            default_model_provider: default_model_provider(),
            default_model_name: None,
            default_temperature: default_temperature(),
            default_max_tokens: None,
            default_timeout: default_timeout(),
            session_log_dir: default_session_log_dir(),
            enable_logging: true,
            log_level: default_log_level(),
            enable_code_execution: true,
            allowed_code_types: default_allowed_code_types(),
            code_execution_timeout_secs: default_timeout(),
            terminal_shell: default_terminal_shell(),
            terminal_timeout_ms: default_terminal_timeout(),
            terminal_working_dir_raw: default_terminal_working_dir(),
            enable_mcp: false,
            mcp_browser_server: default_mcp_browser_server(),
            mcp_browser_command: default_mcp_browser_command(),
            mcp_browser_args: default_mcp_browser_args(),
            mcp_request_timeout_secs: default_mcp_request_timeout(),
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

fn default_true() -> bool {
    true
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_gemini_host() -> String {
    GEMINI_HOST.to_string()
}

fn default_exa_host() -> String {
    EXA_HOST.to_string()
}

fn default_model_provider() -> String {
    "anthropic".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    60
}

fn default_session_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allowed_code_types() -> Vec<String> {
    vec!["python".to_string(), "bash".to_string(), "r".to_string()]
}

fn default_terminal_shell() -> String {
    "bash".to_string()
}

fn default_terminal_timeout() -> u64 {
    10_000
}

fn default_terminal_working_dir() -> String {
    "./workspace".to_string()
}

fn default_mcp_browser_server() -> String {
    "browser_use".to_string()
}

fn default_mcp_browser_command() -> String {
    "npx".to_string()
}

fn default_mcp_browser_args() -> String {
    "@co-browser/browser-use-mcp".to_string()
}

fn default_mcp_request_timeout() -> u64 {
    30
}
