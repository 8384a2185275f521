//! Application configuration.
//!
//! Configuration is loaded once at startup and handed to components
//! explicitly; nothing here is cached globally. Sources, lowest precedence
//! first:
//! - Built-in defaults ([`crate::defaults`])
//! - YAML file (`APR_CONFIG`, default `conf/app_config.yaml`, optional).
//!   String values of the exact form `${VAR}` are replaced by the
//!   environment variable when it is set.
//! - Environment overrides (`STORAGE__WORKSPACE_ROOT`, `API__HOST`,
//!   `API__PORT`, `LLM__PROVIDER`, `LLM__MODEL`, `PDF__MAX_FILE_SIZE_MB`)
//! - Provider API keys (`OPENAI_API_KEY`, `GROK_API_KEY`, `MINIMAX_API_KEY`)
//!   when the file does not set them
//!
//! # Example
//!
//! ```rust,no_run
//! use apr_core::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load config");
//! println!("workspace: {}", config.storage.workspace_root.display());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::defaults;
use crate::error::{Error, Result};

/// LLM provider. All providers speak the OpenAI chat-completions protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Grok,
    MiniMax,
}

impl LlmProvider {
    /// Every supported provider, in display order.
    pub const ALL: [LlmProvider; 3] = [Self::OpenAI, Self::Grok, Self::MiniMax];
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "grok" => Ok(Self::Grok),
            "minimax" => Ok(Self::MiniMax),
            _ => Err(Error::Config(format!("Unsupported LLM provider: {}", s))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Grok => write!(f, "grok"),
            Self::MiniMax => write!(f, "minimax"),
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub version: String,
    pub debug: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: defaults::APP_NAME.to_string(),
            version: defaults::APP_VERSION.to_string(),
            debug: true,
        }
    }
}

/// Workspace storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory whose subdirectories are papers.
    pub workspace_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from(defaults::WORKSPACE_ROOT),
        }
    }
}

/// LLM provider selection and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,

    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    #[serde(skip_serializing)]
    pub grok_api_key: Option<String>,
    pub grok_base_url: String,

    #[serde(skip_serializing)]
    pub minimax_api_key: Option<String>,
    pub minimax_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: defaults::LLM_MODEL.to_string(),
            temperature: defaults::LLM_TEMPERATURE,
            max_tokens: defaults::LLM_MAX_TOKENS,
            timeout_seconds: defaults::LLM_TIMEOUT_SECS,
            openai_api_key: None,
            openai_base_url: defaults::OPENAI_BASE_URL.to_string(),
            grok_api_key: None,
            grok_base_url: defaults::GROK_BASE_URL.to_string(),
            minimax_api_key: None,
            minimax_base_url: defaults::MINIMAX_BASE_URL.to_string(),
        }
    }
}

impl LlmConfig {
    /// Base URL of the active provider.
    pub fn base_url(&self) -> &str {
        match self.provider {
            LlmProvider::OpenAI => &self.openai_base_url,
            LlmProvider::Grok => &self.grok_base_url,
            LlmProvider::MiniMax => &self.minimax_base_url,
        }
    }

    /// API key of the active provider, if configured. Blank values and
    /// unexpanded `${VAR}` placeholders count as unset.
    pub fn api_key(&self) -> Option<&str> {
        let key = match self.provider {
            LlmProvider::OpenAI => self.openai_api_key.as_deref(),
            LlmProvider::Grok => self.grok_api_key.as_deref(),
            LlmProvider::MiniMax => self.minimax_api_key.as_deref(),
        };
        key.map(str::trim)
            .filter(|k| !k.is_empty() && !ENV_PLACEHOLDER.is_match(k))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("llm.model cannot be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        let url = self.base_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "{} base_url must start with http:// or https://, got: {}",
                self.provider, url
            )));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            cors_origins: vec![defaults::CORS_ORIGIN.to_string()],
        }
    }
}

/// PDF handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub max_file_size_mb: u64,
    pub extract_images: bool,
    pub ocr_enabled: bool,
    pub default_highlight_color: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: defaults::MAX_FILE_SIZE_MB,
            extract_images: true,
            ocr_enabled: false,
            default_highlight_color: defaults::HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl PdfConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(defaults::BYTES_PER_MB)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub api: ApiConfig,
    pub pdf: PdfConfig,
}

impl AppConfig {
    /// Load from `APR_CONFIG` (or the default path) and the process environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var("APR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::CONFIG_PATH));
        Self::load_from(&path, |key| std::env::var(key).ok())
    }

    /// Load from a YAML file (missing file means defaults) and an env lookup.
    pub fn load_from<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let yaml = if path.exists() {
            info!(path = %path.display(), "Loading configuration file");
            Some(std::fs::read_to_string(path)?)
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            None
        };
        Self::from_sources(yaml.as_deref(), env)
    }

    /// Build from optional YAML text and an env lookup.
    pub fn from_sources<F>(yaml: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match yaml {
            Some(text) if !text.trim().is_empty() => {
                let mut value: serde_yaml::Value = serde_yaml::from_str(text)?;
                expand_env_vars(&mut value, &env);
                serde_yaml::from_value(value)?
            }
            _ => AppConfig::default(),
        };

        config.apply_env_overrides(&env)?;
        config.storage.workspace_root = expand_home(&config.storage.workspace_root, &env);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides<F>(&mut self, env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = env("STORAGE__WORKSPACE_ROOT") {
            self.storage.workspace_root = PathBuf::from(root);
        }
        if let Some(host) = env("API__HOST") {
            self.api.host = host;
        }
        if let Some(port) = env("API__PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid API__PORT: {}", port)))?;
        }
        if let Some(provider) = env("LLM__PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(model) = env("LLM__MODEL") {
            self.llm.model = model;
        }
        if let Some(size) = env("PDF__MAX_FILE_SIZE_MB") {
            self.pdf.max_file_size_mb = size
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PDF__MAX_FILE_SIZE_MB: {}", size)))?;
        }

        if self.llm.openai_api_key.is_none() {
            self.llm.openai_api_key = env("OPENAI_API_KEY");
        }
        if self.llm.grok_api_key.is_none() {
            self.llm.grok_api_key = env("GROK_API_KEY");
        }
        if self.llm.minimax_api_key.is_none() {
            self.llm.minimax_api_key = env("MINIMAX_API_KEY");
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.workspace_root.as_os_str().is_empty() {
            return Err(Error::Config(
                "storage.workspace_root cannot be empty".to_string(),
            ));
        }
        if self.pdf.max_file_size_mb == 0 {
            return Err(Error::Config(
                "pdf.max_file_size_mb must be greater than 0".to_string(),
            ));
        }
        self.llm.validate()
    }
}

/// A whole-string `${VAR}` placeholder.
static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("valid placeholder regex")
});

/// Replace `${VAR}` string values in place; unset variables are left as-is.
fn expand_env_vars<F>(value: &mut serde_yaml::Value, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        serde_yaml::Value::String(s) => {
            let resolved = ENV_PLACEHOLDER
                .captures(s)
                .and_then(|caps| env(&caps[1]));
            if let Some(resolved) = resolved {
                *s = resolved;
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                expand_env_vars(item, env);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                expand_env_vars(item, env);
            }
        }
        _ => {}
    }
}

fn expand_home<F>(path: &Path, env: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    if text == "~" || text.starts_with("~/") {
        if let Some(home) = env("HOME") {
            return PathBuf::from(home).join(text.trim_start_matches('~').trim_start_matches('/'));
        }
    }
    path.to_path_buf()
}
