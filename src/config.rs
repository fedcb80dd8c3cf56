//! Typed configuration.
//!
//! Each component receives only its own struct. The whole tree can be loaded
//! from a YAML file; every field has a default so a partial (or missing) file
//! is fine. API keys may be written as `${ENV_VAR}`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::retrieval::SortBy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retriever: RetrieverConfig,
    pub providers: ProvidersConfig,
    pub summarizer: SummarizerConfig,
    pub report: ReportConfig,
    pub session: SessionConfig,
    pub defaults: QueryDefaults,
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }
}

/// Settings read by the paper retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub base_url: String,
    /// Entries requested per API call
    pub page_size: usize,
    /// Pause between successive page requests
    pub delay_seconds: f64,
    /// Retries per page after the first failed attempt
    pub num_retries: u32,
    pub timeout_secs: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            base_url: "https://export.arxiv.org/api/query".to_string(),
            page_size: 100,
            delay_seconds: 3.0,
            num_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl RetrieverConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds.max(0.0))
    }
}

/// One OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Literal key, `${ENV_VAR}`, or empty to use the provider's default variable
    #[serde(default)]
    pub api_key: String,
    /// Send `response_format` on JSON requests; turn off for providers that reject it
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
}

fn default_json_mode() -> bool {
    true
}

impl ProviderConfig {
    pub fn groq_default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: "${GROQ_API_KEY}".to_string(),
            json_mode: true,
        }
    }

    pub fn openai_default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            json_mode: true,
        }
    }

    pub fn resolved_api_key(&self, fallback_env: &str) -> Option<String> {
        resolve_api_key(&self.api_key, fallback_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Low-latency model, always used
    pub primary: ProviderConfig,
    /// Higher-quality model for deep analysis and aggregation, used only when it has a key
    pub secondary: Option<ProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::groq_default(),
            secondary: Some(ProviderConfig::openai_default()),
        }
    }
}

/// Sampling settings for one summarizer pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl PassSettings {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

/// Settings read by the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub fast: PassSettings,
    pub deep: PassSettings,
    pub insights: PassSettings,
    pub directions: PassSettings,
    pub fast_delay_ms: u64,
    pub deep_delay_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            fast: PassSettings::new(0.3, 300),
            deep: PassSettings::new(0.3, 1500),
            insights: PassSettings::new(0.5, 2000),
            directions: PassSettings::new(0.7, 2000),
            fast_delay_ms: 500,
            deep_delay_ms: 1000,
        }
    }
}

impl SummarizerConfig {
    /// Same passes with no throttling, for tests and local mocks
    pub fn without_delays() -> Self {
        Self {
            fast_delay_ms: 0,
            deep_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn fast_delay(&self) -> Duration {
        Duration::from_millis(self.fast_delay_ms)
    }

    pub fn deep_delay(&self) -> Duration {
        Duration::from_millis(self.deep_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Settings read by the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub persist_root: PathBuf,
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub api_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist_root: PathBuf::from("research_sessions"),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_base_url: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_api_key(&self.api_key, "OPENAI_API_KEY")
    }
}

/// Values used when the caller does not pass them explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub max_papers: usize,
    pub days_back: i64,
    pub categories: Vec<String>,
    pub sort_by: SortBy,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            max_papers: 15,
            days_back: 730,
            categories: Vec::new(),
            sort_by: SortBy::SubmittedDate,
        }
    }
}

/// Resolve `${VAR}` references, literal keys, or the fallback variable.
pub fn resolve_api_key(raw: &str, fallback_env: &str) -> Option<String> {
    let raw = raw.trim();
    let key = if let Some(var) = raw.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
        std::env::var(var).ok()
    } else if !raw.is_empty() {
        Some(raw.to_string())
    } else {
        std::env::var(fallback_env).ok()
    };
    key.filter(|k| !k.trim().is_empty())
}
