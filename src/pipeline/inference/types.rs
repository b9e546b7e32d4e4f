use std::fmt;

use serde::{Deserialize, Serialize};

use super::InferenceError;
use crate::pipeline::allocation::Field;

/// Default per-call timeout for remote providers, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Provider order when `LLM_PROVIDER_PRIORITY` is unset or has no valid names.
pub const DEFAULT_PRIORITY: [ProviderKind; 3] =
    [ProviderKind::Groq, ProviderKind::OpenRouter, ProviderKind::Gemini];

/// Groq models known to accept chat completions.
const GROQ_MODELS: &[&str] = &["llama-3.3-70b-versatile"];

/// OpenRouter free-tier models, primary first.
const OPENROUTER_MODELS: &[&str] = &[
    "qwen/qwen-2.5-coder-32b-instruct:free",
    "qwen/qwen-2.5-72b-instruct:free",
    "deepseek/deepseek-r1:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "qwen/qwen3-coder:free",
];

const GEMINI_MODELS: &[&str] = &["gemini-2.0-flash-exp"];

/// Remote text-completion provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "openrouter" => Some(Self::OpenRouter),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_CLOUD_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1/chat/completions",
            Self::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/models",
        }
    }

    pub fn default_models(&self) -> Vec<String> {
        let models = match self {
            Self::Groq => GROQ_MODELS,
            Self::OpenRouter => OPENROUTER_MODELS,
            Self::Gemini => GEMINI_MODELS,
        };
        models.iter().map(|m| m.to_string()).collect()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one remote provider. Read-only during a run.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: String,
    /// Position in the failover order; lower runs first.
    pub priority: usize,
    pub enabled: bool,
    /// Models tried in order within a single provider attempt.
    pub models: Vec<String>,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Defaults for a provider kind; disabled until a key is supplied.
    pub fn new(kind: ProviderKind, priority: usize) -> Self {
        Self {
            kind,
            endpoint: kind.default_endpoint().to_string(),
            priority,
            enabled: false,
            models: kind.default_models(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        let key = key.trim();
        if key.is_empty() {
            self.api_key = None;
            self.enabled = false;
        } else {
            self.api_key = Some(key.to_string());
            self.enabled = true;
        }
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        if !models.is_empty() {
            self.models = models;
        }
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Usable only when enabled and holding a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

// The API key is never printed.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("models", &self.models)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Remote-tier configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub enabled: bool,
    /// Sorted by priority.
    pub providers: Vec<ProviderConfig>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: DEFAULT_PRIORITY
                .iter()
                .enumerate()
                .map(|(rank, kind)| ProviderConfig::new(*kind, rank))
                .collect(),
        }
    }
}

impl InferenceConfig {
    /// Remote fallback switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            providers: Vec::new(),
        }
    }

    /// Read from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source.
    ///
    /// - `ENABLE_LLM_FALLBACK`: `true` unless set to something else
    /// - `LLM_PROVIDER_PRIORITY`: comma list; unknown names dropped,
    ///   duplicates ignored, empty result falls back to groq,openrouter,gemini
    /// - `<PROVIDER>_API_KEY`: enables a provider
    /// - `LLM_MODEL`, `LLM_MODEL_FALLBACK_1..4`: OpenRouter model list
    /// - `LLM_TIMEOUT_SECS`: per-call timeout
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("ENABLE_LLM_FALLBACK")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let timeout_secs = lookup("LLM_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let order = lookup("LLM_PROVIDER_PRIORITY")
            .map(|v| parse_priority(&v))
            .filter(|order| !order.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_vec());

        let openrouter_models = openrouter_models(&lookup);

        let providers = order
            .into_iter()
            .enumerate()
            .map(|(rank, kind)| {
                let mut config = ProviderConfig::new(kind, rank).with_timeout(timeout_secs);
                if let Some(key) = lookup(kind.api_key_var()) {
                    config = config.with_api_key(&key);
                }
                if kind == ProviderKind::OpenRouter {
                    config = config.with_models(openrouter_models.clone());
                }
                config
            })
            .collect();

        Self { enabled, providers }
    }

    /// Providers that will actually be attempted, in order.
    pub fn usable_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.is_usable())
    }
}

/// Parse a comma-separated provider list, keeping first occurrences only.
fn parse_priority(raw: &str) -> Vec<ProviderKind> {
    let mut order = Vec::new();
    for kind in raw.split(',').filter_map(ProviderKind::from_name) {
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    order
}

fn openrouter_models<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ProviderKind::OpenRouter.default_models();
    let keys = [
        "LLM_MODEL",
        "LLM_MODEL_FALLBACK_1",
        "LLM_MODEL_FALLBACK_2",
        "LLM_MODEL_FALLBACK_3",
        "LLM_MODEL_FALLBACK_4",
    ];
    keys.into_iter()
        .zip(defaults)
        .map(|(key, default)| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        })
        .collect()
}

/// What a provider is asked: the source text and the exact fields wanted.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub system: String,
    pub prompt: String,
    pub fields: Vec<Field>,
}

/// A remote text-completion provider (allows mocking).
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Send the request; returns the provider's raw text reply.
    fn invoke(&self, request: &PromptRequest) -> Result<String, InferenceError>;
}
