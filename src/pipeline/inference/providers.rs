use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{InferenceProvider, PromptRequest, ProviderConfig, ProviderKind};
use super::InferenceError;

/// Sampling temperature for every provider.
pub const TEMPERATURE: f32 = 0.1;

/// Completion length cap for every provider.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

const OPENROUTER_REFERER: &str = "https://github.com/compenswiss-scraper";
const OPENROUTER_TITLE: &str = "COMPENSWISS Data Scraper";

fn build_http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, InferenceError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InferenceError::HttpClient(e.to_string()))
}

fn classify_transport(error: reqwest::Error, endpoint: &str, timeout_secs: u64) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout(timeout_secs)
    } else if error.is_connect() {
        InferenceError::Connection(endpoint.to_string())
    } else {
        // Strip the URL: Gemini carries the key in the query string.
        InferenceError::HttpClient(error.without_url().to_string())
    }
}

fn classify_status(status: u16, body: String) -> InferenceError {
    match status {
        401 | 403 => InferenceError::Auth(status),
        429 => InferenceError::RateLimited,
        _ => InferenceError::Http { status, body },
    }
}

/// Try each model in order. An authentication failure ends the attempt.
fn try_models<F>(name: &str, models: &[String], mut call: F) -> Result<String, InferenceError>
where
    F: FnMut(&str) -> Result<String, InferenceError>,
{
    let mut last_error = InferenceError::MalformedResponse("No models configured".into());
    for model in models {
        match call(model) {
            Ok(text) => {
                tracing::debug!(provider = %name, model = %model, "Provider returned a reply");
                return Ok(text);
            }
            Err(e @ InferenceError::Auth(_)) => return Err(e),
            Err(e) => {
                tracing::debug!(provider = %name, model = %model, error = %e, "Model attempt failed");
                last_error = e;
            }
        }
    }
    Err(last_error)
}

// ═══════════════════════════════════════════
// OpenAI-compatible chat completions (Groq, OpenRouter)
// ═══════════════════════════════════════════

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Provider speaking the chat-completions protocol with bearer auth.
pub struct ChatCompletionsProvider {
    config: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl ChatCompletionsProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, InferenceError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn call_model(&self, model: &str, request: &PromptRequest) -> Result<String, InferenceError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::MissingApiKey(self.config.kind.to_string()))?;

        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(key)
            .json(&body);
        if self.config.kind == ProviderKind::OpenRouter {
            builder = builder
                .header("HTTP-Referer", OPENROUTER_REFERER)
                .header("X-Title", OPENROUTER_TITLE);
        }

        let response = builder.send().map_err(|e| {
            classify_transport(e, &self.config.endpoint, self.config.timeout_secs)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| InferenceError::MalformedResponse("Reply had no content".into()))
    }
}

impl InferenceProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        self.config.kind.as_str()
    }

    fn is_enabled(&self) -> bool {
        self.config.is_usable()
    }

    fn invoke(&self, request: &PromptRequest) -> Result<String, InferenceError> {
        try_models(self.name(), &self.config.models, |model| {
            self.call_model(model, request)
        })
    }
}

// ═══════════════════════════════════════════
// Gemini generateContent
// ═══════════════════════════════════════════

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

/// Gemini provider. The key travels as a query parameter and is never logged.
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, InferenceError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn call_model(&self, model: &str, request: &PromptRequest) -> Result<String, InferenceError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::MissingApiKey(self.config.kind.to_string()))?;

        let url = format!("{}/{}:generateContent", self.config.endpoint, model);
        // Gemini has no system role in this API; prepend it to the prompt.
        let text = format!("{}\n\n{}", request.system, request.prompt);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: &text }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .map_err(|e| classify_transport(e, &self.config.endpoint, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let parsed: GeminiResponse = response
            .json()
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| InferenceError::MalformedResponse("Reply had no text part".into()))
    }
}

impl InferenceProvider for GeminiProvider {
    fn name(&self) -> &str {
        self.config.kind.as_str()
    }

    fn is_enabled(&self) -> bool {
        self.config.is_usable()
    }

    fn invoke(&self, request: &PromptRequest) -> Result<String, InferenceError> {
        try_models(self.name(), &self.config.models, |model| {
            self.call_model(model, request)
        })
    }
}

/// Construct the HTTP provider matching a config's kind.
pub fn provider_from_config(
    config: ProviderConfig,
) -> Result<Box<dyn InferenceProvider>, InferenceError> {
    Ok(match config.kind {
        ProviderKind::Groq | ProviderKind::OpenRouter => {
            Box::new(ChatCompletionsProvider::new(config)?)
        }
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config)?),
    })
}

/// Mock provider for testing: replays a fixed reply or error and counts calls.
pub struct MockProvider {
    name: String,
    enabled: bool,
    reply: Result<String, InferenceError>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn ok(name: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, error: InferenceError) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Number of times `invoke` ran.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl InferenceProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn invoke(&self, request: &PromptRequest) -> Result<String, InferenceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.prompt.clone());
        }
        self.reply.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(401, String::new()), InferenceError::Auth(401));
        assert_eq!(classify_status(403, String::new()), InferenceError::Auth(403));
        assert_eq!(classify_status(429, String::new()), InferenceError::RateLimited);
        assert_eq!(
            classify_status(500, "boom".into()),
            InferenceError::Http {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[test]
    fn models_tried_until_one_succeeds() {
        let models = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut seen = Vec::new();
        let result = try_models("test", &models, |m| {
            seen.push(m.to_string());
            if m == "b" {
                Ok("reply".into())
            } else {
                Err(InferenceError::RateLimited)
            }
        });
        assert_eq!(result.unwrap(), "reply");
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn auth_failure_stops_model_iteration() {
        let models = vec!["a".to_string(), "b".to_string()];
        let mut calls = 0;
        let result = try_models("test", &models, |_| {
            calls += 1;
            Err(InferenceError::Auth(401))
        });
        assert_eq!(result.unwrap_err(), InferenceError::Auth(401));
        assert_eq!(calls, 1);
    }

    #[test]
    fn last_model_error_reported() {
        let models = vec!["a".to_string(), "b".to_string()];
        let result = try_models("test", &models, |m| {
            Err(InferenceError::Http {
                status: 502,
                body: m.to_string(),
            })
        });
        assert_eq!(
            result.unwrap_err(),
            InferenceError::Http {
                status: 502,
                body: "b".into()
            }
        );
    }

    #[test]
    fn provider_without_key_is_disabled() {
        let provider =
            ChatCompletionsProvider::new(ProviderConfig::new(ProviderKind::Groq, 0)).unwrap();
        assert!(!provider.is_enabled());
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn factory_picks_protocol_by_kind() {
        let config = ProviderConfig::new(ProviderKind::Gemini, 2).with_api_key("k");
        let provider = provider_from_config(config).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert!(provider.is_enabled());
    }

    #[test]
    fn unreachable_endpoint_is_connection_error() {
        let config = ProviderConfig::new(ProviderKind::Groq, 0)
            .with_api_key("k")
            .with_endpoint("http://127.0.0.1:1/v1/chat/completions")
            .with_timeout(2);
        let provider = ChatCompletionsProvider::new(config).unwrap();
        let request = PromptRequest {
            system: "s".into(),
            prompt: "p".into(),
            fields: Vec::new(),
        };
        let err = provider.invoke(&request).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Connection(_) | InferenceError::HttpClient(_) | InferenceError::Timeout(_)
        ));
    }

    #[test]
    fn mock_records_calls() {
        let mock = MockProvider::ok("m", "{}");
        let request = PromptRequest {
            system: "s".into(),
            prompt: "hello".into(),
            fields: Vec::new(),
        };
        assert_eq!(mock.invoke(&request).unwrap(), "{}");
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.prompts(), vec!["hello".to_string()]);
    }
}
