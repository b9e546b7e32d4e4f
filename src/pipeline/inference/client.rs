use std::collections::BTreeMap;

use super::parser::{parse_allocation_response, parse_performance_response};
use super::prompt::{build_performance_request, build_prompt_request};
use super::providers::provider_from_config;
use super::types::{InferenceConfig, InferenceProvider, PromptRequest};
use super::{InferenceError, ProviderFailure};
use crate::pipeline::allocation::confidence::tier_confidence;
use crate::pipeline::allocation::{Candidate, Field, Tier};

/// Result of one remote-tier call across the provider list.
#[derive(Debug, Clone, Default)]
pub struct InferenceOutcome {
    /// Validated candidates for requested fields, from the first provider
    /// that produced any.
    pub candidates: BTreeMap<Field, Candidate>,
    /// Providers that were tried and failed, in attempt order.
    pub failures: Vec<ProviderFailure>,
    /// Name of the provider whose reply was used.
    pub provider: Option<String>,
}

/// Result of one remote performance-table call.
#[derive(Debug, Clone, Default)]
pub struct PerformanceOutcome {
    /// Cleaned amounts keyed by table label.
    pub amounts: BTreeMap<String, String>,
    pub failures: Vec<ProviderFailure>,
    pub provider: Option<String>,
}

/// Ordered provider list with failover. Each provider is tried at most once
/// per call; the first usable reply wins.
pub struct RemoteInferenceClient {
    providers: Vec<Box<dyn InferenceProvider>>,
}

impl RemoteInferenceClient {
    pub fn new(providers: Vec<Box<dyn InferenceProvider>>) -> Self {
        Self { providers }
    }

    /// HTTP providers built from configuration, in priority order.
    /// A provider whose client cannot be built is logged and left out.
    pub fn from_config(config: &InferenceConfig) -> Self {
        if !config.enabled {
            return Self::new(Vec::new());
        }
        let mut ordered: Vec<_> = config.providers.clone();
        ordered.sort_by_key(|p| p.priority);

        let providers = ordered
            .into_iter()
            .filter_map(|p| {
                let kind = p.kind;
                match provider_from_config(p) {
                    Ok(provider) => Some(provider),
                    Err(e) => {
                        tracing::warn!(provider = %kind, error = %e, "Provider unavailable");
                        None
                    }
                }
            })
            .collect();
        Self::new(providers)
    }

    /// Names of providers in attempt order, enabled or not.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn has_enabled_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_enabled())
    }

    /// Ask providers in order for the unresolved fields.
    ///
    /// Disabled providers are skipped silently. Transport errors, error
    /// statuses, unparseable replies, and replies without any usable value
    /// are recorded as failures and the next provider is tried.
    pub fn infer(&self, text: &str, unresolved: &[Field]) -> InferenceOutcome {
        let mut outcome = InferenceOutcome::default();
        if unresolved.is_empty() {
            return outcome;
        }

        tracing::info!(fields = unresolved.len(), "Requesting remote allocation extraction");
        let request = build_prompt_request(text, unresolved);
        let (success, failures) = self.first_success(&request, |reply| {
            parse_allocation_response(reply, unresolved)
        });
        outcome.failures = failures;

        if let Some((name, values)) = success {
            tracing::info!(provider = %name, resolved = values.len(), "Remote extraction succeeded");
            outcome.candidates = values
                .into_iter()
                .map(|(field, value)| {
                    let candidate = Candidate {
                        field,
                        value,
                        tier: Tier::Llm,
                        confidence: tier_confidence::LLM,
                        detail: name.clone(),
                    };
                    (field, candidate)
                })
                .collect();
            outcome.provider = Some(name);
        }
        outcome
    }

    /// Ask providers in order for performance rows the table reader could
    /// not map. Same failover rules as [`Self::infer`].
    pub fn infer_performance(&self, table_text: &str, missing: &[&str]) -> PerformanceOutcome {
        let mut outcome = PerformanceOutcome::default();
        if missing.is_empty() {
            return outcome;
        }

        tracing::info!(labels = missing.len(), "Requesting remote performance extraction");
        let request = build_performance_request(table_text, missing);
        let (success, failures) = self.first_success(&request, |reply| {
            parse_performance_response(reply, missing)
        });
        outcome.failures = failures;

        if let Some((name, amounts)) = success {
            tracing::info!(provider = %name, resolved = amounts.len(), "Remote performance extraction succeeded");
            outcome.amounts = amounts;
            outcome.provider = Some(name);
        }
        outcome
    }

    /// Run the provider chain until one reply parses.
    fn first_success<T>(
        &self,
        request: &PromptRequest,
        parse: impl Fn(&str) -> Result<T, InferenceError>,
    ) -> (Option<(String, T)>, Vec<ProviderFailure>) {
        let mut failures = Vec::new();
        for provider in self.providers.iter().filter(|p| p.is_enabled()) {
            let name = provider.name();
            tracing::debug!(provider = %name, "Calling provider");

            match provider.invoke(request).and_then(|reply| parse(&reply)) {
                Ok(value) => return (Some((name.to_string(), value)), failures),
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "Provider failed, trying next");
                    failures.push(ProviderFailure::new(name, &e));
                }
            }
        }

        tracing::warn!(attempted = failures.len(), "No remote provider produced values");
        (None, failures)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::inference::MockProvider;

    /// Shares a mock with the client so calls can be inspected afterwards.
    struct Shared(Arc<MockProvider>);

    impl InferenceProvider for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }
        fn is_enabled(&self) -> bool {
            self.0.is_enabled()
        }
        fn invoke(&self, request: &PromptRequest) -> Result<String, InferenceError> {
            self.0.invoke(request)
        }
    }

    fn shared(mock: MockProvider) -> (Arc<MockProvider>, Box<dyn InferenceProvider>) {
        let arc = Arc::new(mock);
        (arc.clone(), Box::new(Shared(arc)))
    }

    #[test]
    fn first_provider_failure_falls_over_to_second() {
        let (first, p1) = shared(MockProvider::failing(
            "groq",
            InferenceError::Http {
                status: 500,
                body: "down".into(),
            },
        ));
        let (second, p2) = shared(MockProvider::ok("openrouter", r#"{"real_estate_pct": 15}"#));
        let client = RemoteInferenceClient::new(vec![p1, p2]);

        let outcome = client.infer("text", &[Field::RealEstate]);

        assert_eq!(outcome.candidates[&Field::RealEstate].value, 15.0);
        assert_eq!(outcome.candidates[&Field::RealEstate].tier, Tier::Llm);
        assert_eq!(outcome.provider.as_deref(), Some("openrouter"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, "groq");
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[test]
    fn success_stops_the_chain() {
        let (_, p1) = shared(MockProvider::ok("groq", r#"{"equities_pct": 28}"#));
        let (second, p2) = shared(MockProvider::ok("gemini", r#"{"equities_pct": 99}"#));
        let client = RemoteInferenceClient::new(vec![p1, p2]);

        let outcome = client.infer("text", &[Field::Equities]);
        assert_eq!(outcome.candidates[&Field::Equities].value, 28.0);
        assert_eq!(second.call_count(), 0);
    }

    #[test]
    fn all_failing_returns_empty_with_every_failure() {
        let (_, p1) = shared(MockProvider::failing("groq", InferenceError::RateLimited));
        let (_, p2) = shared(MockProvider::ok("openrouter", "no json here"));
        let (_, p3) = shared(MockProvider::ok("gemini", r#"{"equities_pct": 400}"#));
        let client = RemoteInferenceClient::new(vec![p1, p2, p3]);

        let outcome = client.infer("text", &[Field::Equities]);
        assert!(outcome.candidates.is_empty());
        assert!(outcome.provider.is_none());
        let names: Vec<_> = outcome.failures.iter().map(|f| f.provider.as_str()).collect();
        assert_eq!(names, vec!["groq", "openrouter", "gemini"]);
    }

    #[test]
    fn disabled_providers_are_skipped_without_failure() {
        let (skipped, p1) = shared(MockProvider::ok("groq", r#"{"equities_pct": 1}"#).disabled());
        let (_, p2) = shared(MockProvider::ok("gemini", r#"{"equities_pct": 28}"#));
        let client = RemoteInferenceClient::new(vec![p1, p2]);

        let outcome = client.infer("text", &[Field::Equities]);
        assert_eq!(skipped.call_count(), 0);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.provider.as_deref(), Some("gemini"));
    }

    #[test]
    fn no_fields_means_no_calls() {
        let (mock, p1) = shared(MockProvider::ok("groq", r#"{"equities_pct": 1}"#));
        let client = RemoteInferenceClient::new(vec![p1]);
        let outcome = client.infer("text", &[]);
        assert!(outcome.candidates.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn prompt_only_names_unresolved_fields() {
        let (mock, p1) = shared(MockProvider::ok("groq", r#"{"precious_metals_pct": 2}"#));
        let client = RemoteInferenceClient::new(vec![p1]);
        client.infer("Gold holdings 2%", &[Field::PreciousMetals]);
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("precious_metals_pct"));
        assert!(!prompt.contains("equities_pct"));
    }

    #[test]
    fn performance_rows_use_the_same_failover() {
        let (first, p1) = shared(MockProvider::failing("groq", InferenceError::RateLimited));
        let (second, p2) = shared(MockProvider::ok(
            "gemini",
            r#"{"Loans to public entities in Switzerland": "1 234"}"#,
        ));
        let client = RemoteInferenceClient::new(vec![p1, p2]);

        let outcome = client.infer_performance(
            "Loans: 1 234",
            &["Loans to public entities in Switzerland"],
        );
        assert_eq!(
            outcome.amounts["Loans to public entities in Switzerland"],
            "1234"
        );
        assert_eq!(outcome.provider.as_deref(), Some("gemini"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(first.call_count(), 1);
        assert!(second.prompts()[0].contains("Loans to public entities in Switzerland"));
    }

    #[test]
    fn no_missing_rows_means_no_performance_calls() {
        let (mock, p1) = shared(MockProvider::ok("groq", "{}"));
        let client = RemoteInferenceClient::new(vec![p1]);
        assert!(client.infer_performance("table", &[]).amounts.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn disabled_config_builds_empty_client() {
        let client = RemoteInferenceClient::from_config(&InferenceConfig::disabled());
        assert!(client.provider_names().is_empty());
        assert!(!client.has_enabled_provider());
    }

    #[test]
    fn config_order_is_respected() {
        let mut config = InferenceConfig::default();
        config.providers.reverse();
        for (rank, p) in config.providers.iter_mut().enumerate() {
            p.priority = rank;
        }
        let client = RemoteInferenceClient::from_config(&config);
        assert_eq!(client.provider_names(), vec!["gemini", "openrouter", "groq"]);
        assert!(!client.has_enabled_provider());
    }
}
