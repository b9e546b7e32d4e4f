use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;

use super::confidence::overall_confidence;
use super::patterns::PatternLibrary;
use super::proximity::{ProximityMatcher, DEFAULT_WINDOW};
use super::types::{AllocationTier, Candidate, ExtractionResult, Field, Resolution};
use super::validation::is_valid_percent;
use super::AllocationError;
use crate::pipeline::inference::{InferenceConfig, RemoteInferenceClient};

/// Immutable configuration handed to the extractor at construction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub patterns: PatternLibrary,
    pub proximity_window: usize,
    pub inference: InferenceConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            patterns: PatternLibrary::default(),
            proximity_window: DEFAULT_WINDOW,
            inference: InferenceConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Local tiers only, default rule table.
    pub fn local_only() -> Self {
        Self {
            inference: InferenceConfig::disabled(),
            ..Self::default()
        }
    }

    /// No pattern rules and no remote fallback. Proximity still runs with
    /// the default window.
    pub fn empty() -> Self {
        Self {
            patterns: PatternLibrary::empty(),
            proximity_window: DEFAULT_WINDOW,
            inference: InferenceConfig::disabled(),
        }
    }

    /// Read from process environment. The only place extraction settings
    /// touch process state.
    pub fn from_env() -> Result<Self, AllocationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source.
    ///
    /// - `PROXIMITY_WINDOW`: word window, default 15
    /// - `ALLOCATION_RULES_FILE`: TOML rule file replacing the default table
    /// - everything [`InferenceConfig::from_lookup`] reads
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AllocationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let proximity_window = lookup("PROXIMITY_WINDOW")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_WINDOW);

        let patterns = match lookup("ALLOCATION_RULES_FILE").filter(|v| !v.trim().is_empty()) {
            Some(path) => PatternLibrary::from_file(&PathBuf::from(path.trim()))?,
            None => PatternLibrary::default(),
        };

        Ok(Self {
            patterns,
            proximity_window,
            inference: InferenceConfig::from_lookup(&lookup),
        })
    }

    pub fn remote_enabled(&self) -> bool {
        self.inference.enabled
    }
}

/// Three-tier extractor: pattern, then proximity, then one remote call
/// for whatever is left.
pub struct AllocationExtractor {
    local_tiers: Vec<Box<dyn AllocationTier + Send + Sync>>,
    remote: Option<RemoteInferenceClient>,
}

impl AllocationExtractor {
    /// Build tiers and the HTTP provider chain from configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        let remote = config
            .inference
            .enabled
            .then(|| RemoteInferenceClient::from_config(&config.inference));
        Self::with_remote(config, remote)
    }

    /// Build local tiers from configuration with an explicit remote client.
    pub fn with_remote(config: ExtractorConfig, remote: Option<RemoteInferenceClient>) -> Self {
        let local_tiers: Vec<Box<dyn AllocationTier + Send + Sync>> = vec![
            Box::new(config.patterns),
            Box::new(ProximityMatcher::new(config.proximity_window)),
        ];
        Self::with_tiers(local_tiers, remote)
    }

    /// Arbitrary ordered local tiers.
    pub fn with_tiers(
        local_tiers: Vec<Box<dyn AllocationTier + Send + Sync>>,
        remote: Option<RemoteInferenceClient>,
    ) -> Self {
        Self {
            local_tiers,
            remote,
        }
    }

    /// The remote provider chain, when fallback is enabled.
    pub fn remote(&self) -> Option<&RemoteInferenceClient> {
        self.remote.as_ref()
    }

    /// Resolve as many fields as possible. Never fails: unresolved fields are
    /// simply absent from the result.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let run_id = Uuid::new_v4();
        let _span = tracing::info_span!("allocation_extract", run_id = %run_id).entered();

        let mut resolved: BTreeMap<Field, Resolution> = BTreeMap::new();
        let mut provider_failures = Vec::new();

        for tier in &self.local_tiers {
            for field in Field::ALL {
                if resolved.contains_key(&field) {
                    continue;
                }
                match tier.match_field(text, field) {
                    Some(candidate) => accept(&mut resolved, candidate),
                    None => tracing::debug!(field = %field, tier = %tier.tier(), "No match"),
                }
            }
        }

        let unresolved = missing_fields(&resolved);
        match &self.remote {
            Some(client) if !unresolved.is_empty() => {
                let outcome = client.infer(text, &unresolved);
                for candidate in outcome.candidates.into_values() {
                    if unresolved.contains(&candidate.field) {
                        accept(&mut resolved, candidate);
                    }
                }
                provider_failures = outcome.failures;
            }
            None if !unresolved.is_empty() => {
                tracing::debug!(unresolved = unresolved.len(), "Remote fallback disabled");
            }
            _ => {}
        }

        let result = ExtractionResult::new(run_id, resolved, provider_failures);
        let missing = result.missing();
        if missing.is_empty() {
            tracing::info!(
                confidence = overall_confidence(&result),
                "All allocation fields resolved"
            );
        } else {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            tracing::warn!(
                missing = ?names,
                confidence = overall_confidence(&result),
                "Allocation fields left unresolved"
            );
        }
        result
    }
}

/// Record a candidate if it passes validation; a rejected value leaves the
/// field open for the next tier.
fn accept(resolved: &mut BTreeMap<Field, Resolution>, candidate: Candidate) {
    let field = candidate.field;
    if resolved.contains_key(&field) {
        return;
    }
    if !is_valid_percent(candidate.value) {
        tracing::info!(
            field = %field,
            tier = %candidate.tier,
            value = candidate.value,
            "Rejected out-of-range value"
        );
        return;
    }
    tracing::info!(
        field = %field,
        tier = %candidate.tier,
        value = candidate.value,
        detail = %candidate.detail,
        "Resolved"
    );
    resolved.insert(field, Resolution::from(candidate));
}

fn missing_fields(resolved: &BTreeMap<Field, Resolution>) -> Vec<Field> {
    Field::ALL
        .into_iter()
        .filter(|f| !resolved.contains_key(f))
        .collect()
}
