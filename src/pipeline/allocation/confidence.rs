use super::types::{ExtractionResult, Tier};

/// Confidence assigned to candidates, per tier.
pub mod tier_confidence {
    /// Deterministic phrasing matched exactly.
    pub const PATTERN: f32 = 0.95;

    /// Proximity match at distance zero; decays with distance.
    pub const PROXIMITY_MAX: f32 = 0.85;

    /// Floor for distant proximity matches.
    pub const PROXIMITY_MIN: f32 = 0.60;

    /// Value proposed by a remote model.
    pub const LLM: f32 = 0.60;
}

/// Thresholds for reading an overall run confidence.
pub mod thresholds {
    /// Below this: treat the row as unreliable.
    pub const LOW: f32 = 0.50;

    /// Above this: every field came from a local tier.
    pub const HIGH: f32 = 0.85;
}

/// Confidence of a proximity match `distance` words away from its label.
pub fn proximity_confidence(distance: usize) -> f32 {
    let decayed = tier_confidence::PROXIMITY_MAX - 0.01 * distance as f32;
    decayed.max(tier_confidence::PROXIMITY_MIN)
}

/// Default confidence for a tier.
pub fn base_confidence(tier: Tier) -> f32 {
    match tier {
        Tier::Pattern => tier_confidence::PATTERN,
        Tier::Proximity => tier_confidence::PROXIMITY_MAX,
        Tier::Llm => tier_confidence::LLM,
    }
}

/// Overall confidence of a run: mean per-field confidence, with
/// unresolved fields counted as zero.
pub fn overall_confidence(result: &ExtractionResult) -> f32 {
    let total: f32 = result.resolved().values().map(|r| r.confidence).sum();
    (total / super::types::Field::ALL.len() as f32).clamp(0.0, 1.0)
}
