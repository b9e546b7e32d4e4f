//! Proximity tier: a field label near a percentage token, phrasing-independent.
//!
//! Text is split into sentences, sentences into whitespace words. A pair
//! (label occurrence, percentage token) inside one sentence qualifies when
//! their word distance is within the window and no other field's label is
//! closer to the token. Pairs are visited in document order of the token and
//! tokens outside the accepted percentage range are passed over.

use std::sync::LazyLock;

use regex::Regex;

use super::confidence::proximity_confidence;
use super::types::{AllocationTier, Candidate, Field, Tier};
use super::validation::{is_valid_percent, normalize_decimal_comma, parse_percent};

/// Default maximum word distance between label and percentage.
pub const DEFAULT_WINDOW: usize = 15;

/// Sentence terminators: a period followed by whitespace or end of text
/// (decimal points never qualify), plus `!`, `?` and `;`.
static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(?:\s+|$)|[!?;]").unwrap());

/// A word that carries its own percent sign: `23.5%`, `(0%)`, `23,5%,`.
static PERCENT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?(\d+(?:[.,]\d+)?)%").unwrap());

/// A bare number, for `23.5 %` and `23.5 percent`.
static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?(\d+(?:[.,]\d+)?)\)?$").unwrap());

/// Proximity matcher with a configurable window.
#[derive(Debug, Clone)]
pub struct ProximityMatcher {
    window: usize,
}

impl Default for ProximityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// A label term found in a sentence, spanning words `start..=end`.
#[derive(Debug, Clone, Copy)]
struct LabelHit {
    field: Field,
    term: &'static str,
    start: usize,
    end: usize,
}

impl LabelHit {
    /// Word distance to a token index; zero if the token is inside the label.
    fn distance_to(&self, index: usize) -> usize {
        if index > self.end {
            index - self.end
        } else if index < self.start {
            self.start - index
        } else {
            0
        }
    }

    fn precedes(&self, index: usize) -> bool {
        self.end < index
    }
}

/// A percentage token at word `index`.
#[derive(Debug, Clone, Copy)]
struct PercentToken {
    index: usize,
    value: f64,
}

impl ProximityMatcher {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Match within one sentence.
    fn match_sentence(&self, sentence: &str, field: Field) -> Option<Candidate> {
        let words: Vec<String> = sentence.split_whitespace().map(normalize_word).collect();
        if words.is_empty() {
            return None;
        }
        let raw: Vec<&str> = sentence.split_whitespace().collect();

        let tokens = percent_tokens(&raw);
        if tokens.is_empty() {
            return None;
        }

        let hits = label_hits(&words);
        let (own, others): (Vec<&LabelHit>, Vec<&LabelHit>) =
            hits.iter().partition(|h| h.field == field);
        if own.is_empty() {
            return None;
        }

        for token in &tokens {
            if !is_valid_percent(token.value) {
                tracing::debug!(field = %field, value = token.value, "Skipping out-of-range token");
                continue;
            }
            let Some(nearest) = own
                .iter()
                .min_by_key(|h| (h.distance_to(token.index), !h.precedes(token.index)))
            else {
                continue;
            };
            let distance = nearest.distance_to(token.index);
            if distance > self.window {
                continue;
            }

            if let Some(rival) = others
                .iter()
                .find(|o| claims_token(o, nearest, token.index))
            {
                tracing::debug!(
                    field = %field,
                    rival = %rival.field,
                    value = token.value,
                    "Proximity candidate closer to another field's label"
                );
                continue;
            }

            return Some(Candidate {
                field,
                value: token.value,
                tier: Tier::Proximity,
                confidence: proximity_confidence(distance),
                detail: format!("label '{}' at distance {distance}", nearest.term),
            });
        }

        None
    }
}

impl AllocationTier for ProximityMatcher {
    fn tier(&self) -> Tier {
        Tier::Proximity
    }

    fn match_field(&self, text: &str, field: Field) -> Option<Candidate> {
        SENTENCE_SPLIT
            .split(text)
            .find_map(|sentence| self.match_sentence(sentence, field))
    }
}

/// Whether `rival` has a better claim on the token than `own`: strictly
/// closer, or equally close while preceding the token when `own` follows it.
fn claims_token(rival: &LabelHit, own: &LabelHit, index: usize) -> bool {
    let rival_distance = rival.distance_to(index);
    let own_distance = own.distance_to(index);
    rival_distance < own_distance
        || (rival_distance == own_distance && rival.precedes(index) && !own.precedes(index))
}

/// Lower-case and strip surrounding punctuation, keeping inner hyphens.
fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// All percentage tokens in a sentence, in order.
fn percent_tokens(raw: &[&str]) -> Vec<PercentToken> {
    let mut tokens = Vec::new();
    for (index, word) in raw.iter().enumerate() {
        let captured = PERCENT_WORD.captures(word).or_else(|| {
            let next = raw.get(index + 1).map(|w| normalize_word(w))?;
            let is_percent_word = next == "percent" || raw[index + 1].starts_with('%');
            if is_percent_word {
                BARE_NUMBER.captures(word)
            } else {
                None
            }
        });
        let Some(caps) = captured else { continue };
        let Some(number) = caps.get(1) else { continue };
        if let Some(value) = parse_percent(&normalize_decimal_comma(number.as_str())) {
            tokens.push(PercentToken { index, value });
        }
    }
    tokens
}

/// All label-term occurrences of every field in a sentence.
fn label_hits(words: &[String]) -> Vec<LabelHit> {
    let mut hits = Vec::new();
    for field in Field::ALL {
        for &term in field.label_terms() {
            let parts: Vec<&str> = term.split_whitespace().collect();
            if parts.is_empty() || parts.len() > words.len() {
                continue;
            }
            for start in 0..=(words.len() - parts.len()) {
                let matched = parts
                    .iter()
                    .zip(&words[start..start + parts.len()])
                    .all(|(part, word)| term_word_matches(part, word));
                if matched {
                    hits.push(LabelHit {
                        field,
                        term,
                        start,
                        end: start + parts.len() - 1,
                    });
                }
            }
        }
    }
    hits
}

/// `equit*` matches any word starting with `equit`; otherwise exact.
fn term_word_matches(part: &str, word: &str) -> bool {
    match part.strip_suffix('*') {
        Some(prefix) => word.starts_with(prefix),
        None => word == part,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ProximityMatcher {
        ProximityMatcher::default()
    }

    fn filler(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn label_ten_words_from_percentage_resolves() {
        // distance = 9 filler words + 1
        let text = format!("Equities {} 28% of the portfolio.", filler(9));
        let candidate = matcher().match_field(&text, Field::Equities).unwrap();
        assert_eq!(candidate.value, 28.0);
        assert_eq!(candidate.tier, Tier::Proximity);
        assert!(candidate.detail.contains("distance 10"));
    }

    #[test]
    fn label_twenty_words_from_percentage_does_not_resolve() {
        let text = format!("Equities {} 28% of the portfolio.", filler(19));
        assert!(matcher().match_field(&text, Field::Equities).is_none());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let inside = format!("Equities {} 28%.", filler(14));
        let outside = format!("Equities {} 28%.", filler(15));
        assert!(matcher().match_field(&inside, Field::Equities).is_some());
        assert!(matcher().match_field(&outside, Field::Equities).is_none());
    }

    #[test]
    fn custom_window_respected() {
        let text = format!("Equities {} 28%.", filler(19));
        assert!(ProximityMatcher::new(25).match_field(&text, Field::Equities).is_some());
    }

    #[test]
    fn percentage_before_label_resolves() {
        let text = "Roughly 12% is held in real estate.";
        let candidate = matcher().match_field(text, Field::RealEstate).unwrap();
        assert_eq!(candidate.value, 12.0);
    }

    #[test]
    fn adjacent_sentences_do_not_cross() {
        let text = "Equities grew strongly over the year. Real estate stayed at 15%.";
        assert!(matcher().match_field(text, Field::Equities).is_none());
        assert_eq!(
            matcher().match_field(text, Field::RealEstate).map(|c| c.value),
            Some(15.0)
        );
    }

    #[test]
    fn adjacent_sentences_each_keep_their_own_value() {
        let text = "Equities stood near 28%. Real estate weighs 15%.";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(28.0));
        assert_eq!(
            matcher().match_field(text, Field::RealEstate).map(|c| c.value),
            Some(15.0)
        );
    }

    #[test]
    fn out_of_range_token_passed_over_within_sentence() {
        let text = "Equities moved 150% in risk terms yet weigh 28% of assets";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(28.0));
    }

    #[test]
    fn out_of_range_sentence_falls_through_to_next() {
        let text = "Equities stood at 150% of benchmark risk. Equities weigh 28% overall.";
        let candidate = matcher().match_field(text, Field::Equities).unwrap();
        assert_eq!(candidate.value, 28.0);
        assert!(matcher().match_field("Equities weigh 150%.", Field::Equities).is_none());
    }

    #[test]
    fn percentage_closer_to_rival_label_not_attributed() {
        let text = "Equities and, separately, real estate 15%";
        assert!(matcher().match_field(text, Field::Equities).is_none());
        assert_eq!(
            matcher().match_field(text, Field::RealEstate).map(|c| c.value),
            Some(15.0)
        );
    }

    #[test]
    fn adjacent_clauses_without_sentence_break_stay_apart() {
        let text = "Real estate reached 15% while equities ended at 25%";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(25.0));
        assert_eq!(matcher().match_field(text, Field::RealEstate).map(|c| c.value), Some(15.0));
    }

    #[test]
    fn tie_goes_to_preceding_label() {
        let text = "Foreign currency bonds stood at 23.5% of strategic allocation while equities remained at 0%, bonds in CHF held steady near 30%.";
        let candidate = matcher().match_field(text, Field::BondsChf).unwrap();
        assert_eq!(candidate.value, 30.0);
        let candidate = matcher().match_field(text, Field::Equities).unwrap();
        assert_eq!(candidate.value, 0.0);
    }

    #[test]
    fn decimal_point_does_not_split_sentence() {
        let text = "Precious metals make up 2.5% of assets.";
        let candidate = matcher().match_field(text, Field::PreciousMetals).unwrap();
        assert_eq!(candidate.value, 2.5);
    }

    #[test]
    fn zero_percent_accepted() {
        let text = "Gold allocation: 0% this year.";
        let candidate = matcher().match_field(text, Field::PreciousMetals).unwrap();
        assert_eq!(candidate.value, 0.0);
    }

    #[test]
    fn separated_percent_sign_and_percent_word() {
        let text = "Equities weigh 28 % overall";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(28.0));
        let text = "Equities weigh 28 percent overall";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(28.0));
    }

    #[test]
    fn comma_decimal_token() {
        let text = "Real estate share 11,3% in total";
        assert_eq!(matcher().match_field(text, Field::RealEstate).map(|c| c.value), Some(11.3));
    }

    #[test]
    fn first_qualifying_pair_in_document_order_wins() {
        let text = "Equities were 20% at the start. Equities were 30% at the end.";
        assert_eq!(matcher().match_field(text, Field::Equities).map(|c| c.value), Some(20.0));
    }

    #[test]
    fn label_without_percentage_misses() {
        assert!(matcher().match_field("Equities are volatile.", Field::Equities).is_none());
    }

    #[test]
    fn confidence_decays_with_distance() {
        let near = matcher().match_field("Equities 28%", Field::Equities).unwrap();
        let far = matcher()
            .match_field(&format!("Equities {} 28%", filler(12)), Field::Equities)
            .unwrap();
        assert!(near.confidence > far.confidence);
    }

    #[test]
    fn multi_word_label_matches_with_punctuation() {
        let words: Vec<String> = "(foreign currency bonds), then"
            .split_whitespace()
            .map(normalize_word)
            .collect();
        let hits = label_hits(&words);
        assert!(hits
            .iter()
            .any(|h| h.field == Field::ForeignCurrencyBonds && h.start == 0 && h.end == 2));
    }
}
