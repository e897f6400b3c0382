//! Analysis data model.
//!
//! Feature kinds, per-feature payloads and outcomes, and the assembled
//! per-request result. Everything here is plain data; derivation lives in
//! [`crate::categories`] and orchestration in [`crate::aggregate`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use textlens_common::config::ALL_FEATURES;
use thiserror::Error;

use crate::categories::CategorySummary;

// ============================================================================
// Features
// ============================================================================

/// One kind of analysis offered by the provider.
///
/// Ordering follows declaration order, so maps keyed by feature iterate
/// the same way on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Sentiment,
    Entities,
    KeyPhrases,
    Syntax,
    Language,
    Pii,
    TargetedSentiment,
}

impl Feature {
    /// Every feature, in display order.
    pub const ALL: [Feature; 7] = [
        Feature::Sentiment,
        Feature::Entities,
        Feature::KeyPhrases,
        Feature::Syntax,
        Feature::Language,
        Feature::Pii,
        Feature::TargetedSentiment,
    ];

    /// Stable snake_case name used in config, JSON and logs.
    ///
    /// Names come from [`ALL_FEATURES`], which lists them in declaration order.
    pub const fn as_str(self) -> &'static str {
        ALL_FEATURES[self as usize]
    }

    /// Whether the provider call takes a language code.
    pub const fn uses_language_hint(self) -> bool {
        !matches!(self, Feature::Language)
    }
}

const _: () = assert!(ALL_FEATURES.len() == Feature::ALL.len());

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature name that does not match any [`Feature`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// The set of features enabled for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    /// Every feature enabled.
    pub fn all() -> Self {
        Feature::ALL.into_iter().collect()
    }

    /// No feature enabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse feature names, rejecting the first unknown one.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownFeature> {
        names.iter().map(|n| n.as_ref().parse::<Feature>()).collect()
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Overall sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Mixed => "MIXED",
        }
    }
}

/// Confidence scores for each sentiment label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

impl SentimentScores {
    /// Score for one label.
    pub const fn for_label(&self, label: SentimentLabel) -> f64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Mixed => self.mixed,
        }
    }
}

/// Label plus scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
}

/// A named entity found in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub score: f64,
    pub begin_offset: u32,
    pub end_offset: u32,
}

/// A key phrase found in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPhrase {
    pub text: String,
    pub score: f64,
    pub begin_offset: u32,
    pub end_offset: u32,
}

impl KeyPhrase {
    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// One token with its part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxToken {
    pub token_id: u32,
    pub text: String,
    pub begin_offset: u32,
    pub end_offset: u32,
    /// Universal POS tag (NOUN, VERB, PRON, ...)
    pub tag: String,
    pub tag_score: f64,
}

/// A candidate dominant language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub language_code: String,
    pub score: f64,
}

/// A span of personally identifiable information. Offsets only; the text
/// itself is never copied out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub score: f64,
    pub begin_offset: u32,
    pub end_offset: u32,
}

/// One mention of a targeted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    #[serde(rename = "type")]
    pub mention_type: String,
    pub score: f64,
    pub group_score: f64,
    pub sentiment: Sentiment,
    pub begin_offset: u32,
    pub end_offset: u32,
}

/// An entity with the sentiment expressed toward each of its mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetedEntity {
    /// Indices into `mentions` of the most descriptive mentions
    pub descriptive_mention_index: Vec<usize>,
    pub mentions: Vec<Mention>,
}

/// Feature-specific successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePayload {
    Sentiment(Sentiment),
    Entities(Vec<Entity>),
    KeyPhrases(Vec<KeyPhrase>),
    Syntax(Vec<SyntaxToken>),
    Language(Vec<DetectedLanguage>),
    Pii(Vec<PiiEntity>),
    TargetedSentiment(Vec<TargetedEntity>),
}

impl FeaturePayload {
    /// The feature this payload answers.
    pub const fn feature(&self) -> Feature {
        match self {
            FeaturePayload::Sentiment(_) => Feature::Sentiment,
            FeaturePayload::Entities(_) => Feature::Entities,
            FeaturePayload::KeyPhrases(_) => Feature::KeyPhrases,
            FeaturePayload::Syntax(_) => Feature::Syntax,
            FeaturePayload::Language(_) => Feature::Language,
            FeaturePayload::Pii(_) => Feature::Pii,
            FeaturePayload::TargetedSentiment(_) => Feature::TargetedSentiment,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why one feature call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureError {
    #[error("request failed: {message}")]
    Transport { message: String },

    #[error("throttled by provider: {message}")]
    Throttled { message: String },

    #[error("unsupported language: {message}")]
    UnsupportedLanguage { message: String },

    #[error("provider error {code} (HTTP {status}): {message}")]
    Service {
        code: String,
        status: u16,
        message: String,
    },

    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("analysis task aborted: {message}")]
    TaskAborted { message: String },
}

/// Outcome of invoking one feature for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum FeatureResult {
    Success(FeaturePayload),
    Failure(FeatureError),
}

impl FeatureResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FeatureResult::Success(_))
    }

    pub fn payload(&self) -> Option<&FeaturePayload> {
        match self {
            FeatureResult::Success(payload) => Some(payload),
            FeatureResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FeatureError> {
        match self {
            FeatureResult::Success(_) => None,
            FeatureResult::Failure(err) => Some(err),
        }
    }
}

impl From<Result<FeaturePayload, FeatureError>> for FeatureResult {
    fn from(result: Result<FeaturePayload, FeatureError>) -> Self {
        match result {
            Ok(payload) => FeatureResult::Success(payload),
            Err(err) => FeatureResult::Failure(err),
        }
    }
}

// ============================================================================
// Aggregated result
// ============================================================================

/// Complete output of one analysis request.
///
/// Holds exactly one entry per enabled feature. Built once by
/// [`AggregatedResult::assemble`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    results: BTreeMap<Feature, FeatureResult>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    categories: Option<CategorySummary>,
}

impl AggregatedResult {
    /// Assemble the result and derive the category summary from `results`.
    pub fn assemble(results: BTreeMap<Feature, FeatureResult>) -> Self {
        let categories = CategorySummary::derive(&results);
        Self {
            results,
            categories,
        }
    }

    pub fn results(&self) -> &BTreeMap<Feature, FeatureResult> {
        &self.results
    }

    pub fn get(&self, feature: Feature) -> Option<&FeatureResult> {
        self.results.get(&feature)
    }

    pub fn categories(&self) -> Option<&CategorySummary> {
        self.categories.as_ref()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Failed features with their reasons, in feature order.
    pub fn failures(&self) -> impl Iterator<Item = (Feature, &FeatureError)> + '_ {
        self.results
            .iter()
            .filter_map(|(feature, outcome)| outcome.error().map(|e| (*feature, e)))
    }

    fn payload(&self, feature: Feature) -> Option<&FeaturePayload> {
        self.results.get(&feature).and_then(FeatureResult::payload)
    }

    pub fn sentiment(&self) -> Option<&Sentiment> {
        match self.payload(Feature::Sentiment)? {
            FeaturePayload::Sentiment(s) => Some(s),
            _ => None,
        }
    }

    pub fn entities(&self) -> Option<&[Entity]> {
        match self.payload(Feature::Entities)? {
            FeaturePayload::Entities(e) => Some(e),
            _ => None,
        }
    }

    pub fn key_phrases(&self) -> Option<&[KeyPhrase]> {
        match self.payload(Feature::KeyPhrases)? {
            FeaturePayload::KeyPhrases(k) => Some(k),
            _ => None,
        }
    }

    pub fn syntax_tokens(&self) -> Option<&[SyntaxToken]> {
        match self.payload(Feature::Syntax)? {
            FeaturePayload::Syntax(t) => Some(t),
            _ => None,
        }
    }

    pub fn languages(&self) -> Option<&[DetectedLanguage]> {
        match self.payload(Feature::Language)? {
            FeaturePayload::Language(l) => Some(l),
            _ => None,
        }
    }

    pub fn pii_entities(&self) -> Option<&[PiiEntity]> {
        match self.payload(Feature::Pii)? {
            FeaturePayload::Pii(p) => Some(p),
            _ => None,
        }
    }

    pub fn targeted_sentiment(&self) -> Option<&[TargetedEntity]> {
        match self.payload(Feature::TargetedSentiment)? {
            FeaturePayload::TargetedSentiment(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
        assert_eq!(
            "classification".parse::<Feature>(),
            Err(UnknownFeature("classification".into()))
        );
    }

    #[test]
    fn test_feature_names_follow_serde_names() {
        for feature in Feature::ALL {
            let json = serde_json::to_value(feature).unwrap();
            assert_eq!(json, feature.as_str());
            assert_eq!(feature.as_str().parse::<Feature>(), Ok(feature));
        }
    }

    #[test]
    fn test_feature_serde_name() {
        let json = serde_json::to_string(&Feature::TargetedSentiment).unwrap();
        assert_eq!(json, "\"targeted_sentiment\"");
    }

    #[test]
    fn test_feature_set_from_names() {
        let set = FeatureSet::from_names(&["sentiment", "key_phrases", "sentiment"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Feature::Sentiment));
        assert!(set.contains(Feature::KeyPhrases));
        assert!(FeatureSet::from_names(&["sentiment", "topics"]).is_err());
        assert_eq!(FeatureSet::all().len(), 7);
        assert!(FeatureSet::none().is_empty());
    }

    #[test]
    fn test_language_takes_no_hint() {
        assert!(!Feature::Language.uses_language_hint());
        assert!(Feature::Syntax.uses_language_hint());
    }

    #[test]
    fn test_key_phrase_word_count() {
        let phrase = KeyPhrase {
            text: "  the new   phone ".into(),
            score: 0.9,
            begin_offset: 0,
            end_offset: 13,
        };
        assert_eq!(phrase.word_count(), 3);
    }

    #[test]
    fn test_feature_result_serialization_shape() {
        let failure = FeatureResult::Failure(FeatureError::Throttled {
            message: "slow down".into(),
        });
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["result"]["kind"], "throttled");

        let success = FeatureResult::Success(FeaturePayload::Language(vec![DetectedLanguage {
            language_code: "en".into(),
            score: 0.99,
        }]));
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["result"]["language"][0]["language_code"], "en");
    }

    #[test]
    fn test_aggregated_result_accessors() {
        let mut results = BTreeMap::new();
        results.insert(
            Feature::Sentiment,
            FeatureResult::Success(FeaturePayload::Sentiment(Sentiment {
                label: SentimentLabel::Mixed,
                scores: SentimentScores {
                    mixed: 0.7,
                    ..Default::default()
                },
            })),
        );
        results.insert(
            Feature::Entities,
            FeatureResult::Failure(FeatureError::Transport {
                message: "connection reset".into(),
            }),
        );

        let aggregated = AggregatedResult::assemble(results);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(
            aggregated.sentiment().map(|s| s.label),
            Some(SentimentLabel::Mixed)
        );
        assert!(aggregated.entities().is_none());
        assert!(aggregated.key_phrases().is_none());

        let failures: Vec<Feature> = aggregated.failures().map(|(f, _)| f).collect();
        assert_eq!(failures, vec![Feature::Entities]);
    }

    #[test]
    fn test_scores_for_label() {
        let scores = SentimentScores {
            positive: 0.1,
            negative: 0.2,
            neutral: 0.3,
            mixed: 0.4,
        };
        assert_eq!(scores.for_label(SentimentLabel::Neutral), 0.3);
        assert_eq!(scores.for_label(SentimentLabel::Mixed), 0.4);
    }
}
