//! Derived "categories" view.
//!
//! The provider's classification APIs need custom models and asynchronous
//! jobs, so categories are approximated locally from results already in
//! hand: entity types, key-phrase lengths and part-of-speech tags.
//! Derivation makes no provider calls and depends only on its input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Entity, Feature, FeaturePayload, FeatureResult, KeyPhrase, SyntaxToken};

/// Upper word count of a short key phrase.
pub const SHORT_PHRASE_MAX_WORDS: usize = 2;
/// Upper word count of a medium key phrase.
pub const MEDIUM_PHRASE_MAX_WORDS: usize = 5;

/// Length class of a key phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBucket {
    /// Up to two words
    Short,
    /// Three to five words
    Medium,
    /// Six words or more
    Long,
}

impl LengthBucket {
    pub const fn for_word_count(words: usize) -> Self {
        if words <= SHORT_PHRASE_MAX_WORDS {
            LengthBucket::Short
        } else if words <= MEDIUM_PHRASE_MAX_WORDS {
            LengthBucket::Medium
        } else {
            LengthBucket::Long
        }
    }
}

/// Key phrase counts per length bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPhraseBuckets {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

impl KeyPhraseBuckets {
    pub fn from_phrases(phrases: &[KeyPhrase]) -> Self {
        let mut buckets = Self::default();
        for phrase in phrases {
            match LengthBucket::for_word_count(phrase.word_count()) {
                LengthBucket::Short => buckets.short += 1,
                LengthBucket::Medium => buckets.medium += 1,
                LengthBucket::Long => buckets.long += 1,
            }
        }
        buckets
    }

    pub const fn total(&self) -> usize {
        self.short + self.medium + self.long
    }
}

/// Client-side category summary.
///
/// Each part is present only when the feature it is computed from
/// succeeded. A part derived from an empty successful result is present
/// and empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entity_type_counts: Option<BTreeMap<String, usize>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key_phrase_length_buckets: Option<KeyPhraseBuckets>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub part_of_speech_counts: Option<BTreeMap<String, usize>>,
}

impl CategorySummary {
    /// Derive the summary from collected feature outcomes.
    ///
    /// Returns `None` when none of entities, key phrases or syntax succeeded.
    pub fn derive(results: &BTreeMap<Feature, FeatureResult>) -> Option<Self> {
        let entity_type_counts = match payload(results, Feature::Entities) {
            Some(FeaturePayload::Entities(entities)) => Some(entity_type_counts(entities)),
            _ => None,
        };
        let key_phrase_length_buckets = match payload(results, Feature::KeyPhrases) {
            Some(FeaturePayload::KeyPhrases(phrases)) => Some(KeyPhraseBuckets::from_phrases(phrases)),
            _ => None,
        };
        let part_of_speech_counts = match payload(results, Feature::Syntax) {
            Some(FeaturePayload::Syntax(tokens)) => Some(part_of_speech_counts(tokens)),
            _ => None,
        };

        if entity_type_counts.is_none()
            && key_phrase_length_buckets.is_none()
            && part_of_speech_counts.is_none()
        {
            return None;
        }

        Some(Self {
            entity_type_counts,
            key_phrase_length_buckets,
            part_of_speech_counts,
        })
    }
}

fn payload(results: &BTreeMap<Feature, FeatureResult>, feature: Feature) -> Option<&FeaturePayload> {
    results.get(&feature).and_then(FeatureResult::payload)
}

/// Tally entity type strings.
pub fn entity_type_counts(entities: &[Entity]) -> BTreeMap<String, usize> {
    tally(entities.iter().map(|e| e.entity_type.as_str()))
}

/// Tally part-of-speech tags.
pub fn part_of_speech_counts(tokens: &[SyntaxToken]) -> BTreeMap<String, usize> {
    tally(tokens.iter().map(|t| t.tag.as_str()))
}

fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}
