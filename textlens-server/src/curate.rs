//! Display curation.
//!
//! Projects an [`AggregatedResult`] into the flat, capped structure the
//! result page renders. Scores are rounded to four decimals.

use serde::Serialize;
use std::collections::BTreeMap;

use textlens_common::config::DisplayConfig;
use textlens_common::util::round_to;

use crate::categories::KeyPhraseBuckets;
use crate::model::{AggregatedResult, Feature};

const SCORE_PLACES: u32 = 4;

fn score(value: f64) -> f64 {
    round_to(value, SCORE_PLACES)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentView {
    pub overall: &'static str,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRow {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageRow {
    pub lang: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiiRow {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub score: f64,
    pub begin: u32,
    pub end: u32,
}

/// One targeted-sentiment mention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetedRow {
    pub text: String,
    #[serde(rename = "type")]
    pub mention_type: String,
    pub sentiment: &'static str,
    /// Score of the mention's own sentiment label
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRow {
    pub feature: &'static str,
    pub message: String,
}

/// Page-ready view of one analysis.
///
/// `None` sections were not requested or did not succeed; the reason for
/// the latter is in `failures`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedView {
    pub sentiment: Option<SentimentView>,
    pub entities: Option<Vec<EntityRow>>,
    pub key_phrases: Option<Vec<String>>,
    pub languages: Option<Vec<LanguageRow>>,
    pub pii: Option<Vec<PiiRow>>,
    pub targeted: Option<Vec<TargetedRow>>,
    pub entity_type_counts: Option<Vec<CountRow>>,
    pub key_phrase_length_buckets: Option<KeyPhraseBuckets>,
    pub pos_top: Option<Vec<CountRow>>,
    pub failures: Vec<FailureRow>,
}

impl CuratedView {
    pub fn from_result(result: &AggregatedResult, display: &DisplayConfig) -> Self {
        let sentiment = result.sentiment().map(|s| SentimentView {
            overall: s.label.as_str(),
            positive: score(s.scores.positive),
            negative: score(s.scores.negative),
            neutral: score(s.scores.neutral),
            mixed: score(s.scores.mixed),
        });

        let entities = result.entities().map(|entities| {
            entities
                .iter()
                .take(display.max_entities)
                .map(|e| EntityRow {
                    text: e.text.clone(),
                    entity_type: e.entity_type.clone(),
                    score: score(e.score),
                })
                .collect()
        });

        let key_phrases = result.key_phrases().map(|phrases| {
            phrases
                .iter()
                .take(display.max_key_phrases)
                .map(|k| k.text.clone())
                .collect()
        });

        let languages = result.languages().map(|languages| {
            languages
                .iter()
                .map(|l| LanguageRow {
                    lang: l.language_code.clone(),
                    score: score(l.score),
                })
                .collect()
        });

        let pii = result.pii_entities().map(|spans| {
            spans
                .iter()
                .take(display.max_pii)
                .map(|p| PiiRow {
                    entity_type: p.entity_type.clone(),
                    score: score(p.score),
                    begin: p.begin_offset,
                    end: p.end_offset,
                })
                .collect()
        });

        let targeted = result.targeted_sentiment().map(|entities| {
            entities
                .iter()
                .flat_map(|entity| entity.mentions.iter())
                .take(display.max_targeted)
                .map(|m| TargetedRow {
                    text: m.text.clone(),
                    mention_type: m.mention_type.clone(),
                    sentiment: m.sentiment.label.as_str(),
                    confidence: score(m.sentiment.scores.for_label(m.sentiment.label)),
                })
                .collect()
        });

        let categories = result.categories();
        let entity_type_counts = categories
            .and_then(|c| c.entity_type_counts.as_ref())
            .map(|counts| {
                counts
                    .iter()
                    .map(|(name, count)| CountRow {
                        name: name.clone(),
                        count: *count,
                    })
                    .collect()
            });
        let key_phrase_length_buckets = categories.and_then(|c| c.key_phrase_length_buckets);
        let pos_top = categories
            .and_then(|c| c.part_of_speech_counts.as_ref())
            .map(|counts| top_counts(counts, display.top_pos));

        let failures = result
            .failures()
            .map(|(feature, reason)| FailureRow {
                feature: feature_title(feature),
                message: reason.to_string(),
            })
            .collect();

        Self {
            sentiment,
            entities,
            key_phrases,
            languages,
            pii,
            targeted,
            entity_type_counts,
            key_phrase_length_buckets,
            pos_top,
            failures,
        }
    }
}

/// The `limit` largest counts, descending; equal counts by name.
pub fn top_counts(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = counts
        .iter()
        .map(|(name, count)| CountRow {
            name: name.clone(),
            count: *count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(limit);
    rows
}

/// Human-readable section name.
pub const fn feature_title(feature: Feature) -> &'static str {
    match feature {
        Feature::Sentiment => "Sentiment",
        Feature::Entities => "Entities",
        Feature::KeyPhrases => "Key phrases",
        Feature::Syntax => "Syntax",
        Feature::Language => "Dominant language",
        Feature::Pii => "PII",
        Feature::TargetedSentiment => "Targeted sentiment",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Entity, FeatureError, FeaturePayload, FeatureResult, KeyPhrase, Mention, Sentiment,
        SentimentLabel, SentimentScores, SyntaxToken, TargetedEntity,
    };

    fn entity(i: usize) -> Entity {
        Entity {
            text: format!("entity {}", i),
            entity_type: if i % 2 == 0 { "PERSON" } else { "DATE" }.into(),
            score: 0.987654321,
            begin_offset: 0,
            end_offset: 1,
        }
    }

    fn token(tag: &str) -> SyntaxToken {
        SyntaxToken {
            token_id: 1,
            text: "x".into(),
            begin_offset: 0,
            end_offset: 1,
            tag: tag.into(),
            tag_score: 0.9,
        }
    }

    fn assemble(entries: Vec<(Feature, FeatureResult)>) -> AggregatedResult {
        AggregatedResult::assemble(entries.into_iter().collect())
    }

    #[test]
    fn test_entities_capped_and_rounded() {
        let result = assemble(vec![(
            Feature::Entities,
            FeatureResult::Success(FeaturePayload::Entities((0..80).map(entity).collect())),
        )]);
        let view = CuratedView::from_result(&result, &DisplayConfig::default());

        let rows = view.entities.unwrap();
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].score, 0.9877);

        // Counts are taken from every entity, not the capped list.
        let counts = view.entity_type_counts.unwrap();
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 80);
    }

    #[test]
    fn test_key_phrase_cap() {
        let phrases = (0..40)
            .map(|i| KeyPhrase {
                text: format!("phrase {}", i),
                score: 0.5,
                begin_offset: 0,
                end_offset: 1,
            })
            .collect();
        let result = assemble(vec![(
            Feature::KeyPhrases,
            FeatureResult::Success(FeaturePayload::KeyPhrases(phrases)),
        )]);
        let display = DisplayConfig {
            max_key_phrases: 5,
            ..Default::default()
        };
        let view = CuratedView::from_result(&result, &display);
        assert_eq!(
            view.key_phrases.unwrap(),
            vec!["phrase 0", "phrase 1", "phrase 2", "phrase 3", "phrase 4"]
        );
        assert_eq!(view.key_phrase_length_buckets.unwrap().short, 40);
    }

    #[test]
    fn test_top_pos_order_and_limit() {
        let mut tokens = Vec::new();
        for (tag, n) in [("NOUN", 4), ("ADJ", 2), ("VERB", 2), ("PRON", 3), ("DET", 1)] {
            tokens.extend(std::iter::repeat_with(|| token(tag)).take(n));
        }
        let result = assemble(vec![(
            Feature::Syntax,
            FeatureResult::Success(FeaturePayload::Syntax(tokens)),
        )]);
        let display = DisplayConfig {
            top_pos: 4,
            ..Default::default()
        };
        let view = CuratedView::from_result(&result, &display);
        let names: Vec<String> = view.pos_top.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["NOUN", "PRON", "ADJ", "VERB"]);
    }

    #[test]
    fn test_targeted_confidence_uses_own_label() {
        let mention = Mention {
            text: "battery life".into(),
            mention_type: "ATTRIBUTE".into(),
            score: 0.99,
            group_score: 1.0,
            sentiment: Sentiment {
                label: SentimentLabel::Negative,
                scores: SentimentScores {
                    positive: 0.01,
                    negative: 0.97654,
                    neutral: 0.01346,
                    mixed: 0.0,
                },
            },
            begin_offset: 50,
            end_offset: 62,
        };
        let result = assemble(vec![(
            Feature::TargetedSentiment,
            FeatureResult::Success(FeaturePayload::TargetedSentiment(vec![TargetedEntity {
                descriptive_mention_index: vec![0],
                mentions: vec![mention],
            }])),
        )]);
        let view = CuratedView::from_result(&result, &DisplayConfig::default());
        let rows = view.targeted.unwrap();
        assert_eq!(rows[0].sentiment, "NEGATIVE");
        assert_eq!(rows[0].confidence, 0.9765);
    }

    #[test]
    fn test_failures_listed_and_sections_absent() {
        let result = assemble(vec![
            (
                Feature::Pii,
                FeatureResult::Failure(FeatureError::UnsupportedLanguage {
                    message: "fr".into(),
                }),
            ),
            (
                Feature::Sentiment,
                FeatureResult::Success(FeaturePayload::Sentiment(Sentiment {
                    label: SentimentLabel::Positive,
                    scores: SentimentScores {
                        positive: 0.99999,
                        ..Default::default()
                    },
                })),
            ),
        ]);
        let view = CuratedView::from_result(&result, &DisplayConfig::default());

        assert!(view.pii.is_none());
        assert!(view.entities.is_none());
        assert!(view.pos_top.is_none());
        assert_eq!(view.sentiment.as_ref().unwrap().overall, "POSITIVE");
        assert_eq!(view.sentiment.unwrap().positive, 1.0);
        assert_eq!(view.failures.len(), 1);
        assert_eq!(view.failures[0].feature, "PII");
        assert!(view.failures[0].message.contains("unsupported language"));
    }
}
