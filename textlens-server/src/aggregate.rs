//! Result aggregation.
//!
//! One [`AnalysisRequest`] fans out into one provider call per enabled
//! feature. Calls run concurrently on a [`JoinSet`] and are all joined
//! before the category summary is derived, so derivation always sees the
//! complete set of outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::Instrument;

use textlens_common::util::{char_len, truncate_with_ellipsis};

use crate::model::{
    AggregatedResult, Feature, FeatureError, FeaturePayload, FeatureResult, FeatureSet,
};
use crate::provider::Analyzer;

/// Characters of submitted text shown at trace level.
const PREVIEW_CHARS: usize = 40;

/// Rejected analysis input. Raised before any provider call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text.")]
    Empty,

    #[error("Input exceeds {limit} character limit ({actual}).")]
    TooLong { limit: usize, actual: usize },
}

/// Validated text plus the features to run over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    text: String,
    features: FeatureSet,
}

impl AnalysisRequest {
    /// Validate `text` against `char_limit`, counted in Unicode scalar values.
    pub fn new(
        text: impl Into<String>,
        features: FeatureSet,
        char_limit: usize,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::Empty);
        }

        let actual = char_len(&text);
        if actual > char_limit {
            return Err(ValidationError::TooLong {
                limit: char_limit,
                actual,
            });
        }

        Ok(Self { text, features })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }
}

/// Fans requests out to an [`Analyzer`] and assembles the results.
#[derive(Clone)]
pub struct Aggregator {
    analyzer: Arc<dyn Analyzer>,
    char_limit: usize,
    language_hint: Arc<str>,
}

impl Aggregator {
    pub fn new(analyzer: Arc<dyn Analyzer>, char_limit: usize, language_hint: &str) -> Self {
        Self {
            analyzer,
            char_limit,
            language_hint: Arc::from(language_hint),
        }
    }

    pub fn char_limit(&self) -> usize {
        self.char_limit
    }

    pub fn language_hint(&self) -> &str {
        &self.language_hint
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    /// Validate `text` and run every feature in `features` over it.
    pub async fn analyze(
        &self,
        text: &str,
        features: &FeatureSet,
    ) -> Result<AggregatedResult, ValidationError> {
        let request = AnalysisRequest::new(text, features.clone(), self.char_limit)?;
        let trace_id = textlens_common::logging::generate_trace_id();
        let span = textlens_common::analysis_span!(
            trace_id,
            chars = char_len(request.text()),
            features = request.features().len()
        );
        Ok(self.run(&request).instrument(span).await)
    }

    /// Run an already validated request.
    pub async fn run(&self, request: &AnalysisRequest) -> AggregatedResult {
        let start = Instant::now();
        tracing::trace!(
            preview = %truncate_with_ellipsis(request.text(), PREVIEW_CHARS),
            "Starting analysis"
        );

        let text: Arc<str> = Arc::from(request.text());
        let mut join_set: JoinSet<(Feature, FeatureResult)> = JoinSet::new();

        for feature in request.features().iter() {
            let analyzer = Arc::clone(&self.analyzer);
            let text = Arc::clone(&text);
            let hint = Arc::clone(&self.language_hint);

            join_set.spawn(
                async move {
                    let outcome = analyzer.invoke(feature, &text, &hint).await;
                    (feature, outcome)
                }
                .in_current_span(),
            );
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((feature, outcome)) => {
                    let outcome = check_payload(feature, outcome);
                    log_outcome(feature, &outcome);
                    results.insert(feature, outcome);
                }
                Err(join_error) => {
                    // The feature is recovered below from the request's set.
                    tracing::error!(error = %join_error, "Analysis task did not complete");
                }
            }
        }

        for feature in request.features().iter() {
            results.entry(feature).or_insert_with(|| {
                let outcome = FeatureResult::Failure(FeatureError::TaskAborted {
                    message: format!("{} task panicked or was cancelled", feature),
                });
                log_outcome(feature, &outcome);
                outcome
            });
        }

        let aggregated = AggregatedResult::assemble(results);
        tracing::info!(
            features = aggregated.len(),
            failed = aggregated.failures().count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        aggregated
    }
}

/// Demote a success whose payload answers a different feature.
fn check_payload(feature: Feature, outcome: FeatureResult) -> FeatureResult {
    let answered = outcome.payload().map(FeaturePayload::feature);
    match answered {
        Some(actual) if actual != feature => {
            FeatureResult::Failure(FeatureError::MalformedResponse {
                message: format!("expected {} payload, got {}", feature, actual),
            })
        }
        _ => outcome,
    }
}

fn log_outcome(feature: Feature, outcome: &FeatureResult) {
    match outcome {
        FeatureResult::Success(_) => tracing::debug!(feature = %feature, "Feature succeeded"),
        FeatureResult::Failure(reason) => {
            tracing::warn!(feature = %feature, error = %reason, "Feature call failed")
        }
    }
}
