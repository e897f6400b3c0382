//! Provider adapter for the text analysis service.
//!
//! [`Analyzer`] is the seam between the aggregator and the outside world:
//! one call per feature, every failure folded into the returned
//! [`FeatureResult`]. [`ComprehendAnalyzer`] implements it against the
//! Amazon Comprehend synchronous APIs; tests substitute fakes.

mod comprehend;
mod credentials;
mod signing;

pub use comprehend::{operation_name, ComprehendAnalyzer, TARGET_PREFIX};
pub use credentials::Credentials;
pub use signing::{amz_date, authorization_header, signing_key, SigningError, SigningInput};

use async_trait::async_trait;

use crate::model::{Feature, FeatureResult};

// ============================================================================
// Analyzer Trait
// ============================================================================

/// Unified interface for text analysis providers.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Run one feature over `text`.
    ///
    /// `text` is expected to already satisfy the configured character
    /// limit. Implementations never panic or error out of this call;
    /// failures come back as [`FeatureResult::Failure`].
    async fn invoke(&self, feature: Feature, text: &str, language_hint: &str) -> FeatureResult;
}
