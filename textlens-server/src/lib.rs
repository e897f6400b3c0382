//! textlens server - text analysis over Amazon Comprehend.
//!
//! This crate provides:
//! - The provider adapter ([`Analyzer`], [`ComprehendAnalyzer`])
//! - Concurrent per-feature fan-out and result aggregation
//! - The derived category summary
//! - Display curation and HTML rendering
//! - HTTP routes for the form page, the JSON API and health checks
//!
//! ## Architecture
//!
//! ```text
//! Client → routes → Aggregator ─┬→ Analyzer (sentiment)
//!                               ├→ Analyzer (entities)
//!                               └→ ...        ↓ join
//!                      CategorySummary::derive → AggregatedResult
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod aggregate;
pub mod categories;
pub mod curate;
pub mod model;
pub mod provider;
pub mod render;
pub mod routes;

pub use aggregate::{Aggregator, AnalysisRequest, ValidationError};
pub use categories::{CategorySummary, KeyPhraseBuckets};
pub use curate::CuratedView;
pub use model::{
    AggregatedResult, Feature, FeatureError, FeaturePayload, FeatureResult, FeatureSet,
};
pub use provider::{Analyzer, ComprehendAnalyzer, Credentials};
pub use render::{IndexPage, PageRenderer};
pub use routes::AppState;

use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use textlens_common::config::Config;
use textlens_common::{Error, Result};

impl AppState {
    /// Assemble state around an existing analyzer.
    pub fn new(analyzer: Arc<dyn Analyzer>, config: &Config) -> Result<Self> {
        let features = FeatureSet::from_names(&config.analysis.features)
            .map_err(|e| Error::Config(e.to_string()))?;
        let aggregator = Aggregator::new(
            analyzer,
            config.analysis.char_limit,
            &config.analysis.language_code,
        );

        Ok(Self {
            aggregator,
            renderer: Arc::new(PageRenderer::new()?),
            features,
            display: Arc::new(config.display.clone()),
        })
    }

    /// Resolve credentials and build state backed by Amazon Comprehend.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_config_with(config, |key| std::env::var(key).ok())
    }

    /// [`AppState::from_config`] with an explicit environment accessor.
    pub fn from_config_with<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve_with(config.comprehend.profile.as_deref(), lookup)
            .map_err(|e| e.with_context("resolving AWS credentials"))?;
        let analyzer = ComprehendAnalyzer::from_config(&config.comprehend, credentials)
            .map_err(|e| e.with_context("building Comprehend client"))?;
        tracing::info!(
            region = analyzer.region(),
            endpoint = %analyzer.endpoint(),
            "Comprehend analyzer ready"
        );
        Self::new(Arc::new(analyzer), config)
    }
}

/// Build the router with all routes and middleware.
///
/// The body limit is [`Config::effective_body_limit`], which always admits
/// text up to the configured character limit.
pub fn build_router(state: AppState, config: &Config) -> Router {
    routes::build_routes(state)
        .layer(RequestBodyLimitLayer::new(config.effective_body_limit()))
        .layer(TraceLayer::new_for_http())
}

/// Start the server and run until Ctrl-C.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let router = build_router(state, config);

    let addr = config.bind_address();
    tracing::info!("Starting textlens server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
