//! textlens server - Main entry point.

use anyhow::Result;
use textlens_common::config::Config;
use textlens_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (.env, config file, environment)
    let config = Config::load_and_validate()?;

    init_logging(&config.observability.log_level, &config.observability.log_format);

    tracing::info!("textlens server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        char_limit = config.analysis.char_limit,
        features = config.analysis.features.len(),
        "Analysis settings"
    );

    textlens_server::start_server(&config).await
}
