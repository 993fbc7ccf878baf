use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use inkgrade::api::{router, ApiContext};
use inkgrade::config::{self, GraderConfig};
use inkgrade::grading::GeminiClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = GraderConfig::from_env()?;
    let client = Arc::new(GeminiClient::from_config(&config)?);
    let ctx = ApiContext::new(client, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, model = %config.model, "Grading API listening");

    axum::serve(listener, router(ctx)).await?;
    Ok(())
}
