mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod prompt_config;
mod records;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::coordinator::{GenerationCoordinator, GenerationSettings};
use crate::llm_client::LlmClient;
use crate::prompt_config::store::ConfigStore;
use crate::prompt_config::tokens::WordTokenEstimator;
use crate::records::schema::Schema;
use crate::records::store::RecordStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Letter API v{}", env!("CARGO_PKG_VERSION"));

    // Record schema: a custom file when configured, otherwise the built-in one
    let schema = match &config.schema_path {
        Some(path) => Schema::from_path(path)?,
        None => Schema::record_schema(),
    };

    let records = RecordStore::load(&config.records_path, schema)
        .with_context(|| format!("loading records from {}", config.records_path.display()))?;
    if records.is_empty() {
        info!("Record store is empty; add entries via POST /api/v1/records");
    } else {
        info!("Record store ready: {} records", records.len());
    }

    let configs = ConfigStore::load(
        &config.prompt_config_path,
        config.prompt_config_name.as_deref(),
        Arc::new(WordTokenEstimator),
    )
    .with_context(|| {
        format!(
            "loading prompt config from {}",
            config.prompt_config_path.display()
        )
    })?;

    // Initialize LLM client; the environment key wins over the stored one
    let settings = GenerationSettings {
        request_timeout: Duration::from_secs(config.generation_timeout_secs),
        ..Default::default()
    };
    let api_key = config
        .openai_api_key
        .clone()
        .unwrap_or_else(|| configs.key().to_string());
    let mut llm = LlmClient::new(api_key, settings.request_timeout)?;
    if let Some(endpoint) = &config.openai_endpoint {
        llm = llm.with_endpoint(endpoint.as_str());
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let records = Arc::new(Mutex::new(records));
    let configs = Arc::new(Mutex::new(configs));
    let coordinator =
        GenerationCoordinator::new(Arc::new(llm), records.clone(), configs.clone(), settings);

    let state = AppState {
        records,
        configs,
        coordinator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
