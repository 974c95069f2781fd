mod advice;
mod config;
mod errors;
mod llm_client;
mod routes;
mod search;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{GeminiClient, TextGenerator};
use crate::routes::build_router;
use crate::search::{SearchProvider, TavilyClient};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tax Assistant API v{}", env!("CARGO_PKG_VERSION"));

    // Missing credentials degrade the affected features; they never stop startup.
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; advice endpoints will return placeholder responses");
    }
    if config.tavily_api_key.is_none() {
        warn!("TAVILY_API_KEY is not set; questions will be answered without live search");
    }

    // Initialize the generation client
    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(&config));
    info!(
        "Generation client initialized (model: {})",
        config.gemini_model
    );

    // Initialize the search client when credentials allow
    let search: Option<Arc<dyn SearchProvider>> =
        TavilyClient::from_config(&config).map(|client| Arc::new(client) as Arc<dyn SearchProvider>);
    if search.is_some() {
        info!("Search client initialized");
    }

    let cors = cors_layer(&config)?;

    // Build app state
    let state = AppState {
        generator,
        search,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS for the single configured frontend origin, with credentials.
/// Credentialed CORS cannot use wildcards, so methods and headers mirror
/// the request instead.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origin: HeaderValue = config.allowed_origin.parse().with_context(|| {
        format!(
            "ALLOWED_ORIGIN '{}' is not a valid origin",
            config.allowed_origin
        )
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
