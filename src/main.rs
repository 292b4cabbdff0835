//! Option Chain Gateway Server
//!
//! REST gateway in front of the option chain, LTP calculator and Yahoo
//! Finance data sources.

use anyhow::Context;
use option_chain_gateway::api::{ApiDoc, create_router};
use option_chain_gateway::config::Config;
use option_chain_gateway::state::AppState;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path).with_context(|| format!("loading {}", path))?
        }
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_PATH);
            Config::load(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?
        }
        Err(_) => {
            info!("No configuration file, using defaults");
            Config::default()
        }
    };
    config.apply_env()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::from_config(config)?);

    info!("Starting Option Chain Gateway on {}", addr);
    info!("Swagger UI available at http://{}/swagger-ui/", addr);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start the server
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
