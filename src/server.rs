//! Router, shared state and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::SenseiConfig;
use crate::gateway::{Gateway, Gateways};
use crate::handlers;
use crate::scorer::Scorer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Immutable state shared by every request.
pub struct AppState {
    pub scorer: Scorer,
    pub gateways: Gateways,
    pub config: SenseiConfig,
}

impl AppState {
    pub fn new(scorer: Scorer, gateways: Gateways, config: SenseiConfig) -> Self {
        Self {
            scorer,
            gateways,
            config,
        }
    }

    /// Build the scorer and provider chains described by `config`.
    pub fn from_config(config: SenseiConfig) -> Result<Self> {
        let scorer = Scorer::with_disabled_rules(&config.rules.disabled);

        let gateways = if config.ai.enabled {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .context("building HTTP client")?;
            if config.ai.token.is_none() {
                warn!(
                    env = %config.ai.token_env,
                    "No AI token configured; reports will use heuristic fallbacks"
                );
            }
            let token = config.ai.token.as_deref();
            let acceptance = config.ai.acceptance();
            let chains = &config.gateway;
            Gateways {
                review: Gateway::from_chain(&client, &chains.review, token, acceptance.clone()),
                bugs: Gateway::from_chain(&client, &chains.bugs, token, acceptance.clone()),
                optimize: Gateway::from_chain(&client, &chains.optimize, token, acceptance.clone()),
                learn: Gateway::from_chain(&client, &chains.learn, token, acceptance),
            }
        } else {
            info!("AI disabled; all reports use heuristic fallbacks");
            Gateways::disabled()
        };

        Ok(Self::new(scorer, gateways, config))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "API is running",
    })
}

/// Create the main router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/review", post(handlers::review::review))
        .route("/api/bugtest", post(handlers::bugs::bugtest))
        .route("/api/optimize", post(handlers::optimize::optimize))
        .route("/api/learn", post(handlers::learn::learn))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origin.trim() == "*" {
        return layer.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin, "Invalid CORS origin; cross-origin requests will be refused");
            layer
        }
    }
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: SenseiConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_ai() {
        let mut config = SenseiConfig::default();
        config.ai.enabled = false;
        let state = AppState::from_config(config).unwrap();
        assert!(state.gateways.bugs.provider_ids().is_empty());
    }

    #[test]
    fn test_from_config_builds_chains() {
        let state = AppState::from_config(SenseiConfig::default()).unwrap();
        assert_eq!(
            state.gateways.bugs.provider_ids(),
            vec!["codebert-base", "codeparrot", "gpt2", "blenderbot-400M-distill"]
        );
        assert_eq!(
            state.gateways.optimize.provider_ids(),
            vec!["codereviewer-base", "codeparrot"]
        );
    }
}
