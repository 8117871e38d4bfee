//! HTTP server: shared context, router assembly, and startup.

use crate::config::Config;
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use reelgate_av::{RenditionCache, ToolRegistry};
use reelgate_common::PathMapping;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Encoder executables, discovered once at startup
    pub tools: Arc<ToolRegistry>,
    /// Disk-backed rendition cache
    pub renditions: RenditionCache,
    /// Allow-listed library roots, derived from storage config
    pub allowed_roots: Arc<Vec<PathBuf>>,
    /// Virtual-prefix remaps, derived from storage config
    pub mappings: Arc<Vec<PathMapping>>,
}

impl AppContext {
    /// Build the context from a loaded config and a discovered tool registry.
    pub fn new(config: Config, tools: ToolRegistry) -> Self {
        let allowed_roots = config.storage.allowed_roots();
        let mappings = config.storage.mappings();
        let renditions = RenditionCache::new(config.transcoding.cache_dir.clone());

        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            renditions,
            allowed_roots: Arc::new(allowed_roots),
            mappings: Arc::new(mappings),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::RANGE]);

    // Auth routes (always available, even when auth is disabled)
    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::auth_status));

    // Streaming routes require a verified identity
    let protected_routes = streaming::routes().layer(middleware::from_fn_with_state(
        ctx.clone(),
        auth::auth_middleware,
    ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", auth_routes.merge(protected_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Start the HTTP server and block until shutdown
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let tools = ToolRegistry::discover(&config.transcoding.tool_paths());
    match tools.require("ffmpeg") {
        Ok(ffmpeg) => tracing::info!("Encoder found at {}", ffmpeg.path.display()),
        Err(_) => tracing::warn!(
            "No encoder found; quality selection will fall back to direct streaming"
        ),
    }

    let ctx = AppContext::new(config, tools);

    tokio::fs::create_dir_all(ctx.renditions.root())
        .await
        .with_context(|| {
            format!(
                "Failed to create rendition cache directory {:?}",
                ctx.renditions.root()
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down...");
}
