//! Land-Use Compliance API Server
//!
//! Serves the map front-end: boundaries are submitted here and the analysis
//! state is read back or streamed as server-sent events.

mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use lu_client::RemoteAnalysisClient;
use lu_core::{AnalysisBackend, Orchestrator, OrchestratorConfig, ServiceConfig};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: AppConfig,
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub service: ServiceConfig,
}

impl AppConfig {
    pub fn from_env() -> lu_core::CoreResult<Self> {
        Ok(Self {
            bind_addr: std::env::var("LANDUSE_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            service: ServiceConfig::from_env()?,
        })
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(routes::health_check))
        .route("/api/config", get(routes::get_config))

        // Analysis
        .route("/api/analysis", post(routes::analysis::submit))
        .route("/api/analysis", get(routes::analysis::current))
        .route("/api/analysis/events", get(routes::analysis::events))

        // CORS
        .layer(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any))

        // Tracing
        .layer(TraceLayer::new_for_http())

        // State
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "lu_api=debug,lu_core=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Land-Use Compliance API Server");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let client = RemoteAnalysisClient::new(config.service.clone())
        .expect("Failed to create analysis service client");
    info!("Analysis services at {}", config.service.base_url);

    let backend: Arc<dyn AnalysisBackend> = Arc::new(client);
    let orchestrator = Orchestrator::new(backend, OrchestratorConfig::from(&config.service));

    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        orchestrator,
        config,
    });

    // Start server
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app(state))
        .await
        .expect("Server error");
}
