//! Router assembly and shared application state.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::config::{AppConfig, StorageBackend};
use crate::database::{
    DatabaseManager, ListingStore, MemoryListingStore, MemoryRequestStore, PgListingStore,
    PgRequestStore, RequestStore,
};
use crate::handlers::{protected, public};
use crate::middleware::require_auth;

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub listings: Arc<dyn ListingStore>,
    pub requests: Arc<dyn RequestStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        tokens: TokenService,
        listings: Arc<dyn ListingStore>,
        requests: Arc<dyn RequestStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            listings,
            requests,
        }
    }

    /// State backed by the in-process stores.
    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(&config)?;
        Ok(Self::new(
            config,
            tokens,
            Arc::new(MemoryListingStore::new()),
            Arc::new(MemoryRequestStore::new()),
        ))
    }

    /// State for the configured backend. Also returns the pool manager when
    /// PostgreSQL is in use so the caller can close it on shutdown.
    pub async fn from_config(
        config: AppConfig,
    ) -> anyhow::Result<(Self, Option<DatabaseManager>)> {
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok((Self::in_memory(config)?, None))
            }
            StorageBackend::Postgres => {
                let tokens = TokenService::from_config(&config)?;
                let db = DatabaseManager::connect(&config.database).await?;
                if config.database.run_migrations {
                    db.migrate().await?;
                }
                let state = Self::new(
                    config,
                    tokens,
                    Arc::new(PgListingStore::new(db.pool().clone())),
                    Arc::new(PgRequestStore::new(db.pool().clone())),
                );
                Ok((state, Some(db)))
            }
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(session_routes())
        .merge(public_routes())
        // Cookie-authenticated
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/jwt", post(public::issue_token))
        .route("/logout", post(public::logout))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/volunteer", get(public::list_volunteers))
        .route(
            "/volunteer/:id",
            get(public::get_volunteer).delete(public::delete_volunteer),
        )
        .route("/volunteer-needs", get(public::volunteer_needs))
        .route("/requests", get(public::list_requests))
        .route(
            "/requests/:id",
            get(public::get_request).delete(public::delete_request),
        )
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/add-volunteer", post(protected::add_volunteer))
        .route("/volunteer-email/:email", get(protected::volunteers_by_email))
        .route("/update-volunteer/:id", put(protected::update_volunteer))
        .route("/add-requests", post(protected::add_request))
        .route("/requests-email/:email", get(protected::requests_by_email))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so everything is listed explicitly
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> &'static str {
    "Server is running"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let ping = async {
        state.listings.ping().await?;
        state.requests.ping().await
    };

    match ping.await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "storage": "ok",
                "timestamp": now,
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "storage": "unavailable",
                    "storage_error": e.to_string(),
                    "timestamp": now,
                })),
            )
        }
    }
}
