//! Finesight Web Server
//!
//! Axum-based REST API for the Finesight personal finance backend.
//!
//! Security features:
//! - CORS restricted to `FINESIGHT_ALLOWED_ORIGINS` when set
//! - `nosniff` and `DENY` framing headers on every response
//! - Request bodies capped at 50 MB (receipt images)
//! - Per-IP rate limit (100 requests per 15 minutes by default)
//! - gzip response compression
//! - Sanitized error responses; storage failures are only logged

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, FromRequestParts, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use finesight_core::{
    AIBackend, AIClient, Budget, Debt, Expense, FinanceStore, Goal, Income, Payment,
    RecurringTransaction, SharedStore, SplitExpense,
};

mod handlers;
mod rate_limit;
mod scheduler;

pub use rate_limit::{RateLimitConfig, RATE_LIMIT_MESSAGE};
pub use scheduler::{next_midnight_delay, start_recurring_scheduler};

/// Maximum request body size (50 MB, base64 receipt images)
pub const MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = any origin)
    pub allowed_origins: Vec<String>,
    /// Whether the daily recurring job runs inside the server
    pub recurring_enabled: bool,
    /// Per-IP request limit (None = unlimited)
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            recurring_enabled: true,
            rate_limit: Some(RateLimitConfig::default()),
        }
    }
}

impl ServerConfig {
    /// Parse a comma-separated origin list, dropping blanks
    pub fn parse_origins(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Shared application state
pub struct AppState {
    pub store: SharedStore,
    pub ai: Option<AIClient>,
}

impl AppState {
    /// The configured AI client, or 503 when none is set up
    pub fn ai(&self) -> Result<&AIClient, AppError> {
        self.ai
            .as_ref()
            .ok_or_else(|| AppError::service_unavailable("AI backend not configured"))
    }
}

/// Create the application router
pub fn create_router(store: SharedStore, ai: Option<AIClient>, config: &ServerConfig) -> Router {
    match ai {
        Some(ref client) => info!(
            "AI backend configured: {} at {} (model: {})",
            client.backend_name(),
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  AI backend not configured (set AI_BACKEND and its host/key to enable chat and receipt scanning)"),
    }

    let state = Arc::new(AppState { store, ai });

    let api_routes = Router::new()
        // Expenses
        .route(
            "/expenses",
            get(handlers::list_records::<Expense>).post(handlers::create_record::<Expense>),
        )
        .route(
            "/expenses/:id",
            put(handlers::update_record::<Expense>).delete(handlers::delete_record::<Expense>),
        )
        // Incomes
        .route(
            "/incomes",
            get(handlers::list_records::<Income>).post(handlers::create_record::<Income>),
        )
        .route(
            "/incomes/:id",
            put(handlers::update_record::<Income>).delete(handlers::delete_record::<Income>),
        )
        // Payments
        .route(
            "/payments",
            get(handlers::list_records::<Payment>).post(handlers::create_record::<Payment>),
        )
        .route(
            "/payments/:id",
            put(handlers::update_record::<Payment>).delete(handlers::delete_record::<Payment>),
        )
        // Budgets (list supports month/year filters)
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_record::<Budget>),
        )
        .route(
            "/budgets/:id",
            put(handlers::update_record::<Budget>).delete(handlers::delete_record::<Budget>),
        )
        // Recurring templates
        .route(
            "/recurring",
            get(handlers::list_records::<RecurringTransaction>)
                .post(handlers::create_record::<RecurringTransaction>),
        )
        .route(
            "/recurring/:id",
            put(handlers::update_record::<RecurringTransaction>)
                .delete(handlers::delete_record::<RecurringTransaction>),
        )
        // Split expenses
        .route(
            "/splits",
            get(handlers::list_records::<SplitExpense>)
                .post(handlers::create_record::<SplitExpense>),
        )
        .route(
            "/splits/:id",
            put(handlers::update_record::<SplitExpense>)
                .delete(handlers::delete_record::<SplitExpense>),
        )
        // Goals (PUT is a partial patch)
        .route(
            "/goals",
            get(handlers::list_records::<Goal>).post(handlers::create_record::<Goal>),
        )
        .route(
            "/goals/:id",
            put(handlers::patch_goal).delete(handlers::delete_record::<Goal>),
        )
        // Debts
        .route(
            "/debts",
            get(handlers::list_records::<Debt>).post(handlers::create_record::<Debt>),
        )
        .route(
            "/debts/:id",
            put(handlers::update_record::<Debt>).delete(handlers::delete_record::<Debt>),
        )
        // Analytics and AI-assisted entry
        .route("/analytics", get(handlers::get_analytics))
        .route("/chat", post(handlers::chat))
        .route("/scan-receipt", post(handlers::scan_receipt));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };
    let cors = cors
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let mut router = Router::new()
        .route("/", get(root_status))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    if let Some(limit) = config.rate_limit {
        let limiter = Arc::new(rate_limit::RateLimiter::new(limit));
        router = router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit,
        ));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// GET / - liveness message naming the storage backend
async fn root_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": format!("Finesight API is running ({})", state.store.backend_name())
    }))
}

/// Start the server
pub async fn serve(
    store: SharedStore,
    ai: Option<AIClient>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection(ai.as_ref()).await;

    if config.recurring_enabled {
        start_recurring_scheduler(store.clone());
    } else {
        warn!("⚠️  Recurring job disabled - templates will only advance via `finesight recurring run`");
    }

    info!("Storage backend: {}", store.backend_name());

    let app = create_router(store, ai, &config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(ai: Option<&AIClient>) {
    if let Some(client) = ai {
        if client.health_check().await {
            info!(
                "✅ AI backend connected: {} (model: {})",
                client.host(),
                client.model()
            );
        } else {
            warn!(
                "⚠️  AI backend configured but not responding: {} (model: {})",
                client.host(),
                client.model()
            );
        }
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// JSON body extractor whose rejections use the `{error}` body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query extractor whose rejections use the `{error}` body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn too_many_requests(msg: &str) -> Self {
        Self::with_status(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// 500 with a fixed client message, keeping the cause for the log
    pub fn internal_with(msg: &str, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            internal: Some(cause.into()),
            ..Self::internal(msg)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Client-caused errors keep their message and status
        if let Some(core_err) = err.downcast_ref::<finesight_core::Error>() {
            match core_err {
                finesight_core::Error::InvalidData(msg) => return Self::bad_request(msg),
                finesight_core::Error::NotFound(msg) => return Self::not_found(msg),
                finesight_core::Error::Conflict(msg) => return Self::conflict(msg),
                _ => {}
            }
        }
        if let Some(rejection) = err.downcast_ref::<JsonRejection>() {
            return Self::bad_request(&rejection.body_text());
        }
        if let Some(rejection) = err.downcast_ref::<QueryRejection>() {
            return Self::bad_request(&rejection.body_text());
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
