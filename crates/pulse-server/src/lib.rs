//! Pulse Web Server
//!
//! Axum-based JSON API over the Pulse analytics core.
//!
//! - The record set is loaded once per process through the shared [`RecordCache`]
//! - Each render runs synchronously inside its handler
//! - Restrictive CORS policy (configured origins only)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use pulse_core::{Config, RecordCache};

mod handlers;

/// Shared application state
pub struct AppState {
    /// Full loads, memoized for the process lifetime
    pub cache: RecordCache,
    pub config: Config,
}

/// Create the application router
pub fn create_router(config: Config) -> Router {
    let cors = cors_layer(&config.server.allowed_origins);

    let state = Arc::new(AppState {
        cache: RecordCache::new(),
        config,
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/periods", get(handlers::list_periods))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/kpis", get(handlers::get_kpis))
        .route("/forecast", get(handlers::get_forecast))
        .route("/alerts", get(handlers::get_alerts))
        .route("/insights", get(handlers::get_insights));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        // Same-origin only
        return layer;
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Start the server on the configured host and port
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_router(config);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

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
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unprocessable(msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error: bad input is 400, unusable data is 422, the rest 500
    pub fn from_core(err: pulse_core::Error) -> Self {
        match err {
            pulse_core::Error::InvalidData(msg) => Self::bad_request(&msg),
            pulse_core::Error::Data(msg) => Self::unprocessable(&msg),
            other => Self::from(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
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
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
