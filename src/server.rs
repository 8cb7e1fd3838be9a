//! HTTP gateway
//!
//! Thin passthrough in front of the route planner: forwards the request body
//! verbatim, re-times the planner's answer and returns it. Also exposes the
//! call-logging toggle.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::core::{
    error::Error, AnchorTime, CallLogger, LoggingState, ResponseAggregator, ServiceConfig,
    ValhallaClient,
};

/// Shared state behind every handler
pub struct AppState {
    aggregator: ResponseAggregator<ValhallaClient>,
    logger: Arc<CallLogger>,
    planner: Client,
    planner_url: String,
}

impl AppState {
    pub fn from_config(config: &ServiceConfig) -> crate::Result<Self> {
        let (logger, aggregator) = config.build_pipeline()?;
        let planner = Client::builder()
            .user_agent(format!("butterfly-retime/{}", env!("BUTTERFLY_VERSION")))
            .build()
            .map_err(|e| Error::UpstreamError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            aggregator,
            logger,
            planner,
            planner_url: config.planner_url.clone(),
        })
    }

    pub fn logger(&self) -> &Arc<CallLogger> {
        &self.logger
    }

    async fn forward(&self, body: &Value) -> crate::Result<Value> {
        let url = format!("{}/", self.planner_url.trim_end_matches('/'));
        let response = self
            .planner
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::UpstreamError(e.to_string()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::UpstreamError(format!("planner returned invalid JSON: {e}")))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    /// Anchor departure time in ISO format, defaults to now
    base_time: Option<String>,
}

/// Error wrapper mapping pipeline errors to HTTP statuses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            log::error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the Axum router
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(process_route).options(preflight))
        .route("/logging/{state}", post(control_logging).options(preflight))
        .route("/health", get(health).options(preflight))
        .fallback(fallback)
        .layer(cors)
        .with_state(state)
}

/// Forward to the planner and re-time its response
async fn process_route(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProcessParams>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    // Reject a bad anchor before bothering the planner or the oracle
    let anchor = params
        .base_time
        .as_deref()
        .map(AnchorTime::parse)
        .transpose()?;

    let planner_response = state.forward(&body).await?;
    let processed = state.aggregator.process_value(planner_response, anchor).await?;

    Ok(Json(processed))
}

/// Enable or disable oracle call logging
async fn control_logging(
    State(state): State<Arc<AppState>>,
    Path(requested): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let requested: LoggingState = requested.parse()?;
    state.logger.apply(requested)?;

    let message = match requested {
        LoggingState::Enable => "Logging enabled",
        LoggingState::Disable => "Logging disabled",
    };
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

async fn preflight() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "OK".to_string(),
    })
}

/// Preflight on any other path, 404 for everything else
async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
        .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run the gateway until Ctrl-C
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let logger = Arc::clone(state.logger());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("Gateway listening on http://{}", config.bind_addr);
    log::info!("Forwarding to planner at {}", config.planner_url);
    log::info!("Querying durations from {}", config.oracle.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e}");
            }
            log::info!("Shutting down");
        })
        .await?;

    logger.flush().await;
    Ok(())
}
