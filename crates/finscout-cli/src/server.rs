//! HTTP endpoints
//!
//! Every scrape runs in its own task so a panic anywhere in the engine is
//! reported as a structured 500 instead of tearing down the connection.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use finscout::{DocumentSink, Scout, ScrapeError, ScrapeErrorResponse, ScrapeRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub const SERVICE_NAME: &str = "finscout";

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub scout: Scout,
    pub sink: Arc<dyn DocumentSink>,
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scrape", post(scrape))
        .route("/search_financial_statements", post(search_financial_statements))
        .route("/documents", get(list_documents))
        .route("/documents/:company", get(list_company_documents))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into(), "status": "error" })),
    )
        .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn scrape(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let company_url = body
        .get("company_url")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if company_url.is_empty() {
        return bad_request(ScrapeError::MissingUrl.to_string());
    }
    let company_url = company_url.to_string();

    let req: ScrapeRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request: {e}")),
    };

    let scout = state.scout.clone();
    let outcome = tokio::spawn(async move { scout.scrape(req).await }).await;

    match outcome {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) if e.is_input_error() => bad_request(e.to_string()),
        Ok(Err(e)) => {
            error!(company_url = %company_url, error = %e, "Scrape failed");
            internal_error(e.to_string(), company_url)
        }
        Err(join_error) => {
            error!(company_url = %company_url, error = %join_error, "Scrape task panicked");
            internal_error(join_error.to_string(), company_url)
        }
    }
}

fn internal_error(error: String, company_url: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ScrapeErrorResponse::new(
            error,
            Some(company_url),
            "Failed to scrape website",
        )),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    company: String,
    #[serde(default)]
    year: Option<u32>,
}

async fn search_financial_statements(
    State(state): State<AppState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let company = body.company.trim().to_string();
    if company.is_empty() {
        return bad_request("Company name is required");
    }

    match state.scout.search_financial_statement(&company, body.year).await {
        Ok(Some(pdf_url)) => Json(json!({ "company": company, "pdf_url": pdf_url })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "company": company,
                "error": "No suitable PDF found",
                "status": "error",
            })),
        )
            .into_response(),
        Err(ScrapeError::SearchUnavailable) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": ScrapeError::SearchUnavailable.to_string(),
                "status": "error",
            })),
        )
            .into_response(),
        Err(e) => {
            error!(company = %company, error = %e, "Search failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "company": company, "error": e.to_string(), "status": "error" })),
            )
                .into_response()
        }
    }
}

async fn list_documents(State(state): State<AppState>) -> Response {
    Json(state.sink.list().await).into_response()
}

async fn list_company_documents(
    State(state): State<AppState>,
    Path(company): Path<String>,
) -> Response {
    Json(state.sink.list_company(&company).await).into_response()
}
