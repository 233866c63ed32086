//! HTTP transport for the citation finder.
//!
//! - `POST /find-citations-for-passage` with `{"text": "..."}`
//! - `GET /health`
//!
//! Validation happens here; the core only sees passages of 5 to 300 words.

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::models::{PassageRequest, SearchResponse};
use crate::pipeline::{CitationFinder, ClientInfo, FinderError};
use crate::utils::{validate_passage, ValidationError};

#[derive(Clone)]
struct ApiState {
    finder: Arc<CitationFinder>,
}

/// Error payload: validation failures carry a list of messages, everything else one string
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Detail {
    Messages(Vec<String>),
    Message(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: Detail,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Build the router
pub fn router(finder: CitationFinder) -> Router {
    let state = ApiState {
        finder: Arc::new(finder),
    };

    Router::new()
        .route("/find-citations-for-passage", post(find_citations_handler))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Bind `address` and serve until Ctrl-C
pub async fn serve(finder: CitationFinder, address: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    serve_listener(listener, finder).await
}

/// Serve on an already bound listener until Ctrl-C
pub async fn serve_listener(listener: TcpListener, finder: CitationFinder) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "HTTP API listening");
    axum::serve(
        listener,
        router(finder).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down HTTP API");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let user_agent = user_agent(request.headers());
    tracing::info!(
        method = %request.method(),
        path = request.uri().path(),
        query = request.uri().query().unwrap_or(""),
        %client_ip,
        %user_agent,
        "Request received"
    );

    let response = next.run(request).await;
    tracing::info!(status = response.status().as_u16(), "Response sent");
    response
}

async fn find_citations_handler(
    State(state): State<ApiState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query_params): Query<HashMap<String, String>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let request = passage_request(body)?;

    let client = ClientInfo {
        client_ip: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: user_agent(&headers),
        query_params,
    };

    state
        .finder
        .find_citations_for_passage(&request.text, client)
        .await
        .map(Json)
        .map_err(finder_error)
}

fn passage_request(body: serde_json::Value) -> Result<PassageRequest, ApiError> {
    if body.get("text").map_or(true, serde_json::Value::is_null) {
        return Err(bad_request(
            ValidationError::MissingField("text".to_string()).to_string(),
        ));
    }
    let request: PassageRequest = serde_json::from_value(body)
        .map_err(|_| bad_request("Field 'text' must be a string"))?;
    validate_passage(&request.text).map_err(|e| bad_request(e.to_string()))?;
    Ok(request)
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            detail: Detail::Messages(vec![message.into()]),
        }),
    )
}

fn finder_error(err: FinderError) -> ApiError {
    if let FinderError::Validation(e) = &err {
        return bad_request(e.to_string());
    }
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorBody {
            detail: Detail::Message(err.detail()),
        }),
    )
}
