//! HTTP surface for the drawing critic.
//!
//! `GET /` answers a fixed liveness payload and `POST /api/chat` relays one
//! critic request to the provider. The CORS layer answers every `OPTIONS`
//! request itself; those answers are rewritten to `204 No Content`.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::assembler::ImagePayload;
use crate::chat::critique;
use crate::config::Config;
use crate::gateway::CompletionProvider;
use crate::providers::ProviderError;

#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn CompletionProvider>,
    cfg: Arc<Config>,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>, cfg: Arc<Config>) -> Self {
        Self { provider, cfg }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No JSON data provided")]
    MissingBody,
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingBody | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    message: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(status))
        .route("/api/chat", post(chat))
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(middleware::map_response(preflight_no_content))
        .with_state(state)
}

/// Resolves `host` (hostname, IPv4 or bare IPv6) and binds the first
/// address that accepts.
pub async fn bind_listener(host: &str, port: u16) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind HTTP server on {host}:{port}"))
}

pub async fn serve(cfg: Arc<Config>, provider: Arc<dyn CompletionProvider>) -> Result<()> {
    let listener = bind_listener(&cfg.server_host, cfg.server_port).await?;
    let addr = listener
        .local_addr()
        .context("Failed to read HTTP server address")?;
    info!(%addr, model = %cfg.vision_model, "starting HTTP server");

    let app = router(AppState::new(provider, cfg));
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "Server is running" }))
}

async fn preflight_no_content(method: Method, mut response: Response) -> Response {
    if method == Method::OPTIONS && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, ApiError> {
    debug!(body_len = body.len(), "received chat request");
    let payload = parse_payload(&body).inspect_err(|err| {
        warn!(error = %err, "rejected chat request");
    })?;

    let text = payload.message.unwrap_or_default();
    let image = payload.image.as_deref().and_then(ImagePayload::parse);
    debug!(
        message_len = text.len(),
        has_image = image.is_some(),
        "forwarding chat request to provider"
    );

    let reply = critique(state.provider.as_ref(), &state.cfg, &text, image.as_ref())
        .await
        .inspect_err(|err| {
            error!(error = %err, "chat request failed");
        })?;
    debug!(reply_len = reply.len(), "received provider reply");
    Ok(Json(ChatReply { message: reply }))
}

fn parse_payload(body: &[u8]) -> Result<ChatPayload, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingBody);
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|err| ApiError::InvalidJson(err.to_string()))?;
    if value.is_null() {
        return Err(ApiError::MissingBody);
    }
    if !value.is_object() {
        return Err(ApiError::InvalidJson("expected a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|err| ApiError::InvalidJson(err.to_string()))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = err.downcast_ref::<&str>() {
        (*msg).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "request handler panicked");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("Internal server error: {detail}"),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::{ApiError, bind_listener, parse_payload, panic_response};
    use crate::providers::status_error;

    #[test]
    fn parse_payload_rejects_missing_body() {
        assert!(matches!(parse_payload(b""), Err(ApiError::MissingBody)));
        assert!(matches!(parse_payload(b"  \n"), Err(ApiError::MissingBody)));
        assert!(matches!(parse_payload(b"null"), Err(ApiError::MissingBody)));
    }

    #[test]
    fn parse_payload_rejects_non_json_and_non_objects() {
        assert!(matches!(
            parse_payload(b"message=hi"),
            Err(ApiError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_payload(b"[1, 2]"),
            Err(ApiError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_payload(br#"{"message": 42}"#),
            Err(ApiError::InvalidJson(_))
        ));
    }

    #[test]
    fn parse_payload_defaults_missing_fields() {
        let payload = parse_payload(b"{}").expect("empty object is valid");
        assert_eq!(payload.message, None);
        assert_eq!(payload.image, None);

        let payload =
            parse_payload(br#"{"message": null, "image": null}"#).expect("nulls are valid");
        assert_eq!(payload.message, None);
        assert_eq!(payload.image, None);
    }

    #[test]
    fn parse_payload_reads_message_and_image() {
        let payload = parse_payload(br#"{"message": "rate it", "image": "data:x,QUJD"}"#)
            .expect("valid payload");
        assert_eq!(payload.message.as_deref(), Some("rate it"));
        assert_eq!(payload.image.as_deref(), Some("data:x,QUJD"));
    }

    #[test]
    fn api_error_statuses_separate_validation_from_provider_failures() {
        assert_eq!(ApiError::MissingBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidJson("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        let provider = ApiError::from(status_error(StatusCode::UNAUTHORIZED, String::new()));
        assert_eq!(provider.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn panic_response_is_internal_error() {
        let response = panic_response(Box::new("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn bind_listener_resolves_hostnames() {
        let listener = bind_listener("localhost", 0)
            .await
            .expect("localhost should resolve and bind");
        assert!(listener.local_addr().expect("addr").ip().is_loopback());
    }

    #[tokio::test]
    async fn bind_listener_reports_unresolvable_host() {
        let err = bind_listener("host.invalid", 0)
            .await
            .expect_err("unresolvable host should fail");
        assert!(
            format!("{err:#}").contains("host.invalid:0"),
            "unexpected error: {err:#}"
        );
    }
}
