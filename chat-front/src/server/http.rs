//! HTTP server implementation for Chat Front.
//!
//! Provides the axum router: streamed chat responses, file serving and a
//! health check.

use crate::config::{FileConfig, ServerConfig};
use crate::error::ChatFrontError;
use crate::events::frame::{
    FrameEncoder, DATA_STREAM_CONTENT_TYPE, DATA_STREAM_HEADER, DATA_STREAM_VERSION,
};
use crate::handler::ChatHandler;
use crate::server::files;
use crate::types::message::ChatRequest;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

/// Application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: ChatHandler,
    pub files: FileConfig,
}

/// Build the router serving `/api/*`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::HeaderName::from_static(DATA_STREAM_HEADER)]);

    let api = Router::new()
        .route("/chat", post(chat_handler))
        .route("/files/{*path}", get(file_handler))
        .route("/health", get(health_handler));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Boot the Chat Front HTTP server.
///
/// On shutdown `cancellation` is cancelled first so that in-flight chat
/// streams end, then the server drains its connections.
pub async fn boot_chat_front_server(
    handler: ChatHandler,
    config: ServerConfig,
    cancellation: CancellationToken,
    shutdown_signal: Option<Pin<Box<dyn Future<Output = ()> + Send>>>,
) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let app = router(AppState {
        handler,
        files: config.files,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Chat Front HTTP Server started on {}", bind_addr);

    let signal: Pin<Box<dyn Future<Output = ()> + Send>> = match shutdown_signal {
        Some(signal) => signal,
        None => Box::pin(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutting down Chat Front server..."),
                Err(e) => tracing::error!("Failed to listen for ctrl_c: {:?}", e),
            }
        }),
    };
    let shutdown_future = async move {
        signal.await;
        cancellation.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_future)
        .await
        .map_err(Into::into)
}

/// Health check endpoint.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-front"
    }))
}

/// POST /api/chat - Run or resume the workflow and stream data-stream frames.
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    request: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) =
        request.map_err(|rejection| ChatFrontError::Validation(rejection.body_text()))?;
    let frames = state.handler.handle(request).await?;
    let body = frames.map(|frame| FrameEncoder::encode(&frame).map(Bytes::from));

    let mut response = Body::from_stream(body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(DATA_STREAM_CONTENT_TYPE),
    );
    headers.insert(
        header::HeaderName::from_static(DATA_STREAM_HEADER),
        HeaderValue::from_static(DATA_STREAM_VERSION),
    );
    // Disable buffering for real-time streaming
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(
        header::HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    Ok(response)
}

/// GET /api/files/{*path} - Serve a local or hydrated source file.
async fn file_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (content_type, bytes) = files::read_file(&state.files, &path).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Application error type for axum handlers.
#[derive(Debug)]
struct AppError(ChatFrontError);

impl From<ChatFrontError> for AppError {
    fn from(err: ChatFrontError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatFrontError::Validation(_) | ChatFrontError::PathRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            ChatFrontError::SnapshotNotFound { .. } | ChatFrontError::FileNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ChatFrontError::Configuration(_)
            | ChatFrontError::Stream(_)
            | ChatFrontError::Internal(_)
            | ChatFrontError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), "Request failed: {:?}", self.0);
        }

        let body = serde_json::json!({
            "error": {
                "code": self.0.error_code(),
                "message": self.0.to_string()
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_validation() {
        let err = AppError(ChatFrontError::Validation("bad request".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_chat_body_is_validation_error() {
        use crate::handler::ChatHandler;
        use crate::runner::WorkflowRunner;
        use crate::snapshot::{HitlController, InMemorySnapshotStore, Snapshot};
        use crate::types::event::HumanResponse;
        use crate::types::source::SourceNodeFactory;
        use crate::workflow::{Workflow, WorkflowHandle, WorkflowInput};

        struct Unused;

        #[async_trait::async_trait]
        impl Workflow for Unused {
            fn name(&self) -> &str {
                "unused"
            }

            async fn start(&self, _: WorkflowInput) -> anyhow::Result<WorkflowHandle> {
                anyhow::bail!("not started")
            }

            async fn resume(&self, _: Snapshot, _: HumanResponse) -> anyhow::Result<WorkflowHandle> {
                anyhow::bail!("not resumed")
            }
        }

        let runner = WorkflowRunner::new(
            Arc::new(Unused),
            HitlController::new(Arc::new(InMemorySnapshotStore::new(10, 60))),
            SourceNodeFactory::default(),
        );
        let app = router(AppState {
            handler: ChatHandler::new(Arc::new(runner)),
            files: FileConfig::default(),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let response = reqwest::Client::new()
            .post(format!("http://{}/api/chat", addr))
            .json(&serde_json::json!({"messages": [{"content": "no role"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST.as_u16());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_app_error_status_mapping() {
        let cases = [
            (
                ChatFrontError::PathRejected("../x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ChatFrontError::FileNotFound("data/a.pdf".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ChatFrontError::SnapshotNotFound {
                    key: "abc".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ChatFrontError::Configuration("no snapshots".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError(err).into_response().status(), status);
        }
    }
}
