//! Local page server: one upload form, results rendered in place.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::MatchError;
use crate::pipeline::StyleMatcher;
use crate::view::{preview_data_uri, PageRenderer, PageView};

const UPLOAD_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<StyleMatcher>,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(matcher: Arc<StyleMatcher>) -> tera::Result<Self> {
        Ok(Self {
            matcher,
            pages: Arc::new(PageRenderer::new()?),
        })
    }
}

impl MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MatchError::ModelInference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MatchError::Embedding(_)
            | MatchError::Catalog(_)
            | MatchError::ModelLoad(_)
            | MatchError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Routes: `GET /` form, `POST /` upload, `GET /health`.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(upload_form).post(upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl+C.
pub async fn serve(addr: SocketAddr, matcher: Arc<StyleMatcher>, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = build_router(AppState::new(matcher)?, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("StyleMatch page on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn upload_form(State(state): State<AppState>) -> Response {
    page(&state, StatusCode::OK, &PageView::Upload)
}

fn page(state: &AppState, status: StatusCode, view: &PageView) -> Response {
    match state.pages.render(view) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "page render failed").into_response()
        }
    }
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let bytes = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(err) => return failure(&state, None, err),
    };
    let preview = preview_data_uri(&bytes);

    let started = Instant::now();
    let matcher = state.matcher.clone();
    let outcome = tokio::task::spawn_blocking(move || matcher.analyze_upload(&bytes)).await;
    match outcome {
        Ok(Ok(analysis)) => {
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "upload analysed"
            );
            page(&state, StatusCode::OK, &PageView::Results { preview, analysis })
        }
        Ok(Err(err)) => failure(&state, preview, err),
        Err(join) => failure(
            &state,
            preview,
            MatchError::ModelInference(format!("analysis task failed: {join}")),
        ),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, MatchError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MatchError::invalid(format!("malformed upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        tracing::debug!(
            file_name = field.file_name().unwrap_or("-"),
            content_type = field.content_type().unwrap_or("-"),
            "received upload"
        );
        let data = field
            .bytes()
            .await
            .map_err(|e| MatchError::invalid(format!("malformed upload: {e}")))?;
        return Ok(data.to_vec());
    }
    Err(MatchError::invalid("no image was uploaded"))
}

fn failure(state: &AppState, preview: Option<String>, err: MatchError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(code = err.code(), error = %err, "upload failed");
    } else {
        tracing::warn!(code = err.code(), error = %err, "upload rejected");
    }
    page(state, status, &PageView::failed(preview, &err))
}
