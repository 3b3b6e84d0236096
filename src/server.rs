//! HTTP surface.
//!
//! | Route               | Handler                                        |
//! |---------------------|------------------------------------------------|
//! | `GET /`             | enumerate → filter → order → paginate → render |
//! | `GET /api/file/{id}`| stream a remote file (`?download=1` attaches)  |
//! | `GET /api/file`     | 400 `Missing id`                               |
//! | `GET /images/{name}`| stream a file from the local image directory   |
//!
//! [`AppState`] is built once from the resolved [`GalleryConfig`] and cloned
//! into every handler. It holds no per-request mutable state: the only
//! shared resource is the lazily initialized remote client.
//!
//! ## Error mapping
//!
//! | Error                                  | Status |
//! |----------------------------------------|--------|
//! | missing id, bad local file name        | 400    |
//! | unknown remote id, missing local file  | 404    |
//! | remote API failure (listing or file)   | 502    |
//! | anything else                          | 500    |

use crate::config::GalleryConfig;
use crate::drive::{LazyRemote, RemoteError};
use crate::pager::{self, PageQuery, PageRequest};
use crate::proxy::{self, LocalFileError};
use crate::render::{self, PageContext};
use crate::source::{Source, SourceError};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use chrono::Datelike;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("source setup failed: {0}")]
    Source(#[from] SourceError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failures, rendered as plain-text responses.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Local(#[from] LocalFileError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Local(LocalFileError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            AppError::Local(LocalFileError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Remote(RemoteError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Remote(_) | AppError::Source(SourceError::Remote(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Source(_) | AppError::Local(LocalFileError::Io { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::BadRequest(msg) => (*msg).to_string(),
            _ if status.is_server_error() => {
                tracing::error!(error = %self, status = status.as_u16(), "request failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            }
            _ => {
                tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
                self.to_string()
            }
        };
        (status, body).into_response()
    }
}

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GalleryConfig>,
    pub source: Arc<Source>,
    pub remote: Arc<LazyRemote>,
    pub css: Arc<str>,
}

impl AppState {
    pub fn new(config: GalleryConfig) -> Result<Self, SourceError> {
        let remote = Arc::new(LazyRemote::new(config.remote.clone()));
        Self::with_remote(config, remote)
    }

    /// Build state around an existing remote handle.
    pub fn with_remote(
        config: GalleryConfig,
        remote: Arc<LazyRemote>,
    ) -> Result<Self, SourceError> {
        let source = Source::from_config(&config, Arc::clone(&remote))?;
        let css: Arc<str> = render::stylesheet(&config).into();
        Ok(Self {
            config: Arc::new(config),
            source: Arc::new(source),
            remote,
            css,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(gallery_page))
        .route("/api/file", get(missing_id))
        .route("/api/file/", get(missing_id))
        .route("/api/file/{id}", get(remote_file))
        .route("/images/{name}", get(local_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.server.bind` and serve until Ctrl-C.
pub async fn serve(config: GalleryConfig) -> Result<(), ServerError> {
    let addr = config.server.bind.clone();
    let state = AppState::new(config)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(
        addr = %addr,
        source = state.source.kind().as_str(),
        location = %state.source.location(),
        "gallery listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn wants_download(pairs: &[(String, String)]) -> bool {
    pairs
        .iter()
        .find(|(k, _)| k == "download")
        .is_some_and(|(_, v)| v == "1")
}

async fn gallery_page(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    let query = PageQuery::from_pairs(pairs);
    let request = PageRequest::from_query(&query, state.config.gallery.default_per);
    let items = state.source.list().await?;

    let mut rng = rand::rngs::OsRng;
    let result = pager::build_page(items, &request, state.config.gallery.order, &mut rng);

    let source_hint = state.source.location();
    let ctx = PageContext {
        title: &state.config.gallery.title,
        tagline: &state.config.gallery.tagline,
        source_hint: &source_hint,
        css: &state.css,
        year: chrono::Utc::now().year(),
    };
    Ok(Html(render::render_gallery(&ctx, &result).into_string()))
}

async fn missing_id() -> AppError {
    AppError::BadRequest("Missing id")
}

async fn remote_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing id"));
    }
    let store = state.remote.get().await?;
    Ok(proxy::stream_file(store.as_ref(), &id, wants_download(&pairs)).await?)
}

async fn local_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    Ok(proxy::serve_local(&state.config.source.dir, &name, wants_download(&pairs)).await?)
}
