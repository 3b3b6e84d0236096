//! Streaming file responses.
//!
//! Two routes hand image bytes to the browser:
//!
//! - `/api/file/{id}` streams a remote file through [`stream_file`].
//! - `/images/{name}` streams a file from the local image directory through
//!   [`serve_local`].
//!
//! Both share the same header policy and the same passthrough:
//!
//! ```text
//! RECEIVE id ─▶ FETCH metadata ─▶ OPEN byte stream ─▶ EMIT headers + body
//!                                                        │
//!                              chunk ─▶ chunk ─▶ … ─▶ end │ error │ client gone
//! ```
//!
//! Chunks are forwarded as they arrive; hyper only polls for the next chunk
//! once the previous one has been written, so a slow client throttles the
//! upstream read instead of growing a buffer. An upstream error is yielded
//! as a body error, which makes hyper abort the connection rather than end
//! it cleanly, so a truncated file is never mistaken for a complete one.
//! When the client disconnects, hyper drops the body, which drops
//! [`Passthrough`] and with it the upstream stream.
//!
//! ## Headers
//!
//! | Header                | Value                                          |
//! |-----------------------|------------------------------------------------|
//! | `Content-Type`        | metadata mime type, else `application/octet-stream` |
//! | `Content-Length`      | only when the size is known                    |
//! | `Cache-Control`       | [`CACHE_CONTROL_VALUE`]                        |
//! | `Content-Disposition` | only with `?download=1`: `attachment; filename="<percent-encoded>"` |

use crate::drive::{FileMeta, RemoteError, RemoteStore};
use crate::scan;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio_util::io::ReaderStream;

pub const CACHE_CONTROL_VALUE: &str =
    "public, max-age=86400, s-maxage=86400, stale-while-revalidate=604800";
pub const FALLBACK_MIME: &str = "application/octet-stream";
pub const FALLBACK_NAME: &str = "file";

#[derive(Error, Debug)]
pub enum LocalFileError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Percent-encode like a browser's `encodeURIComponent`.
pub fn encode_component(s: &str) -> String {
    urlencoding::encode(s)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

pub fn content_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", encode_component(name))
}

/// Response headers for a file described by `meta`.
pub fn response_headers(meta: &FileMeta, download: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let content_type = meta
        .mime_type
        .as_deref()
        .filter(|m| !m.is_empty())
        .and_then(|m| HeaderValue::from_str(m).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_MIME));
    headers.insert(header::CONTENT_TYPE, content_type);

    if let Some(size) = meta.size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );

    if download {
        let name = meta
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME);
        // Percent-encoding leaves only visible ASCII, always a valid value.
        if let Ok(value) = HeaderValue::from_str(&content_disposition(name)) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    headers
}

/// Forwards chunks from an upstream stream and reports how the transfer
/// ended.
pub struct Passthrough<S> {
    inner: S,
    label: String,
    bytes: u64,
    finished: bool,
}

impl<S> Passthrough<S> {
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            bytes: 0,
            finished: false,
        }
    }
}

impl<S, E> Stream for Passthrough<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                tracing::error!(
                    file = %this.label,
                    bytes = this.bytes,
                    error = %e,
                    "upstream stream failed, aborting response"
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                tracing::debug!(file = %this.label, bytes = this.bytes, "stream complete");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> Drop for Passthrough<S> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                file = %self.label,
                bytes = self.bytes,
                "client went away, cancelling upstream"
            );
        }
    }
}

fn build_response(headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.headers_mut() = headers;
    response
}

/// Stream remote file `id` to the client.
pub async fn stream_file(
    store: &dyn RemoteStore,
    id: &str,
    download: bool,
) -> Result<Response, RemoteError> {
    let meta = store.metadata(id).await?;
    let upstream = store.media(id).await?;
    tracing::debug!(
        id,
        name = meta.name.as_deref().unwrap_or(""),
        download,
        "proxying remote file"
    );

    let headers = response_headers(&meta, download);
    let body = Body::from_stream(Passthrough::new(upstream, id));
    Ok(build_response(headers, body))
}

/// Reject anything that is not a plain image filename.
fn validate_local_name(name: &str) -> Result<(), LocalFileError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(LocalFileError::InvalidName(name.to_string()));
    }
    if !scan::is_image(name) {
        return Err(LocalFileError::NotFound(name.to_string()));
    }
    Ok(())
}

/// Stream `dir/name` to the client with the same header policy as
/// [`stream_file`].
pub async fn serve_local(
    dir: &Path,
    name: &str,
    download: bool,
) -> Result<Response, LocalFileError> {
    validate_local_name(name)?;
    let path = dir.join(name);

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LocalFileError::NotFound(name.to_string()));
        }
        Err(source) => return Err(LocalFileError::Io { path, source }),
    };
    let metadata = file
        .metadata()
        .await
        .map_err(|source| LocalFileError::Io {
            path: path.clone(),
            source,
        })?;
    if !metadata.is_file() {
        return Err(LocalFileError::NotFound(name.to_string()));
    }

    let meta = FileMeta {
        mime_type: mime_guess::from_path(&path)
            .first()
            .map(|m| m.essence_str().to_string()),
        name: Some(name.to_string()),
        size: Some(metadata.len()),
    };
    let headers = response_headers(&meta, download);
    let body = Body::from_stream(Passthrough::new(ReaderStream::new(file), name));
    Ok(build_response(headers, body))
}
