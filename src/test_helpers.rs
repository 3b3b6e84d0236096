//! Shared test utilities for the ember-gal test suite.
//!
//! Provides item builders, a filesystem fixture writer and [`FakeStore`], an
//! in-memory [`RemoteStore`] that records how it was used.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let store = FakeStore::new()
//!     .with_file("id1", "cat.png", "image/png", b"meow")
//!     .with_page_size(1);
//!
//! let files = list_folder(&store, "folder").await.unwrap();
//! assert_eq!(store.list_calls(), 1);
//! ```

use crate::drive::{ByteStream, FileMeta, FilePage, RemoteError, RemoteFile, RemoteStore};
use crate::types::GalleryItem;
use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// =========================================================================
// Items
// =========================================================================

/// Local items from filenames.
pub fn files(names: &[&str]) -> Vec<GalleryItem> {
    names.iter().map(|n| GalleryItem::file(*n)).collect()
}

/// Display names, in order.
pub fn names(items: &[GalleryItem]) -> Vec<&str> {
    items.iter().map(GalleryItem::name).collect()
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Write a small file for each name into `dir`. Image extensions get a
/// body that starts with the name so content checks can tell them apart.
pub fn write_images(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), format!("{name}-bytes")).unwrap();
    }
}

// =========================================================================
// FakeStore
// =========================================================================

#[derive(Clone)]
struct FakeFile {
    meta: RemoteFile,
    body: Vec<u8>,
}

/// In-memory remote store.
///
/// Lists files in insertion order, `page_size` per page, using the offset as
/// the page token. Media is served in two chunks. With
/// [`stall_media`](Self::stall_media) the stream never finishes after the
/// first chunk, which lets tests drop the body mid-transfer and check
/// [`media_dropped`](Self::media_dropped).
pub struct FakeStore {
    files: Vec<FakeFile>,
    page_size: usize,
    stall: bool,
    list_calls: AtomicUsize,
    dropped: Arc<AtomicBool>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            page_size: 1000,
            stall: false,
            list_calls: AtomicUsize::new(0),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_file(mut self, id: &str, name: &str, mime: &str, body: &[u8]) -> Self {
        self.files.push(FakeFile {
            meta: RemoteFile {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: mime.to_string(),
                size: Some(body.len() as u64),
                modified_time: Some("2025-01-01T00:00:00.000Z".to_string()),
            },
            body: body.to_vec(),
        });
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn stall_media(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn media_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    fn find(&self, id: &str) -> Result<&FakeFile, RemoteError> {
        self.files
            .iter()
            .find(|f| f.meta.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_page(
        &self,
        _folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(self.files.len());
        let files = self.files[offset.min(end)..end]
            .iter()
            .map(|f| f.meta.clone())
            .collect();
        let next_page_token = (end < self.files.len()).then(|| end.to_string());
        Ok(FilePage {
            files,
            next_page_token,
        })
    }

    async fn metadata(&self, id: &str) -> Result<FileMeta, RemoteError> {
        let file = self.find(id)?;
        Ok(FileMeta {
            mime_type: Some(file.meta.mime_type.clone()).filter(|m| !m.is_empty()),
            name: Some(file.meta.name.clone()),
            size: file.meta.size,
        })
    }

    async fn media(&self, id: &str) -> Result<ByteStream, RemoteError> {
        let body = self.find(id)?.body.clone();
        let mid = body.len() / 2;
        let chunks: Vec<Result<Bytes, RemoteError>> = vec![
            Ok(Bytes::copy_from_slice(&body[..mid])),
            Ok(Bytes::copy_from_slice(&body[mid..])),
        ];
        let guard = SetOnDrop(Arc::clone(&self.dropped));

        let stream = if self.stall {
            futures::stream::iter(chunks.into_iter().take(1))
                .chain(futures::stream::pending())
                .boxed()
        } else {
            futures::stream::iter(chunks).boxed()
        };
        Ok(stream
            .map(move |chunk| {
                let _held = &guard;
                chunk
            })
            .boxed())
    }
}
