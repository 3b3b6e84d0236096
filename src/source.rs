//! The source enumerator: where gallery items come from.
//!
//! [`Source`] is a closed set of strategies sharing one operation,
//! [`Source::list`], called once per page render:
//!
//! | Variant    | Reads                              | Failure                      |
//! |------------|------------------------------------|------------------------------|
//! | `Local`    | image directory, every request     | warn, empty list             |
//! | `Manifest` | JSON manifest, per request or once | missing: empty; malformed: error |
//! | `Remote`   | remote folder listing              | error (surfaced as 5xx)      |
//!
//! The manifest variant has two modes selected by `reload_manifest`. When
//! reloading, every request reads the file again so a regenerated manifest
//! shows up without a restart. Otherwise the file is read once at startup
//! and the snapshot is served for the life of the process.

use crate::config::{GalleryConfig, SourceKind};
use crate::drive::{self, LazyRemote, RemoteError};
use crate::manifest::{self, ManifestError};
use crate::scan;
use crate::types::GalleryItem;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("listing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub enum Source {
    Local {
        dir: PathBuf,
    },
    Manifest {
        path: PathBuf,
        /// Startup snapshot; `None` means re-read on every call.
        snapshot: Option<Arc<Vec<GalleryItem>>>,
    },
    Remote {
        folder_id: String,
        remote: Arc<LazyRemote>,
    },
}

impl Source {
    /// Build the configured source.
    ///
    /// For a non-reloading manifest this reads the file immediately, so a
    /// malformed manifest stops the server at startup.
    pub fn from_config(
        config: &GalleryConfig,
        remote: Arc<LazyRemote>,
    ) -> Result<Self, SourceError> {
        let source = match config.source.kind {
            SourceKind::Local => Source::Local {
                dir: config.source.dir.clone(),
            },
            SourceKind::Manifest => {
                let path = config.source.manifest.clone();
                let snapshot = if config.source.reload_manifest {
                    None
                } else {
                    Some(Arc::new(read_manifest_items(&path)?))
                };
                Source::Manifest { path, snapshot }
            }
            SourceKind::Drive => Source::Remote {
                folder_id: config.source.folder_id.clone(),
                remote,
            },
        };
        Ok(source)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Local { .. } => SourceKind::Local,
            Source::Manifest { .. } => SourceKind::Manifest,
            Source::Remote { .. } => SourceKind::Drive,
        }
    }

    /// Where the items come from, for logs and CLI output.
    pub fn location(&self) -> String {
        match self {
            Source::Local { dir } => dir.display().to_string(),
            Source::Manifest { path, .. } => path.display().to_string(),
            Source::Remote { folder_id, .. } => format!("folder {folder_id}"),
        }
    }

    /// Enumerate the current items.
    pub async fn list(&self) -> Result<Vec<GalleryItem>, SourceError> {
        let items = match self {
            Source::Local { dir } => {
                let dir = dir.clone();
                let names = tokio::task::spawn_blocking(move || scan::list_images(&dir)).await?;
                names.into_iter().map(GalleryItem::File).collect()
            }
            Source::Manifest {
                snapshot: Some(items),
                ..
            } => items.as_ref().clone(),
            Source::Manifest {
                path,
                snapshot: None,
            } => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || read_manifest_items(&path)).await??
            }
            Source::Remote { folder_id, remote } => {
                let store = remote.get().await?;
                drive::list_folder(store.as_ref(), folder_id)
                    .await?
                    .iter()
                    .map(drive::RemoteFile::to_item)
                    .collect()
            }
        };
        tracing::debug!(source = self.kind().as_str(), items = items.len(), "enumerated source");
        Ok(items)
    }
}

/// Missing manifest reads as empty; anything else is an error.
fn read_manifest_items(path: &std::path::Path) -> Result<Vec<GalleryItem>, ManifestError> {
    match manifest::read_items(path) {
        Ok(items) => Ok(items),
        Err(ManifestError::NotFound(p)) => {
            tracing::warn!(path = %p.display(), "manifest not found, serving empty gallery");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::write_manifest;
    use crate::test_helpers::{FakeStore, names, write_images};
    use crate::types::{Manifest, ManifestEntry};
    use tempfile::TempDir;

    fn config_for(kind: SourceKind, tmp: &TempDir) -> GalleryConfig {
        let mut config = GalleryConfig::default();
        config.source.kind = kind;
        config.source.dir = tmp.path().join("images");
        config.source.manifest = tmp.path().join("manifest.json");
        config.source.folder_id = "folder".into();
        config
    }

    fn no_remote() -> Arc<LazyRemote> {
        Arc::new(LazyRemote::with_store(Arc::new(FakeStore::new())))
    }

    #[tokio::test]
    async fn local_lists_images_only() {
        let tmp = TempDir::new().unwrap();
        write_images(&tmp.path().join("images"), &["b.png", "a.jpg", "c.gif", "d.txt"]);
        let source =
            Source::from_config(&config_for(SourceKind::Local, &tmp), no_remote()).unwrap();

        let items = source.list().await.unwrap();
        let mut got = names(&items);
        got.sort();
        assert_eq!(got, vec!["a.jpg", "b.png", "c.gif"]);
    }

    #[tokio::test]
    async fn local_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let source =
            Source::from_config(&config_for(SourceKind::Local, &tmp), no_remote()).unwrap();
        assert!(source.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reloading_manifest_sees_updates() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(SourceKind::Manifest, &tmp);
        let source = Source::from_config(&config, no_remote()).unwrap();
        assert!(source.list().await.unwrap().is_empty());

        write_manifest(
            &config.source.manifest,
            &Manifest::new(vec![ManifestEntry::Name("x.png".into())]),
        )
        .unwrap();
        assert_eq!(names(&source.list().await.unwrap()), vec!["x.png"]);
    }

    #[tokio::test]
    async fn bundled_manifest_is_read_once() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_for(SourceKind::Manifest, &tmp);
        config.source.reload_manifest = false;
        write_manifest(
            &config.source.manifest,
            &Manifest::new(vec![ManifestEntry::Name("first.png".into())]),
        )
        .unwrap();
        let source = Source::from_config(&config, no_remote()).unwrap();

        write_manifest(
            &config.source.manifest,
            &Manifest::new(vec![ManifestEntry::Name("second.png".into())]),
        )
        .unwrap();
        assert_eq!(names(&source.list().await.unwrap()), vec!["first.png"]);
    }

    #[tokio::test]
    async fn malformed_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(SourceKind::Manifest, &tmp);
        std::fs::write(&config.source.manifest, "[").unwrap();
        let source = Source::from_config(&config, no_remote()).unwrap();
        assert!(matches!(
            source.list().await,
            Err(SourceError::Manifest(ManifestError::Json { .. }))
        ));
    }

    #[tokio::test]
    async fn remote_lists_images_sorted() {
        let tmp = TempDir::new().unwrap();
        let store = FakeStore::new()
            .with_file("2", "b.png", "image/png", b"b")
            .with_file("1", "a.png", "image/png", b"a")
            .with_file("3", "doc.pdf", "application/pdf", b"d");
        let remote = Arc::new(LazyRemote::with_store(Arc::new(store)));
        let source = Source::from_config(&config_for(SourceKind::Drive, &tmp), remote).unwrap();

        assert_eq!(
            source.list().await.unwrap(),
            vec![GalleryItem::remote("1", "a.png"), GalleryItem::remote("2", "b.png")]
        );
        assert_eq!(source.kind(), SourceKind::Drive);
        assert_eq!(source.location(), "folder folder");
    }
}
