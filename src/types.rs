//! Shared types used by every stage.
//!
//! A [`GalleryItem`] is either a bare filename (local directory or local
//! manifest) or an `{id, name}` record from a remote folder. The same JSON
//! shapes appear in the manifest written by the offline generators, so these
//! types are serialized with `serde(untagged)` and the manifest reader accepts
//! both without a discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GalleryItem {
    /// A file in the local image directory, identified by its filename.
    File(String),
    /// A file in a remote folder, identified by the provider's file id.
    Remote { id: String, name: String },
}

impl GalleryItem {
    pub fn file(name: impl Into<String>) -> Self {
        GalleryItem::File(name.into())
    }

    pub fn remote(id: impl Into<String>, name: impl Into<String>) -> Self {
        GalleryItem::Remote {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Display name, also the field search and sorting operate on.
    pub fn name(&self) -> &str {
        match self {
            GalleryItem::File(name) => name,
            GalleryItem::Remote { name, .. } => name,
        }
    }

    /// Identity: filename for local items, file id for remote ones.
    pub fn key(&self) -> &str {
        match self {
            GalleryItem::File(name) => name,
            GalleryItem::Remote { id, .. } => id,
        }
    }

    /// URL the browser loads the image from.
    ///
    /// Local files go through `/images/{name}`, remote files through the
    /// streaming proxy at `/api/file/{id}`.
    pub fn src(&self) -> String {
        match self {
            GalleryItem::File(name) => format!("/images/{}", urlencoding::encode(name)),
            GalleryItem::Remote { id, .. } => format!("/api/file/{}", urlencoding::encode(id)),
        }
    }

    /// Same as [`src`](Self::src) but asks the server for an attachment.
    pub fn download_href(&self) -> String {
        format!("{}?download=1", self.src())
    }
}

/// A remote record as persisted in a manifest, with the extra metadata the
/// generator captures. Only `id` and `name` reach the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(
        rename = "modifiedTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_time: Option<String>,
}

/// One element of a manifest's `files` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Name(String),
    Record(RemoteRecord),
}

impl From<ManifestEntry> for GalleryItem {
    fn from(entry: ManifestEntry) -> Self {
        match entry {
            ManifestEntry::Name(name) => GalleryItem::File(name),
            ManifestEntry::Record(r) => GalleryItem::Remote {
                id: r.id,
                name: r.name,
            },
        }
    }
}

/// Persisted snapshot of a listing, written by the offline generators.
///
/// ```json
/// { "generatedAt": "2025-01-01T00:00:00Z", "count": 2, "files": ["a.png", "b.jpg"] }
/// ```
///
/// `count` is informational; readers trust `files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest stamped with the current time.
    pub fn new(files: Vec<ManifestEntry>) -> Self {
        Self {
            generated_at: Utc::now(),
            count: files.len(),
            files,
        }
    }

    pub fn into_items(self) -> Vec<GalleryItem> {
        self.files.into_iter().map(GalleryItem::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_item_urls_are_percent_encoded() {
        let item = GalleryItem::file("My File.png");
        assert_eq!(item.src(), "/images/My%20File.png");
        assert_eq!(item.download_href(), "/images/My%20File.png?download=1");
    }

    #[test]
    fn remote_item_goes_through_proxy() {
        let item = GalleryItem::remote("1AbC", "cat.jpg");
        assert_eq!(item.src(), "/api/file/1AbC");
        assert_eq!(item.name(), "cat.jpg");
        assert_eq!(item.key(), "1AbC");
    }

    #[test]
    fn manifest_accepts_bare_names() {
        let json = r#"{"generatedAt":"2025-03-01T10:00:00.000Z","count":2,"files":["a.png","b.jpg"]}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(
            manifest.into_items(),
            vec![GalleryItem::file("a.png"), GalleryItem::file("b.jpg")]
        );
    }

    #[test]
    fn manifest_accepts_remote_records() {
        let json = r#"{
            "generatedAt": "2025-03-01T10:00:00.000Z",
            "count": 1,
            "files": [{"id": "x1", "name": "cat.jpg", "size": 1024, "modifiedTime": "2025-02-01T00:00:00Z"}]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        match &manifest.files[0] {
            ManifestEntry::Record(r) => {
                assert_eq!(r.size, 1024);
                assert_eq!(r.modified_time.as_deref(), Some("2025-02-01T00:00:00Z"));
            }
            other => panic!("expected record, got {other:?}"),
        }
        assert_eq!(
            manifest.into_items(),
            vec![GalleryItem::remote("x1", "cat.jpg")]
        );
    }

    #[test]
    fn manifest_serializes_camel_case() {
        let manifest = Manifest::new(vec![ManifestEntry::Name("a.png".into())]);
        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert_eq!(json["count"], 1);
        assert_eq!(json["files"][0], "a.png");
    }
}
