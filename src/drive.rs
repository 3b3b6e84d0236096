//! Remote folder backend (Google Drive v3).
//!
//! The gallery needs three capabilities from the remote store, captured by
//! [`RemoteStore`]:
//!
//! | Call         | Drive endpoint                   | Used by              |
//! |--------------|----------------------------------|----------------------|
//! | `list_page`  | `GET /files?q=…&pageToken=…`     | enumerator, generator|
//! | `metadata`   | `GET /files/{id}?fields=…`       | streaming proxy      |
//! | `media`      | `GET /files/{id}?alt=media`      | streaming proxy      |
//!
//! [`DriveClient`] implements them over `reqwest`. Authentication is the
//! OAuth2 service-account flow: a short-lived RS256 assertion is exchanged
//! for a bearer token, which is cached and refreshed a minute before it
//! expires.
//!
//! The client is built lazily on first use through [`LazyRemote`] and then
//! shared by every request. Tests swap in a fake store with
//! [`LazyRemote::with_store`].
//!
//! Every JSON call carries the configured timeout. Media downloads apply it
//! to the response headers only; once bytes flow the transfer is unbounded.

use crate::collate;
use crate::config::RemoteConfig;
use crate::credentials::{self, CredentialsError, ServiceAccount};
use crate::types::{GalleryItem, RemoteRecord};
use async_trait::async_trait;
use axum::body::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Deserializer, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const LIST_FIELDS: &str = "nextPageToken, files(id,name,mimeType,size,modifiedTime)";
const META_FIELDS: &str = "id,name,mimeType,size";
const LIST_PAGE_SIZE: u32 = 1000;
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RemoteError>> + Send + 'static>>;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("credentials: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("invalid service account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote file not found: {0}")]
    NotFound(String),
    #[error("remote API did not answer within {0:?}")]
    Timeout(Duration),
    #[error("stream error: {0}")]
    Stream(String),
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl RemoteFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn to_item(&self) -> GalleryItem {
        GalleryItem::remote(&self.id, &self.name)
    }

    /// Manifest record; unknown size becomes 0.
    pub fn to_record(&self) -> RemoteRecord {
        RemoteRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            size: self.size.unwrap_or(0),
            modified_time: self.modified_time.clone(),
        }
    }
}

/// One page of `files.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePage {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// The metadata the proxy needs for its response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
}

/// Drive sends `size` as a decimal string; accept a number too.
fn lenient_size<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// File-list / get / get-media over an authenticated remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One page of non-trashed image children of `folder_id`. Callers still
    /// check the MIME type of each entry.
    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError>;

    async fn metadata(&self, id: &str) -> Result<FileMeta, RemoteError>;

    /// Open the content of `id` as a byte stream. Dropping the stream
    /// cancels the upstream transfer.
    async fn media(&self, id: &str) -> Result<ByteStream, RemoteError>;
}

/// Every image in `folder_id`, across all pages, sorted by name.
pub async fn list_folder(
    store: &dyn RemoteStore,
    folder_id: &str,
) -> Result<Vec<RemoteFile>, RemoteError> {
    let mut files = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = store.list_page(folder_id, token.as_deref()).await?;
        pages += 1;
        files.extend(page.files.into_iter().filter(RemoteFile::is_image));
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    files.sort_by(|a, b| collate::compare(&a.name, &b.name));
    tracing::info!(folder_id, pages, images = files.len(), "listed remote folder");
    Ok(files)
}

// ============================================================================
// Drive REST client
// ============================================================================

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

pub struct DriveClient {
    http: reqwest::Client,
    client_email: String,
    key: EncodingKey,
    api_base: String,
    token_uri: String,
    timeout: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl DriveClient {
    pub fn new(account: ServiceAccount, config: &RemoteConfig) -> Result<Self, RemoteError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("ember-gal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            client_email: account.client_email,
            key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_uri: config.token_uri.clone(),
            timeout: config.timeout(),
            token: Mutex::new(None),
        })
    }

    fn assertion(&self) -> Result<String, RemoteError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    /// Current bearer token, exchanging a fresh assertion when needed.
    async fn bearer(&self) -> Result<String, RemoteError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let assertion = self.assertion()?;
        let resp = self
            .http
            .post(&self.token_uri)
            .timeout(self.timeout)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body: TokenResponse = check_status(resp, "token").await?.json().await?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!(expires_in = body.expires_in, "obtained access token");
        *guard = Some(CachedToken {
            value: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(body.access_token)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.api_base, urlencoding::encode(id))
    }
}

/// Map non-2xx responses to errors; 404 becomes [`RemoteError::NotFound`].
async fn check_status(
    resp: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(what.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, RemoteError> {
        let token = self.bearer().await?;
        let q = format!(
            "'{}' in parents and trashed = false and mimeType contains 'image/'",
            folder_id.replace('\'', "\\'")
        );
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("q", q.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", page_size.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(t) = page_token {
            query.push(("pageToken", t));
        }

        let resp = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(check_status(resp, folder_id).await?.json().await?)
    }

    async fn metadata(&self, id: &str) -> Result<FileMeta, RemoteError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(self.file_url(id))
            .bearer_auth(token)
            .query(&[("fields", META_FIELDS), ("supportsAllDrives", "true")])
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(check_status(resp, id).await?.json().await?)
    }

    async fn media(&self, id: &str) -> Result<ByteStream, RemoteError> {
        let token = self.bearer().await?;
        let request = self
            .http
            .get(self.file_url(id))
            .bearer_auth(token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send();
        let resp = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| RemoteError::Timeout(self.timeout))??;
        let resp = check_status(resp, id).await?;
        Ok(resp.bytes_stream().map_err(RemoteError::from).boxed())
    }
}

// ============================================================================
// Lazy shared handle
// ============================================================================

/// Process-wide remote store, built on first use.
///
/// Initialization runs at most once even under concurrent first requests;
/// a failed attempt is retried by the next caller.
pub struct LazyRemote {
    cell: OnceCell<Arc<dyn RemoteStore>>,
    config: RemoteConfig,
}

impl LazyRemote {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            cell: OnceCell::new(),
            config,
        }
    }

    /// A handle that is already initialized with `store`.
    pub fn with_store(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(store)),
            config: RemoteConfig::default(),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        let store = self
            .cell
            .get_or_try_init(|| async {
                let account = credentials::load(&self.config)?;
                let client = DriveClient::new(account, &self.config)?;
                tracing::info!(api_base = %self.config.api_base, "remote client ready");
                Ok::<Arc<dyn RemoteStore>, RemoteError>(Arc::new(client))
            })
            .await?;
        Ok(Arc::clone(store))
    }
}
