//! Gallery configuration module.
//!
//! Configuration is resolved **once** at process start into a
//! [`GalleryConfig`] and handed to the enumerator, renderer and proxy by
//! reference. Nothing reads the environment or the config file while serving
//! a request.
//!
//! Resolution order (later wins):
//!
//! ```text
//! stock defaults  →  gallery.toml  →  environment (.env.local, .env, process)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [source]
//! kind = "local"                              # local | manifest | drive
//! dir = "public/images"                       # local image directory
//! manifest = "public/images-manifest.json"    # manifest document
//! reload_manifest = true                      # re-read per request
//! folder_id = ""                              # Drive folder (kind = "drive")
//!
//! [gallery]
//! order = "sort"                              # sort | shuffle
//! default_per = 60
//! title = "Ember Gallery"
//! tagline = "blazing red • modern • download-ready"
//!
//! [remote]
//! credentials = "file"                        # file | env
//! service_account = "secrets/service-account.json"
//! timeout_secs = 30
//!
//! [colors.light]
//! background = "#ffffff"
//! ...
//! ```
//!
//! ## Environment
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `GALLERY_BIND` | `server.bind` |
//! | `GALLERY_SOURCE` | `source.kind` |
//! | `GALLERY_IMAGE_DIR` | `source.dir` |
//! | `GALLERY_MANIFEST` | `source.manifest` |
//! | `DRIVE_FOLDER_ID` | `source.folder_id` |
//! | `GALLERY_ORDER` | `gallery.order` |
//! | `GALLERY_CREDENTIALS` | `remote.credentials` |
//!
//! Unknown keys in the file are rejected to catch typos early.

use crate::pager::{MAX_PAGE_SIZE, OrderPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Which backend enumerates the gallery.
    pub source: SourceConfig,
    /// Ordering and paging defaults, page text.
    pub gallery: GalleryOptions,
    /// Remote API client settings.
    pub remote: RemoteConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gallery.default_per == 0 || self.gallery.default_per > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation(format!(
                "gallery.default_per must be 1-{MAX_PAGE_SIZE}"
            )));
        }
        if self.source.kind == SourceKind::Drive && self.source.folder_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.folder_id is required when source.kind = \"drive\"".into(),
            ));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "remote.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Backend strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Scan `source.dir` on every request.
    #[default]
    Local,
    /// Read the JSON manifest at `source.manifest`.
    Manifest,
    /// List `source.folder_id` through the Drive API.
    Drive,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Manifest => "manifest",
            SourceKind::Drive => "drive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Local image directory. Also serves `/images/{name}`.
    pub dir: PathBuf,
    /// Manifest document path.
    pub manifest: PathBuf,
    /// Re-read the manifest on every request. When false it is read once at
    /// startup and kept for the lifetime of the process.
    pub reload_manifest: bool,
    /// Parent folder id for the Drive backend.
    pub folder_id: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            dir: PathBuf::from("public/images"),
            manifest: PathBuf::from("public/images-manifest.json"),
            reload_manifest: true,
            folder_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryOptions {
    pub order: OrderPolicy,
    /// Page size used when the request does not carry a usable `per`.
    pub default_per: usize,
    pub title: String,
    pub tagline: String,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            order: OrderPolicy::Sort,
            default_per: crate::pager::DEFAULT_PAGE_SIZE,
            title: "Ember Gallery".to_string(),
            tagline: "blazing red • modern • download-ready".to_string(),
        }
    }
}

/// Where the service-account identity comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// JSON key file at `remote.service_account`.
    #[default]
    File,
    /// `GOOGLE_CLIENT_EMAIL` / `GOOGLE_PRIVATE_KEY`.
    Env,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub credentials: CredentialSource,
    pub service_account: PathBuf,
    /// Upper bound for each API call (for media: until response headers).
    pub timeout_secs: u64,
    pub api_base: String,
    pub token_uri: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialSource::File,
            service_account: PathBuf::from("secrets/service-account.json"),
            timeout_secs: 30,
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Light mode color scheme.
    pub light: ColorScheme,
    /// Dark mode color scheme.
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    /// Page background.
    pub background: String,
    /// Card and panel background.
    pub surface: String,
    /// Primary text color.
    pub text: String,
    /// Muted/secondary text color (counts, status line, footer).
    pub text_muted: String,
    /// Border color.
    pub border: String,
    /// Accent used for buttons, badges and hover rings.
    pub accent: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            surface: "#ffffff".to_string(),
            text: "#18181b".to_string(),
            text_muted: "#52525b".to_string(),
            border: "#e4e4e7".to_string(),
            accent: "#dc2626".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#09090b".to_string(),
            surface: "#18181b".to_string(),
            text: "#f4f4f5".to_string(),
            text_muted: "#a1a1aa".to_string(),
            border: "#27272a".to_string(),
            accent: "#ef4444".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value and deserialize.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Apply environment overrides. `lookup` abstracts `std::env::var` so tests
/// can pass a fixed map.
pub fn apply_env_overrides(
    config: &mut GalleryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(bind) = get("GALLERY_BIND") {
        config.server.bind = bind;
    }
    if let Some(kind) = get("GALLERY_SOURCE") {
        config.source.kind = match kind.trim().to_ascii_lowercase().as_str() {
            "local" => SourceKind::Local,
            "manifest" => SourceKind::Manifest,
            "drive" => SourceKind::Drive,
            _ => {
                return Err(ConfigError::Env {
                    var: "GALLERY_SOURCE",
                    value: kind,
                });
            }
        };
    }
    if let Some(dir) = get("GALLERY_IMAGE_DIR") {
        config.source.dir = PathBuf::from(dir);
    }
    if let Some(manifest) = get("GALLERY_MANIFEST") {
        config.source.manifest = PathBuf::from(manifest);
    }
    if let Some(folder) = get("DRIVE_FOLDER_ID") {
        config.source.folder_id = folder;
    }
    if let Some(credentials) = get("GALLERY_CREDENTIALS") {
        config.remote.credentials = match credentials.trim().to_ascii_lowercase().as_str() {
            "file" => CredentialSource::File,
            "env" => CredentialSource::Env,
            _ => {
                return Err(ConfigError::Env {
                    var: "GALLERY_CREDENTIALS",
                    value: credentials,
                });
            }
        };
    }
    if let Some(order) = get("GALLERY_ORDER") {
        config.gallery.order = match order.trim().to_ascii_lowercase().as_str() {
            "sort" => OrderPolicy::Sort,
            "shuffle" => OrderPolicy::Shuffle,
            _ => {
                return Err(ConfigError::Env {
                    var: "GALLERY_ORDER",
                    value: order,
                });
            }
        };
    }
    Ok(())
}

/// Load config from a TOML file, then the process environment.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// applies environment overrides and validates the result.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let mut config = resolve_config(base, overlay)?;
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Ember Gallery Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Environment variables (also read from .env.local and .env) override
# the file: GALLERY_BIND, GALLERY_SOURCE, GALLERY_IMAGE_DIR,
# GALLERY_MANIFEST, DRIVE_FOLDER_ID, GALLERY_ORDER, GALLERY_CREDENTIALS.

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
bind = "0.0.0.0:3000"

# ---------------------------------------------------------------------------
# Where images come from
# ---------------------------------------------------------------------------
[source]
# local    - scan `dir` on every request
# manifest - read the JSON manifest written by `ember-gal manifest`
#            or `ember-gal drive-manifest`
# drive    - list `folder_id` through the Google Drive API
kind = "local"

# Local image directory (png, jpg, jpeg, webp, gif, avif).
dir = "public/images"

# Manifest document.
manifest = "public/images-manifest.json"

# Re-read the manifest on every request. Set to false to read it once at
# startup.
reload_manifest = true

# Google Drive folder id (required when kind = "drive").
folder_id = ""

# ---------------------------------------------------------------------------
# Gallery behaviour
# ---------------------------------------------------------------------------
[gallery]
# sort    - stable, locale-aware name order; header image is random
# shuffle - new random order on every request; header image is the first
#           item. Page 2 is not stable relative to page 1 in this mode.
order = "sort"

# Page size when the request has no usable `per` (max 200).
default_per = 60

title = "Ember Gallery"
tagline = "blazing red • modern • download-ready"

# ---------------------------------------------------------------------------
# Remote API (Google Drive)
# ---------------------------------------------------------------------------
[remote]
# file - read `service_account` JSON (client_email, private_key)
# env  - read GOOGLE_CLIENT_EMAIL and GOOGLE_PRIVATE_KEY
credentials = "file"
service_account = "secrets/service-account.json"

# Upper bound in seconds for each API call. Media downloads are bounded
# until the response headers arrive; the body then streams untimed.
timeout_secs = 30

api_base = "https://www.googleapis.com/drive/v3"
token_uri = "https://oauth2.googleapis.com/token"

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#ffffff"
surface = "#ffffff"
text = "#18181b"
text_muted = "#52525b"
border = "#e4e4e7"
accent = "#dc2626"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#09090b"
surface = "#18181b"
text = "#f4f4f5"
text_muted = "#a1a1aa"
border = "#27272a"
accent = "#ef4444"
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {light_bg};
    --color-surface: {light_surface};
    --color-text: {light_text};
    --color-text-muted: {light_text_muted};
    --color-border: {light_border};
    --color-accent: {light_accent};
}}

@media (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {dark_bg};
        --color-surface: {dark_surface};
        --color-text: {dark_text};
        --color-text-muted: {dark_text_muted};
        --color-border: {dark_border};
        --color-accent: {dark_accent};
    }}
}}"#,
        light_bg = colors.light.background,
        light_surface = colors.light.surface,
        light_text = colors.light.text,
        light_text_muted = colors.light.text_muted,
        light_border = colors.light.border,
        light_accent = colors.light.accent,
        dark_bg = colors.dark.background,
        dark_surface = colors.dark.surface,
        dark_text = colors.dark.text,
        dark_text_muted = colors.dark.text_muted,
        dark_border = colors.dark.border,
        dark_accent = colors.dark.accent,
    )
}
