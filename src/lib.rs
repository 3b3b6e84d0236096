//! # Ember Gal
//!
//! A server-rendered image gallery. Point it at a directory of images, a
//! JSON manifest, or a Google Drive folder and it serves one searchable,
//! paginated page with a random featured image and per-image view and
//! download links.
//!
//! # Architecture: One Pipeline Per Request
//!
//! Every page render runs the same stateless pipeline:
//!
//! ```text
//! Source ──list──▶ Filter(q) ──▶ Order(sort|shuffle) ──┬──▶ Paginate(page, per) ──▶ Render
//!                                                      └──▶ Header pick + fallback chain
//! ```
//!
//! Remote images are not embedded in the page. Their URLs point at the
//! streaming proxy, which the browser calls once per image, out of band from
//! the page render:
//!
//! ```text
//! GET /api/file/{id} ──▶ metadata ──▶ media stream ──▶ headers + chunked body
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | The enumerator: `Local`, `Manifest` or `Remote`, one `list()` |
//! | [`scan`] | Local directory listing and the offline local manifest builder |
//! | [`manifest`] | Manifest JSON read/write |
//! | [`drive`] | `RemoteStore` capability and the Drive v3 client |
//! | [`credentials`] | Service-account identity from a key file or the environment |
//! | [`pager`] | Filter, order, paginate, header pick, fallback chain |
//! | [`collate`] | Locale-aware name comparison used by every sort |
//! | [`proxy`] | Streaming responses for remote and local files |
//! | [`render`] | Maud HTML for the gallery page |
//! | [`server`] | Axum router, shared state and HTTP error mapping |
//! | [`config`] | `gallery.toml` loading, env overrides, validation, CSS colors |
//! | [`types`] | `GalleryItem` and the manifest document |
//! | [`output`] | CLI output formatting for the batch commands |
//!
//! # Design Decisions
//!
//! ## Sanitize, Don't Reject
//!
//! Page parameters never produce an error page. `per` and `page` take the
//! leading integer of whatever was sent, fall back to defaults when that is
//! missing or not positive, and are clamped into range. A page past the end
//! shows the last page.
//!
//! ## Configuration Resolved Once
//!
//! All settings are resolved into a single [`config::GalleryConfig`] at
//! startup and passed explicitly. Request handlers never read the
//! environment or the filesystem for configuration.
//!
//! ## Lazy Remote Client
//!
//! The Drive client (credentials, signing key, HTTP pool) is built on the
//! first request that needs it and shared afterwards, so a local gallery
//! never touches service-account files.
//!
//! ## Streaming, Not Buffering
//!
//! The proxy forwards upstream chunks as they arrive and relies on hyper's
//! backpressure. A client disconnect drops the response body, which drops
//! the upstream stream and cancels the transfer. An upstream error aborts the
//! response instead of ending it cleanly.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/): templates are
//! checked at compile time and every interpolation is escaped, which matters
//! here because filenames come straight from disk or a remote folder.

pub mod collate;
pub mod config;
pub mod credentials;
pub mod drive;
pub mod manifest;
pub mod output;
pub mod pager;
pub mod proxy;
pub mod render;
pub mod scan;
pub mod server;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
