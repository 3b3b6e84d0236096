//! HTML rendering for the gallery page.
//!
//! One page, server-rendered with [maud](https://maud.lambda.xyz/):
//!
//! ```text
//! ┌ nav ────────────────────────── brand · N files ┐
//! │ hero: title, tagline        │ header image      │
//! │ controls: search · per page · Reset · Apply     │
//! │ status: Showing a–b of N          Page p / P    │
//! ├ grid ───────────────────────────────────────────┤
//! │ card card card card …  (View · Download)        │
//! ├ pager ──────────────────────────── ← Prev Next →┤
//! └ footer ─────────────────────────────────────────┘
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: layout and theme (colors injected from config)
//! - `static/fallback.js`: walks the header fallback chain on load errors
//!
//! All text goes through maud's escaping; the only raw inserts are the
//! embedded assets.

use crate::config::{self, GalleryConfig};
use crate::pager::{Page, PageResult};
use crate::types::GalleryItem;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS_FALLBACK: &str = include_str!("../static/fallback.js");

/// Full stylesheet: config colors followed by the static rules.
pub fn stylesheet(config: &GalleryConfig) -> String {
    let color_css = config::generate_color_css(&config.colors);
    format!("{}\n\n{}", color_css, CSS_STATIC)
}

/// Inputs for [`render_gallery`] besides the pipeline result.
pub struct PageContext<'a> {
    pub title: &'a str,
    pub tagline: &'a str,
    /// Where items come from, shown in the empty state.
    pub source_hint: &'a str,
    pub css: &'a str,
    pub year: i32,
}

/// Query string for a page link. `q` is kept when present.
pub fn page_url(page: usize, per: usize, q: Option<&str>) -> String {
    let mut url = format!("?page={page}&per={per}");
    if let Some(q) = q {
        url.push_str("&q=");
        url.push_str(&urlencoding::encode(q));
    }
    url
}

/// `1234567` → `"1,234,567"`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn plural_files(n: usize) -> String {
    format!("{} file{}", format_count(n), if n == 1 { "" } else { "s" })
}

fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="color-scheme" content="light dark";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_nav(title: &str, total: usize) -> Markup {
    html! {
        nav.site-nav {
            div.wrap {
                a.brand href="/" {
                    span.brand-mark { "🔥" }
                    span { (title) }
                }
                div.nav-count {
                    span.tag { "gallery" }
                    " "
                    span { (plural_files(total)) }
                }
            }
        }
    }
}

fn hero_image(result: &PageResult) -> Markup {
    let placeholder = html! {
        div.hero-placeholder #hero-placeholder hidden[result.header_pick.is_some()] { "🦊" }
    };
    match &result.header_pick {
        Some(pick) => {
            let fallbacks = serde_json::to_string(result.fallback.candidates())
                .unwrap_or_else(|_| "[]".to_string());
            html! {
                div.hero-frame {
                    img #hero-img src=(pick.src()) alt=(pick.name())
                        loading="eager" decoding="async" data-fallbacks=(fallbacks);
                    (placeholder)
                    span.hero-badge #hero-name { (pick.name()) }
                }
            }
        }
        None => html! {
            div.hero-frame { (placeholder) }
        },
    }
}

fn controls(page: &Page, query: Option<&str>) -> Markup {
    let shown_from = if page.total == 0 { 0 } else { page.start + 1 };
    html! {
        div.controls {
            form method="get" action="/" {
                label.field {
                    span { "Search" }
                    input name="q" value=(query.unwrap_or("")) placeholder="filename...";
                }
                label.field {
                    span { "Per page" }
                    input name="per" value=(page.per) inputmode="numeric" pattern="[0-9]*";
                }
                div.actions {
                    a.btn href=(page_url(1, page.per, query)) { "Reset" }
                    button.btn.btn-primary type="submit" { "Apply" }
                }
            }
            div.status {
                span {
                    "Showing " b { (shown_from) } "–" b { (page.end) } " of " b { (page.total) }
                }
                span { "Page " b { (page.page) } " / " b { (page.total_pages) } }
            }
        }
    }
}

fn card(item: &GalleryItem) -> Markup {
    let src = item.src();
    html! {
        article.card {
            img src=(src) alt=(item.name()) loading="lazy" decoding="async";
            div.card-actions {
                div {
                    a href=(src) target="_blank" rel="noopener noreferrer" { "View" }
                    a.download href=(item.download_href()) download=(item.name()) { "Download" }
                }
            }
            div.card-bar {
                div.card-name title=(item.name()) { (item.name()) }
                span.tag { "img" }
            }
        }
    }
}

fn gallery(page: &Page, query: Option<&str>, source_hint: &str) -> Markup {
    html! {
        section.gallery.wrap #gallery {
            @if page.items.is_empty() {
                div.empty {
                    p {
                        "No images found. Drop files into "
                        code { (source_hint) }
                        @if query.is_some() {
                            " or clear your search query."
                        } @else {
                            "."
                        }
                    }
                }
            } @else {
                div.grid {
                    @for item in &page.items {
                        (card(item))
                    }
                }
            }
        }
    }
}

fn pager_link(label: &str, target: Option<usize>, page: &Page, query: Option<&str>) -> Markup {
    match target {
        Some(p) => html! {
            a.btn href=(page_url(p, page.per, query)) aria-disabled="false" { (label) }
        },
        None => html! {
            a.btn href="#" aria-disabled="true" tabindex="-1" { (label) }
        },
    }
}

fn pager(page: &Page, query: Option<&str>) -> Markup {
    let prev = page.has_prev().then(|| page.page - 1);
    let next = page.has_next().then(|| page.page + 1);
    html! {
        section.pager.wrap {
            div { "Page " b { (page.page) } " / " b { (page.total_pages) } }
            nav {
                (pager_link("← Prev", prev, page, query))
                (pager_link("Next →", next, page, query))
            }
        }
    }
}

fn footer(title: &str, year: i32) -> Markup {
    html! {
        footer.site-footer {
            div.wrap {
                span { "© " (year) " " (title) }
                span.muted { "Fire theme • Dark/Light • Pagination-ready" }
            }
        }
    }
}

/// Render the gallery page for one pipeline result.
pub fn render_gallery(ctx: &PageContext<'_>, result: &PageResult) -> Markup {
    let page = &result.page;
    let query = result.query.as_deref();
    let content = html! {
        div.flames { span {} span {} span {} }
        (site_nav(ctx.title, page.total))
        header.hero.wrap {
            div.hero-grid {
                div {
                    h1 {
                        span.title { (ctx.title) }
                        span.tagline { (ctx.tagline) }
                    }
                    p {
                        "Browse with search and pagination. Hover any card to "
                        strong { "view" } " or " strong { "download" } "."
                    }
                }
                (hero_image(result))
            }
            (controls(page, query))
        }
        (gallery(page, query, ctx.source_hint))
        (pager(page, query))
        (footer(ctx.title, ctx.year))
        script { (PreEscaped(JS_FALLBACK)) }
    };
    base_document(ctx.title, ctx.css, content)
}
