//! Filter, order, paginate and pick a header image.
//!
//! Every page render runs the same pipeline over the enumerated list:
//!
//! ```text
//! items ──filter(q)──▶ ordered ──paginate(page, per)──▶ PageResult
//!                        │
//!                        └──pick_header──▶ header pick + fallback chain
//! ```
//!
//! Nothing here fails. Malformed `page`/`per` values are sanitized to safe
//! defaults, an out-of-range page is clamped to the last page, and an empty
//! list yields `total = 0, total_pages = 1, page = 1`.
//!
//! ## Order policies
//!
//! - [`OrderPolicy::Sort`]: stable, locale-aware ascending order by name
//!   (see [`collate`](crate::collate)). Pagination is stable across
//!   requests with the same query. The header pick is a uniformly random
//!   item from the whole filtered set.
//! - [`OrderPolicy::Shuffle`]: a fresh unbiased permutation per request. The
//!   header pick is the first shuffled item. Paging through a shuffled
//!   gallery can show an image twice and skip others; that is the accepted
//!   price of variety.
//!
//! Random stages take `&mut R: Rng` so callers choose the source. The server
//! passes `OsRng`; tests pass a seeded `StdRng`.

use crate::collate;
use crate::types::GalleryItem;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Page size when the request has no usable `per`.
pub const DEFAULT_PAGE_SIZE: usize = 60;
/// Hard upper bound on `per`.
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    #[default]
    Sort,
    Shuffle,
}

/// Raw query string of the page route. Every field is kept as text so that
/// garbage like `?page=abc` is sanitized instead of rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub per: Option<String>,
    pub q: Option<String>,
}

impl PageQuery {
    /// Build from decoded query pairs. The first occurrence of a key wins and
    /// unknown keys are ignored, so no query string is ever rejected.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = PageQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "per" => &mut query.per,
                "q" => &mut query.q,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

/// Sanitized page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page, ≥ 1. Clamped to the page count later.
    pub page: usize,
    /// Page size in `[1, MAX_PAGE_SIZE]`.
    pub per: usize,
    /// Trimmed, non-empty search text.
    pub q: Option<String>,
}

impl PageRequest {
    pub fn from_query(query: &PageQuery, default_per: usize) -> Self {
        Self {
            page: sanitize_page(query.page.as_deref()),
            per: sanitize_per(query.per.as_deref(), default_per),
            q: normalize_query(query.q.as_deref()),
        }
    }
}

/// Parse the leading integer of `s`, like a browser's `parseInt`.
///
/// `"12"` → 12, `" 7px"` → 7, `"-3"` → -3, `"abc"` → None. Values too large
/// for `i64` saturate.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Positive integer or `default`, capped at [`MAX_PAGE_SIZE`].
pub fn sanitize_per(raw: Option<&str>, default: usize) -> usize {
    let fallback = default.clamp(1, MAX_PAGE_SIZE);
    match raw.and_then(parse_leading_int) {
        Some(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX).min(MAX_PAGE_SIZE),
        _ => fallback,
    }
}

/// Positive integer or 1.
pub fn sanitize_page(raw: Option<&str>) -> usize {
    match raw.and_then(parse_leading_int) {
        Some(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => 1,
    }
}

/// Trim the search text; blank becomes `None`.
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Filter
// ============================================================================

/// Keep items whose name contains `query`, case-insensitively.
///
/// A missing or blank query returns the input unchanged. Survivors keep
/// their relative order.
pub fn filter_items(mut items: Vec<GalleryItem>, query: Option<&str>) -> Vec<GalleryItem> {
    let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return items;
    };
    let needle = needle.to_lowercase();
    items.retain(|item| item.name().to_lowercase().contains(&needle));
    items
}

// ============================================================================
// Order
// ============================================================================

pub fn sort_items(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| collate::compare(a.name(), b.name()));
}

pub fn shuffle_items<R: Rng + ?Sized>(items: &mut [GalleryItem], rng: &mut R) {
    items.shuffle(rng);
}

pub fn order_items<R: Rng + ?Sized>(items: &mut [GalleryItem], policy: OrderPolicy, rng: &mut R) {
    match policy {
        OrderPolicy::Sort => sort_items(items),
        OrderPolicy::Shuffle => shuffle_items(items, rng),
    }
}

// ============================================================================
// Paginate
// ============================================================================

/// One page of an ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<GalleryItem>,
    pub total: usize,
    /// Effective page, in `[1, total_pages]`.
    pub page: usize,
    pub per: usize,
    /// `max(ceil(total / per), 1)`.
    pub total_pages: usize,
    /// Zero-based index of the first item on this page.
    pub start: usize,
    /// Exclusive end index, `min(start + per, total)`.
    pub end: usize,
}

impl Page {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `items` into the requested page.
///
/// `per` is clamped into `[1, MAX_PAGE_SIZE]`; `page` into
/// `[1, total_pages]`, so a page past the end returns the last page.
pub fn paginate(items: Vec<GalleryItem>, page: usize, per: usize) -> Page {
    let per = per.clamp(1, MAX_PAGE_SIZE);
    let total = items.len();
    let total_pages = total.div_ceil(per).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per;
    let end = (start + per).min(total);

    let items = items.into_iter().skip(start).take(end - start).collect();

    Page {
        items,
        total,
        page,
        per,
        total_pages,
        start,
        end,
    }
}

// ============================================================================
// Header pick
// ============================================================================

/// Choose the featured item from the full filtered, ordered list.
///
/// Sort mode draws a uniform index from `rng`; shuffle mode reuses the first
/// shuffled element so the hero and the grid come from the same draw.
pub fn pick_header<R: Rng + ?Sized>(
    items: &[GalleryItem],
    policy: OrderPolicy,
    rng: &mut R,
) -> Option<GalleryItem> {
    match policy {
        OrderPolicy::Sort => items.choose(rng).cloned(),
        OrderPolicy::Shuffle => items.first().cloned(),
    }
}

/// An image the browser may try for the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub src: String,
    pub name: String,
}

impl From<&GalleryItem> for Candidate {
    fn from(item: &GalleryItem) -> Self {
        Self {
            src: item.src(),
            name: item.name().to_string(),
        }
    }
}

/// Ordered header candidates with a cursor.
///
/// The pick comes first, followed by every other item. When the image at
/// the cursor fails to load, [`advance`](Self::advance) moves to the next
/// one; once the list is exhausted the placeholder is shown. The browser
/// script runs the same transitions over the serialized candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChain {
    candidates: Vec<Candidate>,
    cursor: usize,
}

impl FallbackChain {
    pub fn new(pick: Option<&GalleryItem>, items: &[GalleryItem]) -> Self {
        let Some(pick) = pick else {
            return Self {
                candidates: Vec::new(),
                cursor: 0,
            };
        };
        let mut candidates = Vec::with_capacity(items.len().max(1));
        candidates.push(Candidate::from(pick));
        candidates.extend(
            items
                .iter()
                .filter(|item| item.key() != pick.key())
                .map(Candidate::from),
        );
        Self {
            candidates,
            cursor: 0,
        }
    }

    pub fn current(&self) -> Option<&Candidate> {
        self.candidates.get(self.cursor)
    }

    /// Record a load failure of the current candidate and return the next
    /// one, or `None` when nothing is left.
    pub fn advance(&mut self) -> Option<&Candidate> {
        if self.cursor < self.candidates.len() {
            self.cursor += 1;
        }
        self.current()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.candidates.len()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything the page template needs.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub page: Page,
    pub query: Option<String>,
    pub header_pick: Option<GalleryItem>,
    pub fallback: FallbackChain,
}

/// Run filter → order → header pick → paginate over a fresh listing.
pub fn build_page<R: Rng + ?Sized>(
    items: Vec<GalleryItem>,
    request: &PageRequest,
    policy: OrderPolicy,
    rng: &mut R,
) -> PageResult {
    let mut items = filter_items(items, request.q.as_deref());
    order_items(&mut items, policy, rng);
    let header_pick = pick_header(&items, policy, rng);
    let fallback = FallbackChain::new(header_pick.as_ref(), &items);
    let page = paginate(items, request.page, request.per);

    tracing::debug!(
        total = page.total,
        page = page.page,
        total_pages = page.total_pages,
        query = request.q.as_deref().unwrap_or(""),
        "built gallery page"
    );

    PageResult {
        page,
        query: request.q.clone(),
        header_pick,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{files, names};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn numbered(n: usize) -> Vec<GalleryItem> {
        (0..n)
            .map(|i| GalleryItem::file(format!("img-{i:05}.png")))
            .collect()
    }

    // =========================================================================
    // Request sanitizing
    // =========================================================================

    #[test]
    fn parse_leading_int_like_parse_int() {
        assert_eq!(parse_leading_int("12"), Some(12));
        assert_eq!(parse_leading_int("  7px"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+4"), Some(4));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn per_defaults_and_caps() {
        assert_eq!(sanitize_per(None, 60), 60);
        assert_eq!(sanitize_per(Some("abc"), 60), 60);
        assert_eq!(sanitize_per(Some("0"), 60), 60);
        assert_eq!(sanitize_per(Some("-5"), 60), 60);
        assert_eq!(sanitize_per(Some("1"), 60), 1);
        assert_eq!(sanitize_per(Some("200"), 60), 200);
        assert_eq!(sanitize_per(Some("201"), 60), 200);
        assert_eq!(sanitize_per(Some("99999999999999999999"), 60), 200);
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(sanitize_page(None), 1);
        assert_eq!(sanitize_page(Some("0")), 1);
        assert_eq!(sanitize_page(Some("-2")), 1);
        assert_eq!(sanitize_page(Some("x")), 1);
        assert_eq!(sanitize_page(Some("4")), 4);
    }

    #[test]
    fn blank_query_is_none() {
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(normalize_query(Some(" cat ")), Some("cat".to_string()));
        assert_eq!(normalize_query(None), None);
    }

    #[test]
    fn query_pairs_first_wins() {
        let query = PageQuery::from_pairs(vec![
            ("page".to_string(), "2".to_string()),
            ("utm".to_string(), "x".to_string()),
            ("page".to_string(), "9".to_string()),
            ("q".to_string(), "cat".to_string()),
        ]);
        assert_eq!(query.page.as_deref(), Some("2"));
        assert_eq!(query.per, None);
        assert_eq!(query.q.as_deref(), Some("cat"));
    }

    #[test]
    fn request_from_raw_query() {
        let query = PageQuery {
            page: Some("3".into()),
            per: Some("500".into()),
            q: Some("  Fox ".into()),
        };
        assert_eq!(
            PageRequest::from_query(&query, 60),
            PageRequest {
                page: 3,
                per: 200,
                q: Some("Fox".into()),
            }
        );
    }

    // =========================================================================
    // Filter
    // =========================================================================

    #[test]
    fn filter_is_case_insensitive() {
        let out = filter_items(files(&["Foo.png"]), Some("foo"));
        assert_eq!(names(&out), vec!["Foo.png"]);
    }

    #[test]
    fn filter_without_query_is_identity() {
        let input = files(&["b.png", "a.png"]);
        assert_eq!(filter_items(input.clone(), None), input);
        assert_eq!(filter_items(input.clone(), Some("  ")), input);
    }

    #[test]
    fn filter_preserves_relative_order() {
        let out = filter_items(
            files(&["cat-2.png", "dog.png", "Cat-1.png", "bobcat.jpg"]),
            Some("CAT"),
        );
        assert_eq!(names(&out), vec!["cat-2.png", "Cat-1.png", "bobcat.jpg"]);
    }

    #[test]
    fn filter_is_idempotent() {
        let input = files(&["alpha.png", "Beta.jpg", "alphabet.gif", "gamma.webp"]);
        let once = filter_items(input, Some("alp"));
        let twice = filter_items(once.clone(), Some("alp"));
        assert_eq!(once, twice);
    }

    #[test]
    fn filter_matches_remote_names_not_ids() {
        let input = vec![
            GalleryItem::remote("fox-id", "cat.png"),
            GalleryItem::remote("abc", "fox.png"),
        ];
        let out = filter_items(input, Some("fox"));
        assert_eq!(out, vec![GalleryItem::remote("abc", "fox.png")]);
    }

    // =========================================================================
    // Order
    // =========================================================================

    #[test]
    fn sort_is_locale_aware() {
        let mut items = files(&["b.png", "a.jpg", "C.gif", "Á.png"]);
        sort_items(&mut items);
        assert_eq!(names(&items), vec!["a.jpg", "Á.png", "b.png", "C.gif"]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let original = numbered(50);
        let mut shuffled = original.clone();
        shuffle_items(&mut shuffled, &mut rng());

        assert_eq!(shuffled.len(), original.len());
        let mut sorted = shuffled.clone();
        sort_items(&mut sorted);
        assert_eq!(sorted, original);
    }

    #[test]
    fn shuffle_is_not_always_identity() {
        let original = numbered(10);
        let mut r = rng();
        let moved = (0..20).any(|_| {
            let mut s = original.clone();
            shuffle_items(&mut s, &mut r);
            s != original
        });
        assert!(moved);
    }

    // =========================================================================
    // Paginate
    // =========================================================================

    #[test]
    fn last_partial_page() {
        let page = paginate(numbered(125), 3, 60);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.start, 120);
        assert_eq!(page.end, 125);
        assert_eq!(page.items.len(), 5);
        assert!(page.has_prev());
        assert!(!page.has_next());
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let page = paginate(numbered(125), 99, 60);
        assert_eq!(page.page, 3);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn zero_page_clamps_to_first() {
        let page = paginate(numbered(10), 0, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.start, 0);
        assert!(!page.has_prev());
    }

    #[test]
    fn empty_list_has_one_page() {
        let page = paginate(Vec::new(), 5, 60);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.start, 0);
        assert_eq!(page.end, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn per_clamped_inside_paginate() {
        assert_eq!(paginate(numbered(5), 1, 0).per, 1);
        assert_eq!(paginate(numbered(5), 1, 10_000).per, MAX_PAGE_SIZE);
    }

    #[test]
    fn pages_reconstruct_the_list() {
        for n in [0usize, 1, 7, 60, 61, 199, 200, 401] {
            let items = numbered(n);
            for per in [1usize, 2, 7, 60, 199, 200] {
                let first = paginate(items.clone(), 1, per);
                assert_eq!(first.total_pages, n.div_ceil(per).max(1), "n={n} per={per}");

                let mut rebuilt = Vec::with_capacity(n);
                for p in 1..=first.total_pages {
                    rebuilt.extend(paginate(items.clone(), p, per).items);
                }
                assert_eq!(rebuilt, items, "n={n} per={per}");
            }
        }
    }

    // =========================================================================
    // Header pick and fallback chain
    // =========================================================================

    #[test]
    fn header_pick_empty_is_none() {
        assert_eq!(pick_header(&[], OrderPolicy::Sort, &mut rng()), None);
        assert_eq!(pick_header(&[], OrderPolicy::Shuffle, &mut rng()), None);
    }

    #[test]
    fn shuffle_header_is_first_item() {
        let items = files(&["x.png", "y.png", "z.png"]);
        assert_eq!(
            pick_header(&items, OrderPolicy::Shuffle, &mut rng()),
            Some(GalleryItem::file("x.png"))
        );
    }

    #[test]
    fn sort_header_comes_from_the_set() {
        let items = numbered(30);
        let mut r = rng();
        for _ in 0..50 {
            let pick = pick_header(&items, OrderPolicy::Sort, &mut r).unwrap();
            assert!(items.contains(&pick));
        }
    }

    #[test]
    fn fallback_chain_starts_with_pick_then_others() {
        let items = files(&["a.png", "b.png", "c.png"]);
        let pick = GalleryItem::file("b.png");
        let chain = FallbackChain::new(Some(&pick), &items);
        let order: Vec<&str> = chain.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["b.png", "a.png", "c.png"]);
        assert_eq!(chain.current().unwrap().src, "/images/b.png");
    }

    #[test]
    fn fallback_chain_advances_until_exhausted() {
        let items = files(&["a.png", "b.png"]);
        let mut chain = FallbackChain::new(items.first(), &items);
        assert!(!chain.is_exhausted());
        assert_eq!(chain.advance().map(|c| c.name.as_str()), Some("b.png"));
        assert_eq!(chain.advance(), None);
        assert!(chain.is_exhausted());
        assert_eq!(chain.advance(), None);
    }

    #[test]
    fn fallback_chain_without_pick_is_exhausted() {
        let chain = FallbackChain::new(None, &[]);
        assert!(chain.is_exhausted());
        assert!(chain.current().is_none());
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    #[test]
    fn directory_scenario_sorted() {
        let request = PageRequest {
            page: 1,
            per: 60,
            q: None,
        };
        let result = build_page(
            files(&["b.png", "a.jpg", "c.gif"]),
            &request,
            OrderPolicy::Sort,
            &mut rng(),
        );
        assert_eq!(names(&result.page.items), vec!["a.jpg", "b.png", "c.gif"]);
        assert!(result.header_pick.is_some());
        assert_eq!(result.fallback.candidates().len(), 3);
    }

    #[test]
    fn header_pick_covers_whole_filtered_set() {
        let request = PageRequest {
            page: 1,
            per: 1,
            q: Some("img".into()),
        };
        let mut r = rng();
        let mut off_page = false;
        for _ in 0..50 {
            let result = build_page(numbered(20), &request, OrderPolicy::Sort, &mut r);
            let pick = result.header_pick.unwrap();
            if !result.page.items.contains(&pick) {
                off_page = true;
            }
        }
        assert!(off_page);
    }

    #[test]
    fn shuffle_pipeline_features_first_grid_item() {
        let request = PageRequest {
            page: 1,
            per: 5,
            q: None,
        };
        let result = build_page(numbered(12), &request, OrderPolicy::Shuffle, &mut rng());
        assert_eq!(result.header_pick.as_ref(), result.page.items.first());
    }

    #[test]
    fn empty_pipeline() {
        let request = PageRequest {
            page: 4,
            per: 60,
            q: Some("nothing".into()),
        };
        let result = build_page(Vec::new(), &request, OrderPolicy::Sort, &mut rng());
        assert_eq!(result.page.total, 0);
        assert_eq!(result.page.total_pages, 1);
        assert_eq!(result.page.page, 1);
        assert!(result.header_pick.is_none());
        assert!(result.fallback.is_exhausted());
        assert_eq!(result.query.as_deref(), Some("nothing"));
    }
}
