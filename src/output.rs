//! CLI output formatting for the batch commands.
//!
//! # Output Format
//!
//! ## Manifest
//!
//! ```text
//! Manifest → public/images-manifest.json
//! 001 a.jpg
//! 002 b.png
//!     Source: 1AbCd (2.4 MB, 2025-02-01T10:00:00.000Z)
//!
//! Wrote 2 entries
//! ```
//!
//! Remote records get an indented `Source:` line with the file id and the
//! metadata the generator captured.
//!
//! ## Check
//!
//! ```text
//! Source: local (public/images)
//!     Order: sort, 60 per page
//!     Items: 3
//! 001 a.jpg
//! 002 b.png
//! 003 c.gif
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::GalleryConfig;
use crate::pager::OrderPolicy;
use crate::types::{GalleryItem, Manifest, ManifestEntry};
use std::path::Path;

/// How many items `check` lists before eliding the rest.
pub const CHECK_PREVIEW: usize = 20;

/// Zero-padded 1-based position.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn order_label(order: OrderPolicy) -> &'static str {
    match order {
        OrderPolicy::Sort => "sort",
        OrderPolicy::Shuffle => "shuffle",
    }
}

// ============================================================================
// Manifest generation
// ============================================================================

pub fn format_manifest_output(manifest: &Manifest, out: &Path) -> Vec<String> {
    let mut lines = vec![format!("Manifest \u{2192} {}", out.display())];

    for (i, entry) in manifest.files.iter().enumerate() {
        match entry {
            ManifestEntry::Name(name) => {
                lines.push(format!("{} {}", format_index(i + 1), name));
            }
            ManifestEntry::Record(record) => {
                lines.push(format!("{} {}", format_index(i + 1), record.name));
                let modified = record
                    .modified_time
                    .as_deref()
                    .map(|t| format!(", {}", t))
                    .unwrap_or_default();
                lines.push(format!(
                    "{}Source: {} ({}{})",
                    indent(1),
                    record.id,
                    format_size(record.size),
                    modified
                ));
            }
        }
    }

    lines.push(String::new());
    let noun = if manifest.count == 1 { "entry" } else { "entries" };
    lines.push(format!("Wrote {} {}", manifest.count, noun));
    lines
}

pub fn print_manifest_output(manifest: &Manifest, out: &Path) {
    for line in format_manifest_output(manifest, out) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(
    config: &GalleryConfig,
    location: &str,
    items: &[GalleryItem],
) -> Vec<String> {
    let mut lines = vec![
        format!("Source: {} ({})", config.source.kind.as_str(), location),
        format!(
            "{}Order: {}, {} per page",
            indent(1),
            order_label(config.gallery.order),
            config.gallery.default_per
        ),
        format!("{}Items: {}", indent(1), items.len()),
    ];

    for (i, item) in items.iter().take(CHECK_PREVIEW).enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), item.name()));
    }
    if items.len() > CHECK_PREVIEW {
        lines.push(format!("... and {} more", items.len() - CHECK_PREVIEW));
    }
    lines
}

pub fn print_check_output(config: &GalleryConfig, location: &str, items: &[GalleryItem]) {
    for line in format_check_output(config, location, items) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
