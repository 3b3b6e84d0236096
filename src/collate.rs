//! Locale-aware filename comparison.
//!
//! Raw byte ordering puts `Zebra.png` before `apple.png` and `Écran.png`
//! after everything ASCII. Gallery listings are sorted the way a person reads
//! them instead, using a three-level comparison in the spirit of the Unicode
//! Collation Algorithm:
//!
//! 1. **Primary**: base letters, ignoring case and accents. Whitespace and
//!    punctuation sort before digits, digits before letters.
//! 2. **Secondary**: unaccented before accented (`e` < `é`).
//! 3. **Tertiary**: lowercase before uppercase (`a` < `A`).
//!
//! Names are compared in canonical decomposition (NFD), so `é` typed as one
//! code point and `e` followed by U+0301 sort the same way. Combining marks
//! carry no primary weight; they only mark the preceding letter as accented.
//!
//! Names that are still equal fall back to code point order so the result is
//! a total order and `sort_by` stays deterministic.
//!
//! ```text
//! apple.png  Apple.png  Écran.png  ecran2.png  zebra.png
//! ```

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Collation weights for one character.
#[derive(Debug, Clone, Copy)]
struct CharKey {
    /// 0 = whitespace/punctuation/symbols, 1 = digits, 2 = letters and the rest.
    class: u8,
    base: char,
    accented: bool,
    upper: bool,
}

impl CharKey {
    fn new(c: char) -> Self {
        let upper = c.is_uppercase();
        let lower = c.to_lowercase().next().unwrap_or(c);
        let (base, accented) = match fold_accent(lower) {
            Some(b) => (b, true),
            None => (lower, false),
        };
        let class = if base.is_alphabetic() {
            2
        } else if base.is_numeric() {
            1
        } else {
            0
        };
        Self {
            class,
            base,
            accented,
            upper,
        }
    }
}

/// Base letter for the lowercase Latin letters that have no canonical
/// decomposition (stroked and special forms). Everything else with an accent
/// is split into base + combining mark by NFD before it gets here.
fn fold_accent(c: char) -> Option<char> {
    let base = match c {
        'đ' => 'd',
        'ħ' => 'h',
        'ı' => 'i',
        'ŀ' | 'ł' => 'l',
        'ø' => 'o',
        'ß' => 's',
        'ŧ' => 't',
        _ => return None,
    };
    Some(base)
}

fn keys(s: &str) -> Vec<CharKey> {
    let mut keys: Vec<CharKey> = Vec::with_capacity(s.len());
    for c in s.nfd() {
        if is_combining_mark(c) {
            // A leading mark has nothing to attach to and is ignored.
            if let Some(last) = keys.last_mut() {
                last.accented = true;
            }
            continue;
        }
        keys.push(CharKey::new(c));
    }
    keys
}

/// Compare two display names with locale-aware semantics.
pub fn compare(a: &str, b: &str) -> Ordering {
    let ka = keys(a);
    let kb = keys(b);

    let primary = ka
        .iter()
        .map(|k| (k.class, k.base))
        .cmp(kb.iter().map(|k| (k.class, k.base)));
    if primary != Ordering::Equal {
        return primary;
    }

    ka.iter()
        .map(|k| k.accented)
        .cmp(kb.iter().map(|k| k.accented))
        .then_with(|| ka.iter().map(|k| k.upper).cmp(kb.iter().map(|k| k.upper)))
        .then_with(|| a.cmp(b))
}
