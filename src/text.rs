use ahash::AHashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use {once_cell::sync::Lazy, regex::Regex};

// Trailing " - EN" style language tags on localized titles.
static LANG_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-\u{2013}\u{2014}]\s*[A-Za-z]{1,2}\s*$").unwrap());
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

/// Matching key for titles. Strips a trailing two-letter language suffix and
/// bracketed annotations, drops parenthesis characters (content kept), folds
/// diacritics, then collapses everything outside `[a-z0-9]` to single spaces.
///
/// Idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize_title(raw: &str) -> String {
    let stripped = LANG_SUFFIX_RE.replace(raw, "");
    let stripped = stripped.replace(['(', ')'], " ");
    let lowered = stripped.to_lowercase();
    let folded: String = lowered.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let unbracketed = BRACKET_RE.replace_all(&folded, " ");
    collapse_ascii(&unbracketed)
}

/// Matching key for sheet names and header labels: lowercase with
/// non-alphanumeric runs collapsed. No diacritic folding; tab names in
/// practice are plain ASCII and the cheap form keeps scores stable.
pub fn normalize_ident(raw: &str) -> String {
    collapse_ascii(&raw.to_lowercase())
}

fn collapse_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_gap = false;
    for ch in input.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_gap && !out.is_empty() {
                out.push(' ');
            }
            pending_gap = false;
            out.push(ch);
        } else {
            pending_gap = true;
        }
    }
    out
}

pub fn tokens(normalized: &str) -> AHashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Dice coefficient over whitespace token sets, rounded onto 0-100.
pub fn token_set_score(a_normalized: &str, b_normalized: &str) -> u32 {
    let a = tokens(a_normalized);
    let b = tokens(b_normalized);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let shared = a.intersection(&b).count();
    ((200 * shared) as f64 / (a.len() + b.len()) as f64).round() as u32
}

/// Token-set score between two raw sheet/identifier names.
pub fn sheet_name_score(a: &str, b: &str) -> u32 {
    token_set_score(&normalize_ident(a), &normalize_ident(b))
}

/// Token-set score between two raw titles, using the full normalizer.
pub fn title_score(a: &str, b: &str) -> u32 {
    token_set_score(&normalize_title(a), &normalize_title(b))
}
