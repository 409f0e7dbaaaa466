//! Small helpers: version ordering, case-insensitive matching and config paths.

/// Per-user config and cache directories.
pub mod paths;

use std::cmp::Ordering;
use std::fmt::Write;

pub use paths::{cache_dir, config_dir, logs_dir};

/// What: Compare dotted version strings numerically.
///
/// Inputs:
/// - `a`: Left-hand version.
/// - `b`: Right-hand version.
///
/// Output:
/// - `Ordering` indicating which version is greater.
///
/// Details:
/// - Splits the release part on `.`, comparing numeric segments when possible
///   and falling back to lexicographical comparison.
/// - A release sorts after its own pre-release (`1.0.0` > `1.0.0-preview.2`).
/// - A blank version sorts below every non-blank one.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    let (a_core, a_pre) = split_prerelease(a);
    let (b_core, b_pre) = split_prerelease(b);
    let a_parts: Vec<&str> = a_core.split('.').collect();
    let b_parts: Vec<&str> = b_core.split('.').collect();
    let len = a_parts.len().max(b_parts.len());

    for idx in 0..len {
        let a_seg = a_parts.get(idx).copied().unwrap_or("0");
        let b_seg = b_parts.get(idx).copied().unwrap_or("0");
        match compare_segment(a_seg, b_seg) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }

    match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(ap), Some(bp)) => {
            let a_parts: Vec<&str> = ap.split(['.', '-']).collect();
            let b_parts: Vec<&str> = bp.split(['.', '-']).collect();
            for idx in 0..a_parts.len().max(b_parts.len()) {
                match (a_parts.get(idx), b_parts.get(idx)) {
                    (Some(x), Some(y)) => match compare_segment(x, y) {
                        Ordering::Equal => {}
                        ord => return ord,
                    },
                    (Some(_), None) => return Ordering::Greater,
                    (None, Some(_)) => return Ordering::Less,
                    (None, None) => break,
                }
            }
            Ordering::Equal
        }
    }
}

/// Split `1.2.3-preview.4` into `("1.2.3", Some("preview.4"))`.
fn split_prerelease(v: &str) -> (&str, Option<&str>) {
    v.split_once('-')
        .map_or((v, None), |(core, pre)| (core, Some(pre)))
}

/// Numeric-aware comparison of one version segment.
fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// What: Case-insensitive substring test.
///
/// Inputs:
/// - `haystack`: Text to search in.
/// - `needle_lower`: Query, already lower-cased.
///
/// Output:
/// - `true` when `needle_lower` is empty or occurs in `haystack` ignoring case.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    needle_lower.is_empty() || haystack.to_lowercase().contains(needle_lower)
}

/// What: Percent-encode a string for use in URLs according to RFC 3986.
///
/// Details:
/// - Unreserved characters (`A-Z`, `a-z`, `0-9`, `-`, `.`, `_`, `~`) are left as-is.
/// - Space is encoded as `%20` (not `+`); every other byte is hex-escaped.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push_str("%20"),
            _ => {
                out.push('%');
                let _ = write!(out, "{b:02X}");
            }
        }
    }
    out
}

/// What: Strip trailing `#`/`//` comments from a config value.
///
/// Details:
/// - A leading `#` is treated as part of the value (e.g. colour-like strings).
pub(crate) fn strip_inline_comment(mut s: &str) -> &str {
    if let Some(i) = s.find("//") {
        s = &s[..i];
    }
    if let Some(i_rel) = if let Some(stripped) = s.strip_prefix('#') {
        stripped.find('#').map(|j| j + 1)
    } else {
        s.find('#')
    } {
        s = &s[..i_rel];
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Numeric segments compare by value, not lexically.
    ///
    /// Inputs:
    /// - Pairs such as `1.10.0` vs `1.9.0` and `2.0` vs `2.0.0`.
    ///
    /// Output:
    /// - Greater/equal results that match semantic intuition.
    fn compare_versions_numeric_segments() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("0.1.0", "0.2.0"), Ordering::Less);
    }

    #[test]
    /// What: Pre-release tags sort below the matching release.
    fn compare_versions_prerelease_orders_below_release() {
        assert_eq!(compare_versions("1.0.0-preview.2", "1.0.0"), Ordering::Less);
        assert_eq!(
            compare_versions("1.0.0-preview.10", "1.0.0-preview.2"),
            Ordering::Greater
        );
        assert_eq!(compare_versions("1.0.1-preview", "1.0.0"), Ordering::Greater);
    }

    #[test]
    /// What: A missing version never outranks a real one.
    ///
    /// Inputs:
    /// - Blank and whitespace-only versions against numeric and non-numeric ones.
    ///
    /// Output:
    /// - Blank sorts lowest; two blanks are equal.
    fn compare_versions_blank_sorts_lowest() {
        assert_eq!(compare_versions("", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", ""), Ordering::Greater);
        assert_eq!(compare_versions(" ", "beta"), Ordering::Less);
        assert_eq!(compare_versions("", " "), Ordering::Equal);
    }

    #[test]
    /// What: Inline comments are removed while keeping leading `#` values.
    fn strip_inline_comment_variants() {
        assert_eq!(strip_inline_comment("installed # group"), "installed");
        assert_eq!(strip_inline_comment("true // yes"), "true");
        assert_eq!(strip_inline_comment("#abc # note"), "#abc");
    }

    #[test]
    /// What: Reserved characters and spaces are escaped.
    fn percent_encode_escapes_reserved() {
        assert_eq!(percent_encode("com.example tween"), "com.example%20tween");
        assert_eq!(percent_encode("a&b/c"), "a%26b%2Fc");
    }

    #[test]
    /// What: Empty needle matches everything; matching ignores case.
    fn contains_ignore_case_basics() {
        assert!(contains_ignore_case("Tween Engine", ""));
        assert!(contains_ignore_case("Tween Engine", "engine"));
        assert!(!contains_ignore_case("Tween Engine", "physics"));
    }
}
