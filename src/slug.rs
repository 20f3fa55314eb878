//! Slug conversion of path elements

use unicode_normalization::UnicodeNormalization;

/// Characters that can not be part of a path element
const RESERVED: [char; 4] = ['/', '\\', '?', '#'];

/// Convert a name into a path element
///
/// - Unicode normalization (NFC)
/// - Reserved characters and control characters are removed
/// - Whitespace is collapsed into a single `-`
/// - Leading and trailing `-` are removed
///
/// Falls back to `default` when nothing is left
pub fn convert(text: &str, default: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for ch in text.nfc() {
        if RESERVED.contains(&ch) || ch.is_control() {
            continue;
        }

        if ch.is_whitespace() || ch == '-' {
            pending_separator = !slug.is_empty();
            continue;
        }

        if pending_separator {
            slug.push('-');
            pending_separator = false;
        }

        slug.push(ch);
    }

    if slug.is_empty() {
        default.to_string()
    } else {
        slug
    }
}
