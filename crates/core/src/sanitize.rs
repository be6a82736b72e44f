//! Filename sanitization.
//!
//! Colons and pipes are swapped for look-alike characters so the information
//! survives; the remaining reserved characters and control characters are
//! removed. The same character mapping is used when building counter regexes
//! so patterns match names as they exist on disk.

use unicode_normalization::UnicodeNormalization;

/// Stand-in for `:` (U+A789 MODIFIER LETTER COLON).
pub const COLON_SUBSTITUTE: char = '\u{A789}';

/// Stand-in for `|` (U+2223 DIVIDES).
pub const PIPE_SUBSTITUTE: char = '\u{2223}';

/// Characters that cannot appear in a filename on common filesystems.
pub const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Reserved characters with no substitute; these are dropped.
const STRIPPED_CHARS: &[char] = &['/', '\\', '*', '?', '"', '<', '>'];

/// Sanitize a full filename (without extension).
///
/// Steps, in order:
/// 1. `:` and `|` replaced by [`COLON_SUBSTITUTE`] / [`PIPE_SUBSTITUTE`]
/// 2. other reserved characters and control characters removed
/// 3. NFC normalization
/// 4. whitespace runs collapsed to a single space
/// 5. leading/trailing dots and whitespace trimmed
///
/// Idempotent: `sanitize_filename(&sanitize_filename(s)) == sanitize_filename(s)`.
pub fn sanitize_filename(input: &str) -> String {
    sanitize_fragment(input)
        .trim_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// Apply the character mapping of [`sanitize_filename`] without trimming the
/// edges. Used for pieces of a name (literal text between placeholders).
pub fn sanitize_fragment(input: &str) -> String {
    let mapped: String = input
        .nfc()
        .filter_map(|c| match c {
            ':' => Some(COLON_SUBSTITUTE),
            '|' => Some(PIPE_SUBSTITUTE),
            c if c.is_whitespace() => Some(' '),
            c if STRIPPED_CHARS.contains(&c) || c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let mut out = String::with_capacity(mapped.len());
    let mut last_was_space = false;
    for c in mapped.nfc() {
        if c == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(c);
    }
    out
}

/// True if `value` contains a character from [`RESERVED_CHARS`].
pub fn contains_reserved(value: &str) -> bool {
    value.contains(RESERVED_CHARS)
}
