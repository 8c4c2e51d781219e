//! Storage-key validation, display-name sanitization and
//! `Content-Disposition` construction.
//!
//! Keys are checked against an allow-list before they reach any provider.
//! Display names are user supplied and only ever reduced, never rejected.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;

/// Longest accepted storage key, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Longest display name kept, in characters.
pub const MAX_NAME_CHARS: usize = 255;

/// Name used when sanitization leaves nothing.
pub const FALLBACK_NAME: &str = "download";

/// RFC 5987 `attr-char` minus the alphanumerics.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Validate a storage key.
///
/// Accepts non-empty keys of at most [`MAX_KEY_LEN`] bytes made of
/// `[A-Za-z0-9._/-]`, without a leading `/` and without empty, `.` or `..`
/// segments.
pub fn validate_storage_key(key: &str) -> AppResult<()> {
    if key.is_empty() {
        return Err(AppError::validation("Storage key is empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(AppError::validation("Storage key is too long"));
    }
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')))
    {
        return Err(AppError::validation(format!(
            "Storage key contains forbidden character {:?}",
            bad
        )));
    }
    if key.starts_with('/') {
        return Err(AppError::validation("Storage key must be relative"));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(AppError::validation("Storage key has an invalid segment"));
    }
    Ok(())
}

/// Reduce a user-supplied name to a safe display/download name.
///
/// Strips control characters, keeps the last path segment, trims
/// whitespace, caps the length and falls back to [`FALLBACK_NAME`].
/// Applying it twice yields the same result as applying it once.
pub fn sanitize_filename(name: &str) -> String {
    let visible: String = name.chars().filter(|c| !c.is_control()).collect();
    let base = visible.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let capped: String = base.chars().take(MAX_NAME_CHARS).collect();
    let capped = capped.trim();
    if capped.is_empty() || capped == "." || capped == ".." {
        FALLBACK_NAME.to_string()
    } else {
        capped.to_string()
    }
}

/// Build a `Content-Disposition` value for `name`.
///
/// The quoted `filename` is an ASCII-only fallback with `"` and `\`
/// replaced; `filename*` carries the exact UTF-8 name percent-encoded.
pub fn content_disposition(name: &str, inline: bool) -> String {
    let name = sanitize_filename(name);
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(&name, ATTR_CHAR);
    let kind = if inline { "inline" } else { "attachment" };
    format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
