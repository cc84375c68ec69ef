//! URL slugs that carry a display name and an entity id in one path segment.
//!
//! `encode("Joe's Grill", "abc123")` yields `joes-grill-abc123`. The id is
//! always the text after the last hyphen; the name part is lossy and can only
//! be approximated back.
//!
//! Only whitespace, `-` and `_` separate words. Other punctuation is dropped
//! rather than turned into a hyphen, so `Joe's` stays one word and
//! `Bar&Grill` becomes `bargrill`.

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Errors from slug encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    /// Empty name or id, or an id that would not survive decoding.
    #[error("invalid slug argument: {0}")]
    InvalidArgument(&'static str),
}

/// Path segment values produced by clients that lost their claims.
const PLACEHOLDER_SEGMENTS: &[&str] = &["undefined", "null"];

/// Encode a display name and an id into a single path segment.
///
/// # Errors
///
/// Returns [`SlugError::InvalidArgument`] when `name` or `id` is blank, or
/// when `id` itself contains a hyphen.
pub fn encode(name: &str, id: &str) -> Result<String, SlugError> {
    if name.trim().is_empty() {
        return Err(SlugError::InvalidArgument("name must not be empty"));
    }
    let id = id.trim();
    if id.is_empty() {
        return Err(SlugError::InvalidArgument("id must not be empty"));
    }
    if id.contains('-') {
        return Err(SlugError::InvalidArgument("id must not contain '-'"));
    }

    Ok(format!("{}-{id}", normalize(name)))
}

/// Return the id part of a slug: everything after the last hyphen.
///
/// Returns an empty string when the slug has no hyphen.
#[must_use]
pub fn decode_id(slug: &str) -> &str {
    slug.rsplit_once('-').map_or("", |(_, id)| id)
}

/// Best-effort display name: drop the id, title-case the remaining words.
#[must_use]
pub fn decode_name(slug: &str) -> String {
    let Some((name, _)) = slug.rsplit_once('-') else {
        return String::new();
    };

    name.split('-')
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a path segment is missing in practice (`""`, `undefined`, `null`).
#[must_use]
pub fn is_placeholder_segment(segment: &str) -> bool {
    segment.is_empty()
        || PLACEHOLDER_SEGMENTS
            .iter()
            .any(|p| segment.eq_ignore_ascii_case(p))
}

/// Lowercase ASCII with diacritics stripped, punctuation dropped, and
/// separator runs collapsed to one hyphen.
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = false;

    for c in name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_dash = false;
        } else if (c.is_whitespace() || c == '-' || c == '_') && !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
