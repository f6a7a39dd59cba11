//! Bounded-depth balanced-brace regex fragments.
//!
//! Regular expressions cannot match arbitrarily nested `{...}` groups, so the
//! fragment produced here unrolls the nesting a fixed number of times. Text
//! nested deeper than the requested depth is not matched in full: a match
//! may stop early, cover only part of the text, or fail. The depth is a hard
//! limit chosen by whoever writes the `\c<N>c` marker.
use crate::error::PackError;
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Fragment for a brace-free run of characters (depth 0).
const FLAT: &str = "[^{}]*";

/// Deepest nesting a `\c<N>c` marker may ask for. Each level adds a group
/// and a repetition to the pattern, and the regex parser refuses patterns
/// nested much deeper than this.
pub const MAX_DEPTH: usize = 32;

/// Build a fragment matching text with at most `depth` levels of balanced braces.
///
/// Groups are non-capturing so the fragment never shifts group numbers in
/// the surrounding pattern.
pub fn synthesize(depth: usize) -> String {
    let mut fragment = "(?:[^{}]|\\{".repeat(depth);
    fragment.push_str(FLAT);
    fragment.push_str(&"\\})*".repeat(depth));
    fragment
}

/// Parse a textual depth (the digits of a `\c<N>c` marker) and synthesize it.
pub fn synthesize_str(raw: &str) -> Result<String, PackError> {
    let depth: usize = raw.parse().map_err(|_| {
        PackError::InvalidArgument(format!(
            "nesting depth must be a non-negative integer (got {raw:?})"
        ))
    })?;
    if depth > MAX_DEPTH {
        return Err(PackError::InvalidArgument(format!(
            "nesting depth {depth} exceeds the maximum of {MAX_DEPTH}"
        )));
    }
    Ok(synthesize(depth))
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\\c([0-9]+)c").expect("valid marker regex"))
}

/// Replace every `\c<N>c` marker in `token` with the depth-`N` fragment.
pub fn expand_markers(token: &str) -> Result<Cow<'_, str>, PackError> {
    let marker = marker_regex();
    if !marker.is_match(token) {
        return Ok(Cow::Borrowed(token));
    }
    let mut expanded = String::with_capacity(token.len());
    let mut last = 0;
    for caps in marker.captures_iter(token) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        expanded.push_str(&token[last..whole.start()]);
        expanded.push_str(&synthesize_str(digits.as_str())?);
        last = whole.end();
    }
    expanded.push_str(&token[last..]);
    Ok(Cow::Owned(expanded))
}
