//! Structural directives found in the merged document.
//!
//! Each directive has the shape `\name[options]{argument}`; options are
//! skipped and the argument is returned exactly as written.
use crate::error::PackError;
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

const DOCUMENT_CLASS: &str = "documentclass";
const BIBLIOGRAPHY: &str = "bibliography";
const BIBLIOGRAPHY_STYLE: &str = "bibliographystyle";
const INCLUDE_GRAPHICS: &str = "includegraphics";

fn directive_regex(name: &str) -> Regex {
    RegexBuilder::new(&format!(r"\\{name}(?:\[[^\]]*\])?\{{([^}}]*)\}}"))
        .dot_matches_new_line(true)
        .build()
        .expect("valid directive regex")
}

fn cached(cell: &'static OnceLock<Regex>, name: &str) -> &'static Regex {
    cell.get_or_init(|| directive_regex(name))
}

fn arguments(regex: &Regex, text: &str) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Argument of the first `\documentclass`.
pub fn extract_document_class(text: &str) -> Result<String, PackError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, DOCUMENT_CLASS)
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(PackError::NotFound {
            directive: DOCUMENT_CLASS,
        })
}

/// Arguments of every `\includegraphics`, in source order.
pub fn extract_graphics(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    arguments(cached(&RE, INCLUDE_GRAPHICS), text)
}

/// Arguments of every `\bibliography`, in source order.
pub fn extract_bibliography(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    arguments(cached(&RE, BIBLIOGRAPHY), text)
}

/// Arguments of every `\bibliographystyle`, in source order.
pub fn extract_bibliography_style(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    arguments(cached(&RE, BIBLIOGRAPHY_STYLE), text)
}

/// Split a `\bibliography{a, b}` argument into its database names.
pub fn split_bibliography_list(argument: &str) -> Vec<String> {
    argument
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
