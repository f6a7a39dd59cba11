//! Config language for an export run.
//!
//! One command per line: `add`, `replace`, `args` or `echo`, followed by
//! whitespace-separated arguments. A backslash directly before a whitespace
//! character (or a `#`) makes it part of the argument.
use crate::error::PackError;
use crate::pattern::expand_markers;
use crate::substitute::SubstitutionRule;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Config written next to the main document when none exists yet.
pub const SAMPLE_CONFIG: &str = r#"## latexport configuration
## Each line holds one command followed by its arguments, separated by whitespace.
## Put a backslash before any whitespace that belongs inside an argument.
## Everything after a '#' that is not preceded by a backslash is a comment.

## [add] copy an extra file into the archive (path relative to the main tex file)
# add supplement/response\ letter.pdf

## [args] extra options passed to latexpand
# args --empty-comments

## [echo] print a message whenever this config is loaded
# echo Check the page limit before submitting.

## [replace] regex substitution over the merged tex file
## replace <pattern> [<replacement>]     (a missing replacement deletes the match)
## '.' also matches a newline; '^' and '$' match at every line boundary.
## In the replacement, \g<name>, \g<1> or \1 insert a group and '$' is literal.
## \c<N>c expands to a pattern for text with up to N (at most 32) levels of nested braces.
# replace \\added\{(?P<added_txt>\c2c)\} \g<added_txt>
# replace \\deleted\{\c2c\}
# replace \\replaced\{(?P<old_txt>\c2c)\}\{(?P<replaced_txt>\c2c)\} \g<replaced_txt>
# replace \\explain\{\c2c\}
"#;

/// One parsed config directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigRule {
    Add(String),
    Replace { pattern: String, replacement: String },
    ArgToken(String),
    Echo(String),
}

impl ConfigRule {
    /// Render the rule as a config line that parses back to the same rule.
    #[cfg(test)]
    pub fn to_line(&self) -> Result<String, PackError> {
        let line = match self {
            ConfigRule::Add(path) => format!("add {}", escape_token(path)?),
            ConfigRule::Replace {
                pattern,
                replacement,
            } if replacement.is_empty() => format!("replace {}", escape_token(pattern)?),
            ConfigRule::Replace {
                pattern,
                replacement,
            } => format!(
                "replace {} {}",
                escape_token(pattern)?,
                escape_token(replacement)?
            ),
            ConfigRule::ArgToken(value) => format!("args {}", escape_token(value)?),
            ConfigRule::Echo(text) if text.is_empty() => "echo".to_string(),
            ConfigRule::Echo(text) => format!("echo {}", escape_token(text)?),
        };
        Ok(line)
    }
}

/// Rules grouped by what the export pipeline does with them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportConfig {
    pub add_files: Vec<String>,
    pub replacements: Vec<SubstitutionRule>,
    pub args: Vec<String>,
    pub echoes: Vec<String>,
}

impl ExportConfig {
    pub fn from_rules(rules: Vec<ConfigRule>) -> Self {
        let mut config = Self::default();
        for rule in rules {
            match rule {
                ConfigRule::Add(path) => config.add_files.push(path),
                ConfigRule::Replace {
                    pattern,
                    replacement,
                } => config.replacements.push(SubstitutionRule {
                    pattern,
                    replacement,
                }),
                ConfigRule::ArgToken(value) => config.args.push(value),
                ConfigRule::Echo(text) => config.echoes.push(text),
            }
        }
        config
    }
}

/// Load the config at `path`, writing [`SAMPLE_CONFIG`] there first if it is missing.
pub fn load_or_create(path: &Path) -> Result<ExportConfig> {
    if !path.exists() {
        fs::write(path, SAMPLE_CONFIG.as_bytes())
            .with_context(|| format!("write sample config {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote sample config");
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let rules = parse_config(&text).with_context(|| format!("parse config {}", path.display()))?;
    Ok(ExportConfig::from_rules(rules))
}

/// Parse config text into rules, in declaration order.
pub fn parse_config(text: &str) -> Result<Vec<ConfigRule>, PackError> {
    parse_lines(text.lines())
}

/// Parse config lines into rules, in declaration order.
///
/// Lines whose first token is not a known command (including blank and
/// comment-only lines) produce nothing.
pub fn parse_lines<'a, I>(lines: I) -> Result<Vec<ConfigRule>, PackError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut rules = Vec::new();
    for (idx, line) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let tokens = split_tokens(strip_comment(line));
        let Some((command, args)) = tokens.split_first() else {
            continue;
        };
        match command.as_str() {
            "add" => {
                let [path] = args else {
                    return Err(arity_error(line_no, "add", "exactly one path", args.len()));
                };
                tracing::info!(path = %path, "add file");
                rules.push(ConfigRule::Add(path.clone()));
            }
            "replace" => {
                let (pattern, replacement) = match args {
                    [pattern] => (pattern.as_str(), ""),
                    [pattern, replacement] => (pattern.as_str(), replacement.as_str()),
                    _ => {
                        return Err(arity_error(
                            line_no,
                            "replace",
                            "a pattern and an optional replacement",
                            args.len(),
                        ))
                    }
                };
                let pattern = expand_markers(pattern)?.into_owned();
                let replacement = expand_markers(replacement)?.into_owned();
                tracing::info!(pattern = %pattern, replacement = %replacement, "replace");
                rules.push(ConfigRule::Replace {
                    pattern,
                    replacement,
                });
            }
            "args" => {
                for value in args.iter().filter(|value| !value.trim().is_empty()) {
                    tracing::info!(arg = %value, "expansion argument");
                    rules.push(ConfigRule::ArgToken(value.clone()));
                }
            }
            "echo" => {
                let text = args.join(" ");
                tracing::debug!(text = %text, "echo");
                rules.push(ConfigRule::Echo(text));
            }
            other => {
                tracing::debug!(line = line_no, command = other, "ignoring config line");
            }
        }
    }
    Ok(rules)
}

/// Render rules back into config text, one line per rule.
#[cfg(test)]
pub fn serialize_rules(rules: &[ConfigRule]) -> Result<String, PackError> {
    let mut out = String::new();
    for rule in rules {
        out.push_str(&rule.to_line()?);
        out.push('\n');
    }
    Ok(out)
}

fn arity_error(line: usize, command: &str, expected: &str, got: usize) -> PackError {
    PackError::InvalidConfig {
        line,
        message: format!("`{command}` expects {expected} (got {got} arguments)"),
    }
}

/// Cut the line at the first `#` not directly preceded by a backslash.
fn strip_comment(line: &str) -> &str {
    let mut prev = None;
    for (idx, ch) in line.char_indices() {
        if ch == '#' && prev != Some('\\') {
            return &line[..idx];
        }
        prev = Some(ch);
    }
    line
}

/// Split on whitespace unless the whitespace follows a backslash, then drop
/// the escaping backslashes.
fn split_tokens(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let escaped: Vec<bool> = chars
        .iter()
        .enumerate()
        .map(|(idx, ch)| ch.is_whitespace() && idx > 0 && chars[idx - 1] == '\\')
        .collect();

    let mut raw_tokens = Vec::new();
    let mut current = String::new();
    for (ch, is_escaped) in chars.iter().zip(&escaped) {
        if ch.is_whitespace() && !is_escaped {
            if !current.is_empty() {
                raw_tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(*ch);
    }
    if !current.is_empty() {
        raw_tokens.push(current);
    }

    raw_tokens
        .into_iter()
        .map(|token| unescape_whitespace(&token))
        .collect()
}

fn unescape_whitespace(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek().is_some_and(|next| next.is_whitespace()) {
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
fn escape_token(token: &str) -> Result<String, PackError> {
    if token.is_empty() {
        return Err(PackError::InvalidArgument(
            "empty config arguments cannot be written".to_string(),
        ));
    }
    if token.ends_with('\\') {
        return Err(PackError::InvalidArgument(format!(
            "config argument {token:?} ends with a backslash"
        )));
    }
    let mut escaped = String::with_capacity(token.len() + 4);
    for ch in token.chars() {
        if ch.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    if strip_comment(&escaped).len() != escaped.len() {
        return Err(PackError::InvalidArgument(format!(
            "config argument {token:?} contains an unescaped '#'"
        )));
    }
    Ok(escaped)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
