//! Ordered regex substitutions declared with `replace`.
//!
//! Every rule runs with multi-line and dot-matches-newline enabled. The
//! replacement uses backslash escapes (`\g<name>`, `\g<1>`, `\1`, `\\`) so a
//! `$` in TeX math stays literal.
use crate::error::PackError;
use regex::{Captures, Regex, RegexBuilder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(GroupRef),
}

/// A rule whose pattern and replacement have both been validated.
#[derive(Debug)]
pub struct CompiledRule {
    regex: Regex,
    pieces: Vec<Piece>,
}

impl CompiledRule {
    pub fn compile(rule: &SubstitutionRule) -> Result<Self, PackError> {
        let regex = RegexBuilder::new(&rule.pattern)
            .multi_line(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|err| failure(rule, err.to_string()))?;
        let pieces = parse_replacement(&rule.replacement).map_err(|reason| failure(rule, reason))?;
        for piece in &pieces {
            if let Piece::Group(group) = piece {
                check_group(&regex, group).map_err(|reason| failure(rule, reason))?;
            }
        }
        Ok(Self { regex, pieces })
    }

    /// Substitute every non-overlapping match, returning the new text and the match count.
    pub fn apply(&self, text: &str) -> (String, usize) {
        let mut count = 0;
        let replaced = self.regex.replace_all(text, |caps: &Captures<'_>| {
            count += 1;
            self.expand(caps)
        });
        (replaced.into_owned(), count)
    }

    fn expand(&self, caps: &Captures<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Group(GroupRef::Index(idx)) => {
                    if let Some(m) = caps.get(*idx) {
                        out.push_str(m.as_str());
                    }
                }
                Piece::Group(GroupRef::Name(name)) => {
                    if let Some(m) = caps.name(name) {
                        out.push_str(m.as_str());
                    }
                }
            }
        }
        out
    }
}

/// Apply `rules` to `text` in declaration order.
///
/// The first rule that fails to compile aborts the whole run; rules are
/// compiled lazily so earlier rules have already rewritten the text.
pub fn apply_all(rules: &[SubstitutionRule], text: &str) -> Result<String, PackError> {
    let mut current = text.to_string();
    for rule in rules {
        let compiled = CompiledRule::compile(rule)?;
        let (next, count) = compiled.apply(&current);
        tracing::info!(
            pattern = %rule.pattern,
            replacement = %rule.replacement,
            count,
            "applied substitution"
        );
        current = next;
    }
    Ok(current)
}

fn failure(rule: &SubstitutionRule, reason: String) -> PackError {
    PackError::SubstitutionError {
        pattern: rule.pattern.clone(),
        replacement: rule.replacement.clone(),
        reason,
    }
}

fn check_group(regex: &Regex, group: &GroupRef) -> Result<(), String> {
    match group {
        GroupRef::Index(idx) if *idx < regex.captures_len() => Ok(()),
        GroupRef::Index(idx) => Err(format!("invalid group reference {idx}")),
        GroupRef::Name(name) if regex.capture_names().flatten().any(|n| n == name.as_str()) => Ok(()),
        GroupRef::Name(name) => Err(format!("unknown group name {name:?}")),
    }
}

fn parse_replacement(template: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            literal.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            return Err("replacement ends with a lone backslash".to_string());
        };
        let group = match next {
            'g' => {
                if chars.next() != Some('<') {
                    return Err("missing '<' after \\g".to_string());
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some(c) => name.push(c),
                        None => return Err("missing '>' in group reference".to_string()),
                    }
                }
                Some(group_ref(&name)?)
            }
            '1'..='9' => {
                let mut digits = next.to_string();
                if let Some(second) = chars.next_if(char::is_ascii_digit) {
                    digits.push(second);
                }
                Some(group_ref(&digits)?)
            }
            '0' => return Err("octal escapes are not supported".to_string()),
            '\\' => {
                literal.push('\\');
                None
            }
            'n' => {
                literal.push('\n');
                None
            }
            't' => {
                literal.push('\t');
                None
            }
            'r' => {
                literal.push('\r');
                None
            }
            'f' => {
                literal.push('\u{0c}');
                None
            }
            'v' => {
                literal.push('\u{0b}');
                None
            }
            'a' => {
                literal.push('\u{07}');
                None
            }
            'b' => {
                literal.push('\u{08}');
                None
            }
            c if c.is_ascii_alphabetic() => return Err(format!("bad escape \\{c}")),
            c => {
                literal.push('\\');
                literal.push(c);
                None
            }
        };
        if let Some(group) = group {
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Group(group));
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn group_ref(raw: &str) -> Result<GroupRef, String> {
    if raw.is_empty() {
        return Err("empty group reference".to_string());
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return raw
            .parse()
            .map(GroupRef::Index)
            .map_err(|_| format!("invalid group reference {raw}"));
    }
    Ok(GroupRef::Name(raw.to_string()))
}
