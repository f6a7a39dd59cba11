//! The merged document threaded through every pipeline stage.
use crate::error::PackError;
use crate::substitute::{apply_all, SubstitutionRule};

/// Owned text buffer for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    text: String,
}

impl MergedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Replace every whole-token occurrence of `from` with `to`.
    ///
    /// An occurrence only counts when the characters on either side cannot
    /// continue a path, so `imgs/plot` is left alone inside `imgs/plot2` or
    /// `imgs/plot.png`. Returns the number of replacements.
    pub fn rewrite_reference(&mut self, from: &str, to: &str) -> usize {
        if from.is_empty() || from == to {
            return 0;
        }
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        let mut count = 0;
        for (start, _) in self.text.match_indices(from) {
            if start < last {
                continue;
            }
            let end = start + from.len();
            let before = self.text[..start].chars().next_back();
            let after = self.text[end..].chars().next();
            if before.is_some_and(is_path_char) || after.is_some_and(is_path_char) {
                continue;
            }
            out.push_str(&self.text[last..start]);
            out.push_str(to);
            last = end;
            count += 1;
        }
        if count > 0 {
            out.push_str(&self.text[last..]);
            self.text = out;
        }
        count
    }

    /// Run the user substitutions over the buffer, in order.
    pub fn apply_substitutions(&mut self, rules: &[SubstitutionRule]) -> Result<(), PackError> {
        self.text = apply_all(rules, &self.text)?;
        Ok(())
    }
}

fn is_path_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/')
}
