//! Typed failures raised by the packaging core.
//!
//! The orchestration layer converts these into `anyhow` errors; only the
//! soft-fail lookups (class and bibliography-style files) match on them.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no \\{directive} directive found in the merged document")]
    NotFound { directive: &'static str },

    #[error("asset not found: {}", .path.display())]
    AssetNotFound { path: PathBuf },

    #[error("ambiguous asset {}: candidates {}", .path.display(), format_candidates(.candidates))]
    AmbiguousAsset {
        path: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("substitution failed for pattern {pattern:?} -> {replacement:?}: {reason}")]
    SubstitutionError {
        pattern: String,
        replacement: String,
        reason: String,
    },

    #[error("config line {line}: {message}")]
    InvalidConfig { line: usize, message: String },

    #[error("duplicate archive entry {0:?}")]
    DuplicateEntry(String),

    #[error("probe {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    /// True when the failure only means the referenced file is absent.
    pub fn is_asset_missing(&self) -> bool {
        matches!(self, PackError::AssetNotFound { .. })
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
