//! Locate referenced files on disk and give them flat archive names.
//!
//! A reference is resolved relative to the main document. When the exact
//! path is missing, a single glob candidate with the expected extension is
//! accepted and its extension is appended to the archive name; the document
//! keeps pointing at the extension-less flat name, which TeX completes the
//! same way it completed the original.
use crate::document::MergedDocument;
use crate::error::PackError;
use crate::util::relative_to_main;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What kind of file an extension probe is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionFilter {
    Class,
    BibData,
    BibStyle,
    Any,
}

impl ExtensionFilter {
    /// Glob suffix appended to the reference when the exact path is missing.
    pub fn glob_suffix(self) -> &'static str {
        match self {
            ExtensionFilter::Class => ".cls",
            ExtensionFilter::BibData => ".bib",
            ExtensionFilter::BibStyle => ".bst",
            ExtensionFilter::Any => ".*",
        }
    }
}

/// A reference resolved to a file on disk and a flat archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    /// Path as written in the document.
    pub original: String,
    /// File on disk, relative to the working directory.
    pub resolved: PathBuf,
    /// Name the document now uses for the reference.
    pub rewritten: String,
    /// Archive entry name; `rewritten` plus the probed extension, if any.
    pub archive_name: String,
}

/// Find the file behind `reference` without touching the document.
pub fn resolve(
    reference: &str,
    main_file: &Path,
    filter: ExtensionFilter,
    name_prefix: &str,
) -> Result<AssetReference, PackError> {
    let on_disk = relative_to_main(main_file, reference);
    let base_name = on_disk
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PackError::AssetNotFound {
            path: on_disk.clone(),
        })?;
    let rewritten = format!("{name_prefix}{base_name}");

    if on_disk.is_file() {
        return Ok(AssetReference {
            original: reference.to_string(),
            resolved: on_disk,
            archive_name: rewritten.clone(),
            rewritten,
        });
    }

    let resolved = probe_single(&on_disk, filter)?;
    let archive_name = match resolved.extension() {
        Some(ext) => format!("{rewritten}.{}", ext.to_string_lossy()),
        None => rewritten.clone(),
    };
    Ok(AssetReference {
        original: reference.to_string(),
        resolved,
        rewritten,
        archive_name,
    })
}

/// Resolve `reference` and rewrite it in `document` to its flat name.
pub fn relocate(
    document: &mut MergedDocument,
    reference: &str,
    main_file: &Path,
    filter: ExtensionFilter,
    name_prefix: &str,
) -> Result<AssetReference, PackError> {
    let asset = resolve(reference, main_file, filter, name_prefix)?;
    let count = document.rewrite_reference(&asset.original, &asset.rewritten);
    tracing::info!(
        reference = %asset.original,
        resolved = %asset.resolved.display(),
        archive_name = %asset.archive_name,
        occurrences = count,
        "relocated asset"
    );
    Ok(asset)
}

/// Rewrite `reference` to its base name without looking for the file.
///
/// Used when a class or style is left to the TeX installation, so the
/// document names it the same way whether or not it was bundled.
pub fn flatten(document: &mut MergedDocument, reference: &str) -> usize {
    let Some(name) = Path::new(reference).file_name() else {
        return 0;
    };
    let count = document.rewrite_reference(reference, &name.to_string_lossy());
    if count > 0 {
        tracing::debug!(reference, occurrences = count, "flattened unbundled reference");
    }
    count
}

fn probe_single(on_disk: &Path, filter: ExtensionFilter) -> Result<PathBuf, PackError> {
    let pattern = format!(
        "{}{}",
        glob::Pattern::escape(&on_disk.to_string_lossy()),
        filter.glob_suffix()
    );
    tracing::debug!(pattern = %pattern, "probing for asset");
    let entries = glob::glob(&pattern).map_err(|err| {
        PackError::InvalidArgument(format!("invalid glob pattern {pattern:?}: {err}"))
    })?;
    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| PackError::Io {
            path: err.path().to_path_buf(),
            source: err.into(),
        })?;
        if path.is_file() {
            candidates.push(path);
        }
    }
    match candidates.len() {
        0 => Err(PackError::AssetNotFound {
            path: on_disk.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(PackError::AmbiguousAsset {
            path: on_disk.to_path_buf(),
            candidates,
        }),
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
