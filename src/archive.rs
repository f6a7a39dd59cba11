//! In-memory archive and its zip output.
//!
//! Entries are collected in memory and written only once the whole run has
//! succeeded; the zip goes to a temporary file next to the destination and is
//! renamed into place, so a failure never leaves a partial archive behind.
use crate::error::PackError;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Ordered, uniquely named archive entries.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(), PackError> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(PackError::DuplicateEntry(name));
        }
        self.entries.push((name, bytes));
        Ok(())
    }

    /// Read `path` from disk and store it as `name`.
    pub fn insert_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        tracing::debug!(name, path = %path.display(), bytes = bytes.len(), "archive entry");
        self.insert(name, bytes)?;
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Write the entries, in insertion order, as a deflate-compressed zip at `out`.
    pub fn write_zip(&self, out: &Path) -> Result<()> {
        let dir = match out.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("create temporary archive in {}", dir.display()))?;
        let mut writer = ZipWriter::new(staged.reopen().context("reopen temporary archive")?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.entries {
            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("start archive entry {name}"))?;
            writer
                .write_all(bytes)
                .with_context(|| format!("write archive entry {name}"))?;
        }
        writer.finish().context("finish archive")?;
        if let Some(permissions) = output_permissions(out) {
            staged
                .as_file()
                .set_permissions(permissions)
                .context("set archive permissions")?;
        }
        staged
            .persist(out)
            .map_err(|err| anyhow!("publish {}: {}", out.display(), err.error))?;
        tracing::info!(path = %out.display(), entries = self.entries.len(), "wrote archive");
        Ok(())
    }
}

/// Mode for the published archive: the existing output's, else a plain 0644.
///
/// Temporary files are created owner-only, which would otherwise carry over.
#[cfg(unix)]
fn output_permissions(out: &Path) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::metadata(out)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644));
    Some(permissions)
}

#[cfg(not(unix))]
fn output_permissions(out: &Path) -> Option<fs::Permissions> {
    fs::metadata(out).ok().map(|meta| meta.permissions())
}
