use anyhow::{anyhow, Result};
use std::path::{Component, Path, PathBuf};

/// Join `reference` onto the directory holding `main_file` and normalize it lexically.
///
/// Nothing is resolved on disk, so missing files and symlinks are left as written.
pub fn relative_to_main(main_file: &Path, reference: &str) -> PathBuf {
    let base = main_file.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(reference))
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

pub fn file_name_str(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no UTF-8 file name", path.display()))
}

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}
