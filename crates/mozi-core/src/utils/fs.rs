//! Directory helpers.

use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, Result};

/// Lexically normalize a path: drop `.` segments, resolve `..` against the
/// preceding segment, and collapse duplicate or trailing separators.
///
/// The filesystem is never consulted, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    normalized.pop();
                    depth -= 1;
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(segment) => {
                normalized.push(segment);
                depth += 1;
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Resolve `path` against the current working directory and normalize it.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().map_err(CoreError::CurrentDir)?;
    Ok(normalize_path(&cwd.join(path)))
}

/// Create `directory` (and any missing parents) if it does not exist.
///
/// Returns the normalized path. Fails on empty input or when the path
/// exists but is not a directory. Calling it again is a no-op.
pub fn ensure_dir(directory: impl AsRef<Path>) -> Result<PathBuf> {
    let raw = directory.as_ref();
    let trimmed = match raw.to_str() {
        Some(s) => PathBuf::from(s.trim()),
        None => raw.to_path_buf(),
    };
    if trimmed.as_os_str().is_empty() {
        return Err(CoreError::EmptyDirectory);
    }

    let directory = normalize_path(&trimmed);
    create_recursive(&directory)?;
    Ok(directory)
}

fn create_recursive(directory: &Path) -> Result<()> {
    if directory.exists() {
        if !directory.is_dir() {
            return Err(CoreError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }
        return Ok(());
    }

    if let Some(parent) = directory.parent() {
        if !parent.as_os_str().is_empty() {
            create_recursive(parent)?;
        }
    }

    match std::fs::create_dir(directory) {
        Ok(()) => Ok(()),
        // Lost a race with another creator
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && directory.is_dir() => Ok(()),
        Err(source) => Err(CoreError::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        }),
    }
}
