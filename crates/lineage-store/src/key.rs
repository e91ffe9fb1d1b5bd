//! Lexical validation of storage keys.

use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Resolve `key` to a relative path without touching the filesystem.
///
/// `.` components are dropped and `..` components pop the previous one. Keys
/// that are empty, absolute, or climb above the root are rejected.
pub fn normalize_key(key: &str) -> Result<PathBuf, StorageError> {
    if key.trim().is_empty() || key.contains('\0') {
        return Err(StorageError::violation(key));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(StorageError::violation(key));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::violation(key));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(StorageError::violation(key));
    }
    Ok(relative)
}
