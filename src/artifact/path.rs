//! Path canonicalization and normalization for build context hashing

use crate::error::ArtifactError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a build context directory
///
/// Resolves symlinks, `..` and `.`, normalizes Unicode to NFC and strips
/// trailing separators.
pub fn canonicalize_context(path: &Path) -> Result<PathBuf, ArtifactError> {
    let canonical = dunce::canonicalize(path).map_err(|e| {
        ArtifactError::InvalidPath(format!(
            "Failed to canonicalize {}: {}",
            path.display(),
            e
        ))
    })?;

    let normalized: String = canonical.to_string_lossy().nfc().collect();
    let mut result = normalized;
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }

    Ok(PathBuf::from(result))
}

/// Relative key of `path` under `root`, used as hash input.
///
/// Components are joined with `/` on every platform and normalized to NFC
/// so the same tree hashes identically everywhere.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, ArtifactError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        ArtifactError::InvalidPath(format!(
            "{} is outside build context {}",
            path.display(),
            root.display()
        ))
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().nfc().collect()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return Err(ArtifactError::InvalidPath(format!(
            "{} has no relative components",
            path.display()
        )));
    }

    Ok(parts.join("/"))
}
