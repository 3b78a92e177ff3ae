//! Path confinement — every tool path must stay inside the repository.

use codewright_core::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Resolve a model-supplied, repository-relative `path` to a canonical file
/// path inside `root`.
///
/// Checks:
/// 1. Not absolute
/// 2. No `..` components
/// 3. After resolving symlinks, still under `root`
pub fn resolve_in_repo(root: &Path, path: &str, tool_name: &str) -> Result<PathBuf, ToolError> {
    let denied = |reason: String| ToolError::PermissionDenied {
        tool_name: tool_name.into(),
        reason,
    };

    let normalized = path.trim().replace('\\', "/");
    let candidate = Path::new(&normalized);

    if candidate.is_absolute() || normalized.starts_with('/') {
        return Err(denied(format!(
            "'{path}' is absolute; use a path relative to the repository root"
        )));
    }

    if candidate.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(denied(format!("'{path}' escapes the repository")));
    }

    let joined = root.join(candidate);
    let canonical = joined.canonicalize().map_err(|e| {
        ToolError::execution_failed(tool_name, format!("cannot open '{path}': {e}"))
    })?;

    if !canonical.starts_with(root) {
        return Err(denied(format!("'{path}' resolves outside the repository")));
    }

    Ok(canonical)
}

/// Resolve `path` and require it to be a regular file.
pub fn resolve_file(root: &Path, path: &str, tool_name: &str) -> Result<PathBuf, ToolError> {
    let resolved = resolve_in_repo(root, path, tool_name)?;
    if !resolved.is_file() {
        return Err(ToolError::execution_failed(
            tool_name,
            format!("'{path}' is not a file"),
        ));
    }
    Ok(resolved)
}
