//! Path validation to keep tools inside the workspace.

use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-attach the rest, so
/// symlinks are resolved even for paths that do not exist yet.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut ancestor = path.to_path_buf();
    let mut rest = Vec::new();
    while !ancestor.exists() {
        match (ancestor.file_name(), ancestor.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name.to_os_string());
                ancestor = parent.to_path_buf();
            }
            _ => return Ok(path.to_path_buf()),
        }
    }
    let mut resolved = ancestor.canonicalize()?;
    for part in rest.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

/// Resolve `raw` against the workspace, rejecting escapes when `restrict`.
pub fn validate_path(raw: &str, workspace: &Path, restrict: bool) -> Result<PathBuf> {
    let joined = if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        workspace.join(raw)
    };
    let resolved = resolve_existing_prefix(&normalize(&joined))?;

    if restrict {
        let workspace_canon = workspace
            .canonicalize()
            .unwrap_or_else(|_| normalize(workspace));
        if !resolved.starts_with(&workspace_canon) {
            bail!(
                "Path '{}' is outside the workspace '{}'",
                resolved.display(),
                workspace_canon.display()
            );
        }
    }

    Ok(resolved)
}

/// Validate a path for writing, creating parent directories when asked.
pub fn validate_write_path(
    raw: &str,
    workspace: &Path,
    restrict: bool,
    create_dirs: bool,
) -> Result<PathBuf> {
    let path = validate_path(raw, workspace, restrict)?;

    if path.is_dir() {
        bail!("Path is a directory: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if create_dirs {
                std::fs::create_dir_all(parent)?;
            } else {
                bail!("Parent directory does not exist: {}", parent.display());
            }
        }
    }

    Ok(path)
}
