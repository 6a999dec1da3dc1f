//! Confinement of user-supplied paths to the allowed base directory

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Path is outside allowed base directory")]
    OutsideBase,
}

/// Resolve `candidate` against `base` and reject anything that escapes it.
///
/// Relative paths are joined to `base`. Existing paths are canonicalised so
/// symlinks cannot be used to step outside; paths that do not exist yet are
/// normalised lexically.
pub fn resolve_within(base: &Path, candidate: &Path) -> Result<PathBuf, GuardError> {
    let base = resolve(base);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };
    let resolved = resolve(&joined);

    // Component-wise, so `/srv/work2` is not inside `/srv/work`
    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(GuardError::OutsideBase)
    }
}

fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| normalize(path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_relative_path_joins_base() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let resolved = resolve_within(dir.path(), Path::new("sub")).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("sub"));
    }

    #[test]
    fn test_base_itself_is_allowed() {
        let dir = tempdir().unwrap();
        let resolved = resolve_within(dir.path(), dir.path()).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let dir = tempdir().unwrap();
        let result = resolve_within(dir.path(), Path::new("../../etc"));
        assert_eq!(result, Err(GuardError::OutsideBase));
    }

    #[test]
    fn test_absolute_outside_rejected() {
        let dir = tempdir().unwrap();
        assert!(resolve_within(dir.path(), Path::new("/")).is_err());
    }

    #[test]
    fn test_sibling_with_shared_prefix_rejected() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("work");
        let sibling = dir.path().join("work2");
        std::fs::create_dir(&base).unwrap();
        std::fs::create_dir(&sibling).unwrap();

        assert!(resolve_within(&base, &sibling).is_err());
    }

    #[test]
    fn test_nonexistent_path_normalised() {
        let dir = tempdir().unwrap();
        let resolved = resolve_within(dir.path(), Path::new("a/./b/../c")).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("a/c"));
    }
}
