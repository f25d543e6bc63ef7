//! Containment-checked path resolution.
//!
//! Owner roots live at `{storage_root}/{owner_id}`. Every path accepted
//! from outside the core goes through [`PathResolver::resolve`] before it
//! reaches the filesystem adapter.

use std::path::{Component, Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use nasbox_core::error::{AppError, ErrorKind};
use nasbox_core::path;
use nasbox_core::result::AppResult;

/// A logical path that has passed the containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The owner whose root contains the path.
    pub owner_id: Uuid,
    /// Canonical logical path (`""` for the root).
    pub logical: String,
    /// Absolute filesystem location.
    pub absolute: PathBuf,
}

impl ResolvedPath {
    /// Whether this is the owner root itself.
    pub fn is_root(&self) -> bool {
        self.logical.is_empty()
    }

    /// Last segment of the logical path.
    pub fn name(&self) -> &str {
        path::file_name(&self.logical)
    }

    /// Logical path of the parent directory.
    pub fn parent_logical(&self) -> &str {
        path::parent(&self.logical)
    }
}

/// Maps `(owner, logical path)` pairs onto the shared storage root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    storage_root: PathBuf,
}

impl PathResolver {
    /// Create a resolver over the given storage root.
    ///
    /// The root is normalized lexically; it does not need to exist yet.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: lexical_normalize(&storage_root.into()),
        }
    }

    /// The storage root every owner root lives under.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Absolute owner root for `owner_id`.
    pub fn owner_root(&self, owner_id: Uuid) -> PathBuf {
        self.storage_root.join(owner_id.to_string())
    }

    /// Resolve a logical path inside the owner's root.
    ///
    /// Fails with `InvalidPath` when the path would leave the root.
    pub fn resolve(&self, owner_id: Uuid, logical: &str) -> AppResult<ResolvedPath> {
        let normalized = path::normalize(logical).inspect_err(|_| {
            warn!(owner_id = %owner_id, path = logical, "Rejected path outside owner root");
        })?;

        let root = self.owner_root(owner_id);
        let absolute = if normalized.is_empty() {
            root.clone()
        } else {
            root.join(&normalized)
        };

        if !absolute.starts_with(&root) {
            return Err(AppError::invalid_path(format!(
                "Path escapes the owner root: {logical}"
            )));
        }

        Ok(ResolvedPath {
            owner_id,
            logical: normalized,
            absolute,
        })
    }

    /// Resolve `name` as a child of the logical folder `parent`.
    pub fn resolve_child(
        &self,
        owner_id: Uuid,
        parent: &str,
        name: &str,
    ) -> AppResult<ResolvedPath> {
        let name = path::validate_name(name)?;
        let parent = path::normalize(parent)?;
        self.resolve(owner_id, &path::join(&parent, &name))
    }

    /// Map an absolute path back to a logical path under the owner root.
    pub fn to_logical(&self, owner_id: Uuid, absolute: &Path) -> AppResult<String> {
        let root = self.owner_root(owner_id);
        let relative = absolute.strip_prefix(&root).map_err(|_| {
            AppError::invalid_path(format!(
                "{} is outside the owner root",
                absolute.display()
            ))
        })?;

        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        path::normalize(&segments.join("/"))
    }

    /// Resolve an administrator-supplied path against the storage root.
    ///
    /// Absolute paths are taken as-is, relative ones are joined onto the
    /// storage root. The result must lie within the storage root.
    pub fn resolve_in_storage_root(&self, raw: &str) -> AppResult<PathBuf> {
        if raw.trim().is_empty() || raw.contains('\0') {
            return Err(AppError::invalid_path("Path must not be empty"));
        }
        let candidate = Path::new(raw);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.storage_root.join(candidate)
        };
        let normalized = lexical_normalize(&joined);

        if !normalized.starts_with(&self.storage_root) {
            return Err(AppError::invalid_path(format!(
                "{raw} is outside the storage root"
            )));
        }
        Ok(normalized)
    }

    /// Reject resolved paths whose existing ancestors are symlinks that
    /// lead outside the owner root.
    ///
    /// The lexical check in [`Self::resolve`] cannot see links, so this
    /// canonicalizes the deepest existing ancestor and re-checks it.
    pub async fn confine(&self, resolved: &ResolvedPath) -> AppResult<()> {
        let root = self.owner_root(resolved.owner_id);
        let canonical_root = match tokio::fs::canonicalize(&root).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(AppError::from_io("Failed to canonicalize owner root", e)),
        };

        let mut candidate = resolved.absolute.as_path();
        loop {
            match tokio::fs::canonicalize(candidate).await {
                Ok(canonical) => {
                    if canonical.starts_with(&canonical_root) {
                        return Ok(());
                    }
                    warn!(
                        owner_id = %resolved.owner_id,
                        path = %resolved.logical,
                        "Rejected path whose link target leaves the owner root"
                    );
                    return Err(AppError::invalid_path(format!(
                        "Path escapes the owner root: {}",
                        resolved.logical
                    )));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => match candidate.parent() {
                    Some(parent) if parent.starts_with(&root) => candidate = parent,
                    _ => return Ok(()),
                },
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to canonicalize {}", candidate.display()),
                        e,
                    ));
                }
            }
        }
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new("/srv/nas")
    }

    #[test]
    fn test_resolve_inside_root() {
        let owner = Uuid::new_v4();
        let resolved = resolver().resolve(owner, "/docs/../photos/cat.png").unwrap();
        assert_eq!(resolved.logical, "photos/cat.png");
        assert_eq!(
            resolved.absolute,
            PathBuf::from(format!("/srv/nas/{owner}/photos/cat.png"))
        );
        assert_eq!(resolved.name(), "cat.png");
        assert_eq!(resolved.parent_logical(), "photos");
    }

    #[test]
    fn test_resolve_root() {
        let owner = Uuid::new_v4();
        let resolved = resolver().resolve(owner, "").unwrap();
        assert!(resolved.is_root());
        assert_eq!(resolved.absolute, resolver().owner_root(owner));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        for raw in ["..", "../", &format!("../{other}/secret.txt"), "a/../../b"] {
            let err = resolver().resolve(owner, raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidPath, "{raw}");
        }
    }

    #[test]
    fn test_resolve_child_validates_name() {
        let owner = Uuid::new_v4();
        let err = resolver().resolve_child(owner, "", "../x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
        let ok = resolver().resolve_child(owner, "docs", " a.txt ").unwrap();
        assert_eq!(ok.logical, "docs/a.txt");
    }

    #[test]
    fn test_to_logical() {
        let owner = Uuid::new_v4();
        let r = resolver();
        let abs = r.owner_root(owner).join("a").join("b.txt");
        assert_eq!(r.to_logical(owner, &abs).unwrap(), "a/b.txt");
        assert!(r.to_logical(owner, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_storage_root_containment() {
        let r = resolver();
        assert_eq!(
            r.resolve_in_storage_root("media").unwrap(),
            PathBuf::from("/srv/nas/media")
        );
        assert_eq!(
            r.resolve_in_storage_root("/srv/nas/media/../tv").unwrap(),
            PathBuf::from("/srv/nas/tv")
        );
        assert!(r.resolve_in_storage_root("/etc").is_err());
        assert!(r.resolve_in_storage_root("../outside").is_err());
        assert!(r.resolve_in_storage_root("/srv/nasty").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_confine_rejects_symlink_escape() {
        let storage = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let r = PathResolver::new(storage.path());
        let owner = Uuid::new_v4();
        let root = r.owner_root(owner);
        std::fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("escape")).unwrap();

        let inside = r.resolve(owner, "plain/new.txt").unwrap();
        assert!(r.confine(&inside).await.is_ok());

        let linked = r.resolve(owner, "escape/loot.txt").unwrap();
        let err = r.confine(&linked).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
    }
}
