//! On-disk cluster metadata
//!
//! One directory per known cluster under a single root. The directory's
//! existence is what makes a cluster "known"; there is no other record.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Filesystem bookkeeping keyed by cluster name.
#[derive(Debug, Clone)]
pub struct ClusterDirectoryStore {
    root: PathBuf,
}

impl ClusterDirectoryStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until
    /// [`ensure`](Self::ensure) is called.
    ///
    /// A relative root is resolved against the current directory here, so
    /// every path the store hands out is absolute. Symlinks are kept as is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        // absolute() only fails for an empty path or an unreadable cwd
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    /// Root directory holding all cluster directories
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the metadata directory for `name`.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_cluster_name(name)?;
        Ok(self.root.join(name))
    }

    /// Whether a directory exists for `name`.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_dir())
    }

    /// Create the metadata directory for `name` (and the root if needed).
    pub fn ensure(&self, name: &str) -> Result<PathBuf> {
        let dir = self.path_for(name)?;
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        debug!(cluster = %name, path = %dir.display(), "ensured cluster directory");
        Ok(dir)
    }

    /// Remove the metadata directory for `name` and everything in it.
    ///
    /// Removing a directory that does not exist is not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.path_for(name)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(cluster = %name, path = %dir.display(), "removed cluster directory");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&dir, e)),
        }
    }

    /// Names of all known clusters, sorted.
    ///
    /// A missing root means no clusters. Plain files and directories whose
    /// names are not valid cluster names are ignored.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) if validate_cluster_name(name).is_ok() => names.push(name.to_string()),
                _ => {}
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Check that a cluster name is usable as a directory and container name prefix.
pub fn validate_cluster_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::validation("cluster name must not be empty"));
    };
    if !first.is_ascii_alphanumeric() {
        return Err(Error::validation(format!(
            "cluster name '{}' must start with a letter or digit",
            name
        )));
    }
    if let Some(bad) =
        chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(Error::validation(format!(
            "cluster name '{}' contains invalid character '{}'",
            name, bad
        )));
    }
    Ok(())
}
