/*
 * memory.rs
 *
 * In-memory runtime for hermetic builds.
 */

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::path::normalize_path;
use crate::traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime};

#[derive(Debug, Default)]
struct MemoryFs {
    /// File contents, keyed by normalized absolute path
    files: HashMap<PathBuf, Vec<u8>>,
    /// Directory entries (automatically includes parents of all files)
    directories: HashSet<PathBuf>,
}

impl MemoryFs {
    fn add_directory_and_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

/// Runtime whose filesystem lives entirely in memory.
///
/// Relative paths are resolved against the working directory given at
/// construction (`/project` by default). Adding a file creates all of its
/// parent directories; writing a file requires the parent to exist, matching
/// the native runtime.
///
/// Thread safety: Uses RwLock to satisfy Send + Sync trait bounds.
#[derive(Debug)]
pub struct MemoryRuntime {
    fs: RwLock<MemoryFs>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create an empty in-memory filesystem rooted at `/project`.
    pub fn new() -> Self {
        Self::with_cwd(PathBuf::from("/project"))
    }

    /// Create an empty in-memory filesystem with a custom working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let mut fs = MemoryFs::default();
        fs.add_directory_and_parents(&cwd);
        Self {
            fs: RwLock::new(fs),
            cwd,
        }
    }

    /// Add a file (and its parent directories).
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let normalized = self.absolute(path.as_ref());
        let mut fs = self.fs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = normalized.parent() {
            fs.add_directory_and_parents(parent);
        }
        fs.files.insert(normalized, contents.into());
    }

    /// List all files, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let fs = self.fs.read().unwrap_or_else(|e| e.into_inner());
        let mut files: Vec<PathBuf> = fs.files.keys().cloned().collect();
        files.sort();
        files
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.cwd.join(path))
        }
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.absolute(path);
        let fs = self.fs.read().unwrap_or_else(|e| e.into_inner());
        fs.files
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::NotFound(normalized))
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        let normalized = self.absolute(path);
        let mut fs = self.fs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = normalized.parent() {
            if !fs.directories.contains(parent) {
                return Err(RuntimeError::NotFound(parent.to_path_buf()));
            }
        }
        fs.files.insert(normalized, contents.to_vec());
        Ok(())
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let normalized = self.absolute(path);
        let fs = self.fs.read().unwrap_or_else(|e| e.into_inner());
        let is_file = fs.files.contains_key(&normalized);
        let is_dir = fs.directories.contains(&normalized);
        Ok(match kind {
            None => is_file || is_dir,
            Some(PathKind::File) => is_file,
            Some(PathKind::Directory) => is_dir,
        })
    }

    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let normalized = self.absolute(path);
        let mut fs = self.fs.write().unwrap_or_else(|e| e.into_inner());
        if !recursive {
            if let Some(parent) = normalized.parent() {
                if !fs.directories.contains(parent) {
                    return Err(RuntimeError::NotFound(parent.to_path_buf()));
                }
            }
        }
        fs.add_directory_and_parents(&normalized);
        Ok(())
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_requires_parent_directory() {
        let rt = MemoryRuntime::new();
        let target = Path::new("/out/dist/button.css.js");

        assert!(rt.file_write(target, b"x").is_err());

        rt.dir_create(target.parent().unwrap(), true).unwrap();
        rt.file_write(target, b"x").unwrap();
        assert_eq!(rt.file_read(target).unwrap(), b"x");
    }

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        let rt = MemoryRuntime::with_cwd(PathBuf::from("/work"));
        rt.add_file("src/a.scss", ".a {}");

        assert!(rt.is_file(Path::new("/work/src/a.scss")).unwrap());
        assert!(rt.is_file(Path::new("/work/src/../src/a.scss")).unwrap());
        assert_eq!(rt.list_files(), vec![PathBuf::from("/work/src/a.scss")]);
    }

    #[test]
    fn test_non_recursive_dir_create_needs_parent() {
        let rt = MemoryRuntime::new();
        assert!(rt.dir_create(Path::new("/a/b"), false).is_err());
        rt.dir_create(Path::new("/a"), false).unwrap();
        rt.dir_create(Path::new("/a/b"), false).unwrap();
        assert!(rt.is_dir(Path::new("/a/b")).unwrap());
    }
}
