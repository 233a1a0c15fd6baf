/*
 * path.rs
 *
 * Lexical path helpers shared by the runtimes and the resolver.
 */

use std::path::{Component, Path, PathBuf};

/// Normalize path components lexically (remove `.` and resolve `..`).
///
/// No filesystem access is performed, so symlinks are not resolved. A `..`
/// that would climb above the root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                let at_root = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if !normalized.has_root() {
                        normalized.push("..");
                    }
                } else if normalized.ends_with("..") {
                    normalized.push("..");
                } else {
                    normalized.pop();
                }
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

/// Compute `path` relative to `base`, both taken lexically.
///
/// Returns `None` when one path is absolute and the other is not.
pub fn relative_path(base: &Path, path: &Path) -> Option<PathBuf> {
    if base.is_absolute() != path.is_absolute() {
        return None;
    }

    let base = normalize_path(base);
    let path = normalize_path(path);

    let base_components: Vec<Component<'_>> = base.components().collect();
    let path_components: Vec<Component<'_>> = path.components().collect();

    let common = base_components
        .iter()
        .zip(path_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component);
    }
    Some(relative)
}
