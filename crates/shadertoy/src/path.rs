//! Resolves the `path` fields found in pass configurations so the host, the
//! buffer-update router, and the texture cache agree on which file a config
//! entry names.
//!
//! Three forms are accepted:
//!
//! - `@/tex/noise.png` is relative to the workspace root that contains the
//!   shader (or the shader's directory when no root contains it).
//! - `/abs/noise.png` and `C:\noise.png` are returned unchanged.
//! - anything else is relative to the shader file's directory.
//!
//! Resolution is lexical: `.` and `..` segments are folded without touching
//! the filesystem, and nothing here ever fails.
use std::path::{Component, Path, PathBuf};

use tracing::debug;

const WORKSPACE_PREFIX: &str = "@/";

#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    workspace_roots: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            workspace_roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn workspace_roots(&self) -> &[PathBuf] {
        &self.workspace_roots
    }

    /// Most specific workspace root containing `shader_file`.
    pub fn workspace_root_for(&self, shader_file: &Path) -> Option<&Path> {
        let shader_file = normalize_lexically(shader_file);
        self.workspace_roots
            .iter()
            .filter(|root| shader_file.starts_with(normalize_lexically(root)))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    pub fn resolve(&self, shader_file: &Path, config_path: &str) -> PathBuf {
        let shader_dir = shader_file.parent().unwrap_or_else(|| Path::new(""));

        if let Some(rest) = config_path.strip_prefix(WORKSPACE_PREFIX) {
            let base = self.workspace_root_for(shader_file).unwrap_or(shader_dir);
            let resolved = normalize_lexically(&base.join(rest));
            debug!(
                original = %config_path,
                resolved = %resolved.display(),
                "resolved workspace-relative config path"
            );
            return resolved;
        }

        if is_platform_absolute(config_path) {
            return PathBuf::from(config_path);
        }

        let resolved = normalize_lexically(&shader_dir.join(config_path));
        debug!(
            original = %config_path,
            resolved = %resolved.display(),
            "resolved shader-relative config path"
        );
        resolved
    }
}

/// Leading `/` or `\`, or a drive letter such as `C:`.
pub fn is_platform_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Folds `.` and `..` without consulting the filesystem. A `..` that would
/// climb above the root is dropped; on a relative path it is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Path rendered with `/` separators, used when comparing paths that may come
/// from different platforms or editors.
pub fn slash_path(path: &str) -> String {
    path.replace('\\', "/")
}
