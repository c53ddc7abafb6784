//! The editor side of the protocol: turns files on disk into
//! `shaderSource` messages and decides which message a file change produces.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use livereload::{GateSender, ShaderSourceMessage};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use shadertoy::{
    config_path_for, normalize_lexically, shader_path_for_config, PathResolver, ShaderConfig,
    CONFIG_SUFFIX, IMAGE_PASS,
};
use tracing::{debug, warn};

pub const SHADER_EXTENSIONS: [&str; 2] = ["glsl", "frag"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchedFile {
    Shader,
    /// A `.sha.json`, with the shader it configures.
    Config { shader: PathBuf },
}

pub fn classify(path: &Path) -> Option<WatchedFile> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(CONFIG_SUFFIX) {
        let shader = SHADER_EXTENSIONS
            .iter()
            .filter_map(|ext| shader_path_for_config(path, ext))
            .find(|candidate| candidate.exists())
            .or_else(|| shader_path_for_config(path, SHADER_EXTENSIONS[0]))?;
        return Some(WatchedFile::Config { shader });
    }
    let extension = path.extension()?.to_str()?;
    SHADER_EXTENSIONS
        .contains(&extension)
        .then_some(WatchedFile::Shader)
}

#[derive(Debug, Clone)]
pub struct ShaderHost {
    resolver: PathResolver,
    active: PathBuf,
    /// Resolved buffer file to pass name, for the active shader.
    buffer_files: BTreeMap<PathBuf, String>,
}

impl ShaderHost {
    pub fn new(resolver: PathResolver, active: PathBuf) -> Self {
        Self {
            resolver,
            active: normalize_lexically(&active),
            buffer_files: BTreeMap::new(),
        }
    }

    pub fn active(&self) -> &Path {
        &self.active
    }

    pub fn buffer_files(&self) -> &BTreeMap<PathBuf, String> {
        &self.buffer_files
    }

    /// Reads `shader`, its `.sha.json` (if any), and every buffer source the
    /// config names. Unreadable buffer files are left out of `buffers`.
    pub fn build_message(&mut self, shader: &Path) -> Result<ShaderSourceMessage> {
        let shader = normalize_lexically(shader);
        let code = fs::read_to_string(&shader)
            .with_context(|| format!("failed to read shader at {}", shader.display()))?;
        let config_path = config_path_for(&shader);
        let config = if config_path.exists() {
            Some(ShaderConfig::load(&config_path).with_context(|| {
                format!("failed to load pass config at {}", config_path.display())
            })?)
        } else {
            None
        };

        let mut buffers = BTreeMap::new();
        let mut files = BTreeMap::new();
        let declared = config
            .iter()
            .flat_map(|config| config.passes.iter())
            .filter(|(name, _)| *name != IMAGE_PASS)
            .filter_map(|(name, pass)| Some((name, pass.path.as_deref()?)));
        for (name, declared) in declared {
            let resolved = self.resolver.resolve(&shader, declared);
            match fs::read_to_string(&resolved) {
                Ok(source) => {
                    buffers.insert(name.to_string(), source);
                }
                Err(err) => warn!(
                    pass = %name,
                    path = %resolved.display(),
                    error = %err,
                    "failed to read buffer source"
                ),
            }
            files.insert(resolved, name.to_string());
        }
        if shader == self.active {
            self.buffer_files = files;
        }

        Ok(ShaderSourceMessage {
            code,
            config,
            path: shader.to_string_lossy().into_owned(),
            buffers,
            force_cleanup: None,
            cursor_position: None,
        })
    }

    /// A message carrying a single file, used for buffer edits while locked.
    pub fn build_file_message(&self, file: &Path) -> Result<ShaderSourceMessage> {
        let code = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        Ok(ShaderSourceMessage::new(code, file.to_string_lossy()))
    }

    /// Picks the message a change to `changed` should produce.
    ///
    /// - The active shader or its config rebuilds the active shader.
    /// - A buffer file of the active shader is sent as-is while locked, so the
    ///   handler relinks only that pass, and rebuilds the active shader
    ///   otherwise.
    /// - Any other shader is sent as-is and, unless locked, becomes active.
    pub fn route_change(
        &mut self,
        changed: &Path,
        locked: bool,
    ) -> Result<Option<ShaderSourceMessage>> {
        let changed = normalize_lexically(changed);
        let Some(kind) = classify(&changed) else {
            return Ok(None);
        };
        let target = match kind {
            WatchedFile::Config { shader } => shader,
            WatchedFile::Shader => changed.clone(),
        };
        if !target.exists() {
            debug!(path = %target.display(), "changed file no longer exists");
            return Ok(None);
        }

        if target == self.active {
            let active = self.active.clone();
            return self.build_message(&active).map(Some);
        }
        if self.buffer_files.contains_key(&changed) {
            return if locked {
                self.build_file_message(&changed).map(Some)
            } else {
                let active = self.active.clone();
                self.build_message(&active).map(Some)
            };
        }
        if !locked {
            debug!(path = %target.display(), "switching active shader");
            self.active = target.clone();
        }
        self.build_message(&target).map(Some)
    }
}

/// Watches `root` recursively and offers every changed shader or config path
/// to `gate`. The watcher stops when the returned handle is dropped.
pub fn spawn_watcher(root: &Path, gate: GateSender<PathBuf>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(
        move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    if classify(&path).is_some() {
                        debug!(path = %path.display(), "change detected");
                        gate.offer(path);
                    }
                }
            }
            Err(err) => warn!(error = %err, "file watcher error"),
        },
    )
    .context("failed to create file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "version": "1.0",
        "passes": {
            "Image": {"inputs": {"iChannel0": {"type": "buffer", "source": "BufferA"}}},
            "BufferA": {"path": "gol-buffer.glsl", "inputs": {}},
            "BufferB": {"path": "missing.glsl", "inputs": {}},
            "common": {"path": "common.glsl"}
        }
    }"#;

    fn workspace() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.glsl");
        fs::write(&main, "// main").unwrap();
        fs::write(dir.path().join("main.sha.json"), CONFIG).unwrap();
        fs::write(dir.path().join("gol-buffer.glsl"), "// life").unwrap();
        fs::write(dir.path().join("common.glsl"), "// shared").unwrap();
        fs::write(dir.path().join("other.frag"), "// other").unwrap();
        (dir, main)
    }

    #[test]
    fn classifies_watched_files() {
        let (dir, main) = workspace();
        assert_eq!(classify(&main), Some(WatchedFile::Shader));
        assert_eq!(
            classify(&dir.path().join("main.sha.json")),
            Some(WatchedFile::Config { shader: main })
        );
        assert_eq!(classify(&dir.path().join("notes.txt")), None);
    }

    #[test]
    fn message_carries_config_and_readable_buffers() {
        let (_dir, main) = workspace();
        let mut host = ShaderHost::new(PathResolver::new(), main.clone());
        let message = host.build_message(&main).unwrap();
        assert_eq!(message.code, "// main");
        assert_eq!(message.path, main.to_string_lossy());
        assert_eq!(message.buffers.len(), 2);
        assert_eq!(message.buffers["BufferA"], "// life");
        assert_eq!(message.buffers["common"], "// shared");
        let config = message.config.unwrap();
        let names: Vec<&str> = config.buffer_passes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["BufferA", "BufferB"]);
        assert_eq!(host.buffer_files().len(), 3);
    }

    #[test]
    fn buffer_changes_depend_on_lock() {
        let (dir, main) = workspace();
        let buffer = dir.path().join("gol-buffer.glsl");
        let mut host = ShaderHost::new(PathResolver::new(), main.clone());
        host.build_message(&main).unwrap();

        let unlocked = host.route_change(&buffer, false).unwrap().unwrap();
        assert_eq!(unlocked.path, main.to_string_lossy());

        let locked = host.route_change(&buffer, true).unwrap().unwrap();
        assert_eq!(locked.path, buffer.to_string_lossy());
        assert_eq!(locked.code, "// life");
        assert!(locked.config.is_none());
    }

    #[test]
    fn other_shaders_become_active_only_when_unlocked() {
        let (dir, main) = workspace();
        let other = dir.path().join("other.frag");
        let mut host = ShaderHost::new(PathResolver::new(), main.clone());

        let message = host.route_change(&other, true).unwrap().unwrap();
        assert_eq!(message.path, other.to_string_lossy());
        assert_eq!(host.active(), main.as_path());

        host.route_change(&other, false).unwrap();
        assert_eq!(host.active(), other.as_path());

        let config_change = host
            .route_change(&dir.path().join("main.sha.json"), false)
            .unwrap()
            .unwrap();
        assert_eq!(config_change.path, main.to_string_lossy());
        assert!(host
            .route_change(&dir.path().join("gone.glsl"), false)
            .unwrap()
            .is_none());
    }
}
