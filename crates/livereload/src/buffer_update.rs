//! Maps a changed file onto a pass of the locked shader.
//!
//! Paths are compared with `/` separators. An exact match against the
//! resolved path wins; otherwise a suffix match is accepted so absolute and
//! relative spellings of the same file line up. Two buffers sharing a file
//! name in different directories can still collide under the suffix rule.
use std::path::Path;

use renderer::PassInfo;
use shadertoy::{slash_path, PathResolver, ShaderConfig, IMAGE_PASS};
use tracing::debug;

/// The pass a changed file backs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferMatch {
    /// Actual pass name, e.g. `BufferA`.
    pub pass: String,
    /// File stem used in user-facing messages, e.g. `gol-buffer`.
    pub label: String,
}

/// Derives the user-facing label of a changed file: its name without
/// directory or extension.
pub fn buffer_label(changed_path: &str) -> String {
    let normalized = slash_path(changed_path);
    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Finds the pass whose declared `path` is `changed_path`. Pass declarations
/// come from `config` when known, from the engine's pass list otherwise.
pub fn find_buffer_pass(
    config: Option<&ShaderConfig>,
    passes: &[PassInfo],
    resolver: &PathResolver,
    shader_path: &str,
    changed_path: &str,
) -> Option<BufferMatch> {
    let label = buffer_label(changed_path);
    let declared: Vec<(String, String)> = match config {
        Some(config) => config
            .passes
            .iter()
            .filter_map(|(name, pass)| Some((name.to_string(), pass.path.clone()?)))
            .collect(),
        None => passes
            .iter()
            .filter_map(|info| Some((info.name.clone(), info.path.clone()?)))
            .collect(),
    };

    let shader = Path::new(shader_path);
    let found = declared
        .into_iter()
        .filter(|(name, _)| name != IMAGE_PASS)
        .find(|(_, path)| {
            let resolved = resolver.resolve(shader, path);
            paths_match(changed_path, &resolved.to_string_lossy(), path)
        });

    match found {
        Some((pass, _)) => Some(BufferMatch { pass, label }),
        None => {
            debug!(path = %changed_path, label = %label, "no pass declares this file");
            None
        }
    }
}

fn paths_match(changed: &str, resolved: &str, declared: &str) -> bool {
    let changed = slash_path(changed);
    let resolved = slash_path(resolved);
    if changed == resolved {
        return true;
    }
    let declared = slash_path(declared);
    let declared = declared
        .trim_start_matches("@/")
        .trim_start_matches("./");
    if declared.is_empty() {
        return false;
    }
    changed == declared
        || changed.ends_with(&format!("/{declared}"))
        || resolved.ends_with(&format!("/{}", changed.trim_start_matches("./")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadertoy::Pass;

    fn config() -> ShaderConfig {
        let mut config = ShaderConfig::default();
        config
            .passes
            .insert("BufferA", Pass::with_path("gol-buffer.glsl"));
        config
            .passes
            .insert("BufferB", Pass::with_path("@/shared/blur.glsl"));
        config.passes.insert("common", Pass::with_path("common.glsl"));
        config
    }

    fn find(changed: &str) -> Option<BufferMatch> {
        find_buffer_pass(
            Some(&config()),
            &[],
            &PathResolver::with_workspace_roots(["/proj"]),
            "/proj/shaders/main.glsl",
            changed,
        )
    }

    #[test]
    fn file_name_maps_to_actual_pass() {
        assert_eq!(
            find("/proj/shaders/gol-buffer.glsl"),
            Some(BufferMatch {
                pass: "BufferA".into(),
                label: "gol-buffer".into()
            })
        );
        // relative spelling of the same file
        assert_eq!(find("shaders/gol-buffer.glsl").unwrap().pass, "BufferA");
        assert_eq!(find("/proj/shared/blur.glsl").unwrap().pass, "BufferB");
        assert_eq!(find("C:\\proj\\shaders\\common.glsl").unwrap().pass, "common");
    }

    #[test]
    fn file_named_like_a_pass_is_not_enough() {
        assert_eq!(find("/proj/shaders/BufferA.glsl"), None);
        assert_eq!(find("/proj/shaders/main.glsl"), None);
    }

    #[test]
    fn falls_back_to_engine_pass_list() {
        let passes = vec![
            PassInfo {
                name: "Image".into(),
                path: None,
            },
            PassInfo {
                name: "BufferC".into(),
                path: Some("feedback.glsl".into()),
            },
        ];
        let found = find_buffer_pass(
            None,
            &passes,
            &PathResolver::new(),
            "/proj/main.glsl",
            "/proj/feedback.glsl",
        );
        assert_eq!(found.unwrap().pass, "BufferC");
    }

    #[test]
    fn labels_strip_directory_and_extension() {
        assert_eq!(buffer_label("/a/b/gol-buffer.glsl"), "gol-buffer");
        assert_eq!(buffer_label("C:\\a\\noise.frag"), "noise");
        assert_eq!(buffer_label("plain"), "plain");
    }
}
