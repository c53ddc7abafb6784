//! Pass configuration for ShaderToy-style multi-pass shaders: the data model
//! read from `.sha.json` files, path resolution for the files it names, and
//! the editable `ConfigManager`/`BufferConfig` layer used by form editors.
mod buffer_config;
mod config;
mod config_manager;
mod path;

use std::path::{Path, PathBuf};

pub use buffer_config::{BufferConfig, ChannelInputPatch, ValidationReport};
pub use config::{
    is_reserved_pass, validate_input, ChannelInput, FilterMode, MediaInput, Pass, PassMap,
    ShaderConfig, WrapMode, CHANNEL_NAMES, COMMON_PASS, CONFIG_VERSION, IMAGE_PASS,
};
pub use config_manager::ConfigManager;
pub use path::{is_platform_absolute, normalize_lexically, slash_path, PathResolver};

/// File suffix of the pass configuration stored next to a shader.
pub const CONFIG_SUFFIX: &str = ".sha.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read or write configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid update for {channel}: {reason}")]
    InvalidPatch { channel: String, reason: String },
}

/// `shaders/main.glsl` keeps its passes in `shaders/main.sha.json`.
pub fn config_path_for(shader: &Path) -> PathBuf {
    let stem = shader
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    shader.with_file_name(format!("{stem}{CONFIG_SUFFIX}"))
}

/// Inverse of `config_path_for`: the shader a `.sha.json` belongs to, given the
/// shader extension to look for.
pub fn shader_path_for_config(config: &Path, extension: &str) -> Option<PathBuf> {
    let name = config.file_name()?.to_str()?;
    let stem = name.strip_suffix(CONFIG_SUFFIX)?;
    Some(config.with_file_name(format!("{stem}.{extension}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_sits_next_to_shader() {
        assert_eq!(
            config_path_for(Path::new("/proj/main.glsl")),
            PathBuf::from("/proj/main.sha.json")
        );
    }

    #[test]
    fn config_maps_back_to_shader() {
        assert_eq!(
            shader_path_for_config(Path::new("/proj/main.sha.json"), "glsl"),
            Some(PathBuf::from("/proj/main.glsl"))
        );
        assert_eq!(
            shader_path_for_config(Path::new("/proj/main.json"), "glsl"),
            None
        );
    }
}
