//! Declarative pass configuration shared by the host (which parses the
//! `.sha.json` file next to a shader) and the render client (which compiles
//! and binds the passes it describes).
//!
//! Types:
//!
//! - `ShaderConfig` is the whole pipeline: a version tag plus an ordered map of
//!   passes. `Image` is always the final pass, `common` is shared source that is
//!   never rendered, every other entry is a buffer pass.
//! - `Pass` stores the optional source path and the `iChannel0..3` inputs.
//! - `ChannelInput` enumerates what a channel samples: a texture, a video, the
//!   output of another pass, or the keyboard state texture.
//! - `FilterMode` and `WrapMode` are the accepted sampler settings. The model
//!   keeps raw strings so `validate` can report unknown values instead of the
//!   parser rejecting the whole file.
//!
//! Functions:
//!
//! - `ShaderConfig::validate` aggregates every issue it finds so editors can
//!   surface them all at once.
//! - `validate_input` checks one channel input and is reused by `BufferConfig`.
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ConfigError;

/// Name of the final pass presented to the screen.
pub const IMAGE_PASS: &str = "Image";
/// Name of the shared-source pass prepended to every other pass.
pub const COMMON_PASS: &str = "common";
/// Version written into freshly created configurations.
pub const CONFIG_VERSION: &str = "1.0";
/// Channel slot names a pass may declare, in binding order.
pub const CHANNEL_NAMES: [&str; 4] = ["iChannel0", "iChannel1", "iChannel2", "iChannel3"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub passes: PassMap,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

impl Default for ShaderConfig {
    fn default() -> Self {
        let mut passes = PassMap::default();
        passes.insert(IMAGE_PASS, Pass::default());
        Self {
            version: default_version(),
            passes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, ChannelInput>,
}

impl Pass {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            inputs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelInput {
    Texture(MediaInput),
    Video(MediaInput),
    Buffer { source: String },
    Keyboard,
}

/// Sampling options shared by texture and video inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInput {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vflip: Option<bool>,
}

impl MediaInput {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parsed filter, `None` when unset or unknown.
    pub fn filter_mode(&self) -> Option<FilterMode> {
        self.filter.as_deref().and_then(FilterMode::parse)
    }

    /// Parsed wrap mode, `None` when unset or unknown.
    pub fn wrap_mode(&self) -> Option<WrapMode> {
        self.wrap.as_deref().and_then(WrapMode::parse)
    }

    /// ShaderToy flips textures unless told otherwise.
    pub fn flips_vertically(&self) -> bool {
        self.vflip.unwrap_or(true)
    }
}

impl ChannelInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelInput::Texture(_) => "texture",
            ChannelInput::Video(_) => "video",
            ChannelInput::Buffer { .. } => "buffer",
            ChannelInput::Keyboard => "keyboard",
        }
    }

    pub fn media(&self) -> Option<&MediaInput> {
        match self {
            ChannelInput::Texture(media) | ChannelInput::Video(media) => Some(media),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    Mipmap,
}

impl FilterMode {
    pub const ACCEPTED: [&'static str; 3] = ["nearest", "linear", "mipmap"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nearest" => Some(Self::Nearest),
            "linear" => Some(Self::Linear),
            "mipmap" => Some(Self::Mipmap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    Repeat,
    Mirror,
}

impl WrapMode {
    pub const ACCEPTED: [&'static str; 3] = ["clamp", "repeat", "mirror"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clamp" => Some(Self::Clamp),
            "repeat" => Some(Self::Repeat),
            "mirror" => Some(Self::Mirror),
            _ => None,
        }
    }
}

/// Returns true for `Image` and `common`, which cannot be added or removed as
/// buffers.
pub fn is_reserved_pass(name: &str) -> bool {
    name == IMAGE_PASS || name == COMMON_PASS
}

/// Pass map that keeps the order passes were declared or inserted in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassMap {
    entries: Vec<(String, Pass)>,
}

impl PassMap {
    pub fn get(&self, name: &str) -> Option<&Pass> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, pass)| pass)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pass> {
        self.entries
            .iter_mut()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, pass)| pass)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces an existing pass in place or appends a new one.
    pub fn insert(&mut self, name: impl Into<String>, pass: Pass) -> Option<Pass> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => Some(std::mem::replace(existing, pass)),
            None => {
                self.entries.push((name, pass));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Pass> {
        let index = self.entries.iter().position(|(candidate, _)| candidate == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pass)> {
        self.entries.iter().map(|(name, pass)| (name.as_str(), pass))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Pass)> {
        self.entries
            .iter_mut()
            .map(|(name, pass)| (name.as_str(), pass))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PassMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, pass) in &self.entries {
            map.serialize_entry(name, pass)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PassMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PassMapVisitor;

        impl<'de> Visitor<'de> for PassMapVisitor {
            type Value = PassMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of pass names to pass definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PassMap, A::Error> {
                let mut passes = PassMap::default();
                while let Some((name, pass)) = access.next_entry::<String, Pass>()? {
                    passes.insert(name, pass);
                }
                Ok(passes)
            }
        }

        deserializer.deserialize_map(PassMapVisitor)
    }
}

impl ShaderConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_json_pretty()?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Buffer passes in declaration order, excluding `Image` and `common`.
    pub fn buffer_passes(&self) -> impl Iterator<Item = (&str, &Pass)> {
        self.passes.iter().filter(|(name, _)| !is_reserved_pass(name))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.passes.contains(IMAGE_PASS) {
            issues.push(format!("configuration must declare an '{IMAGE_PASS}' pass"));
        }
        for (name, pass) in self.passes.iter() {
            if name != IMAGE_PASS && pass.path.as_deref().map_or(true, str::is_empty) {
                issues.push(format!("pass '{name}' must declare a source path"));
            }
            for (channel, input) in &pass.inputs {
                if !CHANNEL_NAMES.contains(&channel.as_str()) {
                    issues.push(format!(
                        "pass '{name}' uses channel '{channel}'; expected iChannel0-iChannel3"
                    ));
                }
                issues.extend(
                    validate_input(channel, input)
                        .into_iter()
                        .map(|issue| format!("pass '{name}': {issue}")),
                );
                if let ChannelInput::Buffer { source } = input {
                    if !self.passes.contains(source) {
                        issues.push(format!(
                            "pass '{name}' references buffer '{source}' which is undefined"
                        ));
                    }
                }
            }
        }
        issues
    }
}

/// Checks one channel input against the accepted shapes and enums.
pub fn validate_input(channel: &str, input: &ChannelInput) -> Vec<String> {
    let mut issues = Vec::new();
    match input {
        ChannelInput::Texture(media) | ChannelInput::Video(media) => {
            if media.path.trim().is_empty() {
                issues.push(format!(
                    "{channel}: {} input requires a path",
                    input.kind()
                ));
            }
            if let Some(filter) = media.filter.as_deref() {
                if FilterMode::parse(filter).is_none() {
                    issues.push(format!(
                        "{channel}: invalid filter '{filter}' (expected one of {})",
                        FilterMode::ACCEPTED.join(", ")
                    ));
                }
            }
            if let Some(wrap) = media.wrap.as_deref() {
                if WrapMode::parse(wrap).is_none() {
                    issues.push(format!(
                        "{channel}: invalid wrap '{wrap}' (expected one of {})",
                        WrapMode::ACCEPTED.join(", ")
                    ));
                }
            }
        }
        ChannelInput::Buffer { source } => {
            if source.trim().is_empty() {
                issues.push(format!("{channel}: buffer input requires a source pass"));
            }
        }
        ChannelInput::Keyboard => {}
    }
    issues
}
