//! Per-frame channel resolution: turns a pass's declared `iChannel0..3`
//! inputs into concrete texture bindings.
//!
//! - Textures and videos come from `TextureCache`, looked up by resolved path
//!   first and by the raw declared path second. Anything unresolved binds the
//!   placeholder so a frame is never blocked.
//! - Buffer inputs bind the named pass's front target, which is the previous
//!   frame's output when a pass reads itself.
//! - Keyboard inputs refresh the keyboard texture before binding it.
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::flip_vertical_in_place;
use image::GenericImageView;
use shadertoy::{ChannelInput, Pass, PathResolver, CHANNEL_NAMES};

use crate::keyboard::KeyboardState;
use crate::types::{
    ChannelBinding, ChannelSet, ChannelTexture, SamplerSettings, TextureId, TextureInfo,
};

/// Read access to the front render target of buffer passes.
pub trait BufferTargets {
    fn front_target(&self, pass: &str) -> Option<TextureInfo>;
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct CachedTexture {
    pub info: TextureInfo,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct TextureCache {
    keys: HashMap<String, TextureId>,
    textures: HashMap<TextureId, CachedTexture>,
    next_id: TextureId,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CachedTexture> {
        self.keys.get(key).and_then(|id| self.textures.get(id))
    }

    /// Stores pixels under every key in `keys` and returns the new handle.
    pub fn insert(&mut self, keys: &[&str], width: u32, height: u32, rgba: Vec<u8>) -> TextureInfo {
        self.next_id += 1;
        let info = TextureInfo {
            id: self.next_id,
            width,
            height,
        };
        self.textures.insert(info.id, CachedTexture { info, rgba });
        for key in keys {
            self.keys.insert((*key).to_string(), info.id);
        }
        info
    }

    /// Decodes `resolved` and caches it under the resolved and declared paths.
    /// Already-cached paths are not decoded again.
    pub fn load(&mut self, resolved: &Path, declared: &str, vflip: bool) -> Result<TextureInfo> {
        let resolved_key = resolved.to_string_lossy().into_owned();
        if let Some(existing) = self.get(&resolved_key) {
            let info = existing.info;
            self.keys.insert(declared.to_string(), info.id);
            return Ok(info);
        }

        let image = image::open(resolved)
            .with_context(|| format!("failed to open texture at {}", resolved.display()))?;
        let (width, height) = image.dimensions();
        let mut rgba = image.to_rgba8();
        if vflip {
            flip_vertical_in_place(&mut rgba);
        }
        tracing::debug!(path = %resolved.display(), width, height, "cached channel texture");
        Ok(self.insert(&[&resolved_key, declared], width, height, rgba.into_raw()))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.textures.clear();
    }
}

/// Resolves channel bindings for passes of the shader at `shader_path`.
#[derive(Debug, Clone, Default)]
pub struct PassRenderer {
    resolver: PathResolver,
}

impl PassRenderer {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn bind_channels(
        &self,
        shader_path: &Path,
        pass_name: &str,
        pass: &Pass,
        textures: &TextureCache,
        targets: &dyn BufferTargets,
        keyboard: &mut KeyboardState,
    ) -> ChannelSet {
        let mut channels = ChannelSet::default();
        for (slot, channel) in CHANNEL_NAMES.iter().enumerate() {
            let Some(input) = pass.inputs.get(*channel) else {
                continue;
            };
            channels.bindings[slot] = match input {
                ChannelInput::Texture(media) | ChannelInput::Video(media) => {
                    let resolved = self.resolver.resolve(shader_path, &media.path);
                    let cached = textures
                        .get(&resolved.to_string_lossy())
                        .or_else(|| textures.get(&media.path));
                    match cached {
                        Some(texture) => ChannelBinding {
                            texture: ChannelTexture::Media(texture.info),
                            sampler: SamplerSettings::from_media(media),
                        },
                        None => {
                            tracing::debug!(
                                pass = %pass_name,
                                channel = %channel,
                                path = %media.path,
                                "texture not cached; binding placeholder"
                            );
                            ChannelBinding::placeholder()
                        }
                    }
                }
                ChannelInput::Buffer { source } => match targets.front_target(source) {
                    Some(target) => ChannelBinding {
                        texture: ChannelTexture::Buffer {
                            pass: source.clone(),
                            target,
                        },
                        sampler: SamplerSettings::default(),
                    },
                    None => {
                        tracing::debug!(
                            pass = %pass_name,
                            channel = %channel,
                            source = %source,
                            "buffer target missing; binding placeholder"
                        );
                        ChannelBinding::placeholder()
                    }
                },
                ChannelInput::Keyboard => {
                    keyboard.refresh_texture();
                    ChannelBinding {
                        texture: ChannelTexture::Keyboard,
                        sampler: SamplerSettings::keyboard(),
                    }
                }
            };
        }
        channels
    }
}
