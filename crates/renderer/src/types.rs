use shadertoy::{FilterMode, MediaInput, WrapMode};

/// ShaderToy exposes four optional input channels (`iChannel0-3`).
pub const CHANNEL_COUNT: usize = 4;

/// Opaque handle to a texture owned by whoever renders the frame.
pub type TextureId = u64;

/// Texture handle plus the dimensions reported through `iChannelResolution`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

/// What a channel slot samples during a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelTexture {
    /// Unset slot or a texture that could not be resolved.
    Placeholder,
    /// A decoded image or the current frame of a video.
    Media(TextureInfo),
    /// Front target of a buffer pass; a pass may name itself to read its
    /// previous frame.
    Buffer { pass: String, target: TextureInfo },
    /// The 256x3 keyboard state texture.
    Keyboard,
}

/// Sampler state requested by the channel input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerSettings {
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            filter: FilterMode::Linear,
            wrap: WrapMode::Clamp,
        }
    }
}

impl SamplerSettings {
    pub fn from_media(media: &MediaInput) -> Self {
        let defaults = Self::default();
        Self {
            filter: media.filter_mode().unwrap_or(defaults.filter),
            wrap: media.wrap_mode().unwrap_or(defaults.wrap),
        }
    }

    /// Keyboard lookups must never be interpolated.
    pub fn keyboard() -> Self {
        Self {
            filter: FilterMode::Nearest,
            wrap: WrapMode::Clamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelBinding {
    pub texture: ChannelTexture,
    pub sampler: SamplerSettings,
}

impl ChannelBinding {
    pub fn placeholder() -> Self {
        Self {
            texture: ChannelTexture::Placeholder,
            sampler: SamplerSettings::default(),
        }
    }

    /// Value reported through `iChannelResolution` for this slot.
    pub fn resolution(&self) -> [f32; 3] {
        match &self.texture {
            ChannelTexture::Placeholder => [0.0, 0.0, 0.0],
            ChannelTexture::Media(info) | ChannelTexture::Buffer { target: info, .. } => {
                [info.width as f32, info.height as f32, 1.0]
            }
            ChannelTexture::Keyboard => [
                crate::keyboard::KEYBOARD_TEXTURE_WIDTH as f32,
                crate::keyboard::KEYBOARD_TEXTURE_HEIGHT as f32,
                1.0,
            ],
        }
    }
}

/// The four bindings of one pass for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSet {
    pub bindings: [ChannelBinding; CHANNEL_COUNT],
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self {
            bindings: std::array::from_fn(|_| ChannelBinding::placeholder()),
        }
    }
}

impl ChannelSet {
    pub fn resolutions(&self) -> [[f32; 3]; CHANNEL_COUNT] {
        std::array::from_fn(|index| self.bindings[index].resolution())
    }
}
