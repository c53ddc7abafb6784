use bytemuck::{Pod, Zeroable};

use crate::types::{ChannelSet, CHANNEL_COUNT};

/// `iChannelResolution[4]` laid out for a std140 uniform block (each `vec3`
/// padded to 16 bytes).
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelResolutionBlock {
    pub i_channel_resolution: [[f32; 4]; CHANNEL_COUNT],
}

unsafe impl Zeroable for ChannelResolutionBlock {}
unsafe impl Pod for ChannelResolutionBlock {}

impl ChannelResolutionBlock {
    pub fn from_channels(channels: &ChannelSet) -> Self {
        let resolutions = channels.resolutions();
        Self {
            i_channel_resolution: std::array::from_fn(|index| {
                let [x, y, z] = resolutions[index];
                [x, y, z, 0.0]
            }),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelBinding, ChannelTexture, SamplerSettings};

    #[test]
    fn packs_each_channel_into_a_vec4_slot() {
        let mut channels = ChannelSet::default();
        channels.bindings[1] = ChannelBinding {
            texture: ChannelTexture::Keyboard,
            sampler: SamplerSettings::keyboard(),
        };
        let block = ChannelResolutionBlock::from_channels(&channels);
        assert_eq!(block.as_bytes().len(), 64);
        assert_eq!(block.i_channel_resolution[0], [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(block.i_channel_resolution[1], [256.0, 3.0, 1.0, 0.0]);
    }
}
