//! Rendering side of shadewatch.
//!
//! The crate owns everything that turns a shader configuration into a pass
//! graph:
//!
//! ```text
//!   ShaderConfig + sources
//!          │ compile_shader_pipeline()
//!          ▼
//!   compile::wrap_shadertoy_fragment ──▶ naga parse + validate
//!          │
//!          ▼
//!   PassGraph (buffers in order, Image last, ping-pong targets)
//!          │ render_frame()
//!          ▼
//!   PassRenderer::bind_channels ──▶ ChannelSet ──▶ ChannelResolutionBlock
//! ```
//!
//! [`RenderingEngine`] is the seam the live-reload coordinator talks to.
//! [`HeadlessEngine`] implements it without a GPU so the whole flow can be
//! driven from a terminal or a test.

mod channels;
mod compile;
mod engine;
mod graph;
mod headless;
mod keyboard;
mod types;
mod uniforms;

pub use channels::{BufferTargets, CachedTexture, PassRenderer, TextureCache};
pub use compile::{compile_fragment, wrap_shadertoy_fragment, CompiledProgram};
pub use engine::{CompileOutcome, PassInfo, RenderingEngine};
pub use graph::{CompiledPass, PassGraph, TargetPair};
pub use headless::{FrameReport, HeadlessEngine, PassFrame};
pub use keyboard::{
    KeyboardState, KEYBOARD_BYTES_PER_PIXEL, KEYBOARD_TEXTURE_HEIGHT, KEYBOARD_TEXTURE_WIDTH,
};
pub use types::{
    ChannelBinding, ChannelSet, ChannelTexture, SamplerSettings, TextureId, TextureInfo,
    CHANNEL_COUNT,
};
pub use uniforms::ChannelResolutionBlock;
