//! Coordination core for live shader editing.
//!
//! Inbound `shaderSource` and `cursorPosition` messages enter
//! [`MessageHandler`], which applies the lock, picks between a full pipeline
//! rebuild and a single-pass relink, and reports the outcome over a
//! [`Transport`]. [`ShaderProcessor`] runs the actual compile cycle against a
//! [`renderer::RenderingEngine`].
mod buffer_update;
mod debug;
mod gate;
mod handler;
mod locker;
mod message;
mod processor;
mod transport;

#[cfg(test)]
mod test_support;

pub use buffer_update::{buffer_label, find_buffer_pass, BufferMatch};
pub use debug::{modify_shader_for_debugging, ShaderDebugManager};
pub use gate::{CompileGate, GateSender};
pub use handler::{MessageHandler, COMPILED_LOG};
pub use locker::ShaderLocker;
pub use message::{
    CursorPosition, HandleResult, InboundMessage, OutboundMessage, ShaderSourceMessage,
};
pub use processor::ShaderProcessor;
pub use transport::{ChannelTransport, Debounced, Transport, TransportError, DEFAULT_DEBOUNCE};
