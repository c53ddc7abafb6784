use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::message::OutboundMessage;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport receiver disconnected")]
    Disconnected,
    #[error("transport failed: {0}")]
    Other(String),
}

/// Outbound side of the host connection.
pub trait Transport {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        (**self).send(message)
    }
}

/// Forwards messages into a crossbeam channel drained by the host thread.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: Sender<OutboundMessage>,
}

impl ChannelTransport {
    pub fn new(sender: Sender<OutboundMessage>) -> Self {
        Self { sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::Disconnected)
    }
}

/// Drops a message identical to the previous one if it arrives within
/// `window`. `refresh` requests always go through.
#[derive(Debug)]
pub struct Debounced<T> {
    inner: T,
    window: Duration,
    last: Option<(OutboundMessage, Instant)>,
}

impl<T: Transport> Debounced<T> {
    pub fn new(inner: T) -> Self {
        Self::with_window(inner, DEFAULT_DEBOUNCE)
    }

    pub fn with_window(inner: T, window: Duration) -> Self {
        Self {
            inner,
            window,
            last: None,
        }
    }
}

impl<T: Transport> Transport for Debounced<T> {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        let now = Instant::now();
        if !matches!(message, OutboundMessage::Refresh { .. }) {
            if let Some((previous, at)) = &self.last {
                if *previous == message && now.duration_since(*at) < self.window {
                    debug!(?message, "suppressed duplicate outbound message");
                    return Ok(());
                }
            }
        }
        self.inner.send(message.clone())?;
        self.last = Some((message, now));
        Ok(())
    }
}
