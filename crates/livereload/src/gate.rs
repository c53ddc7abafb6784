use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

/// Single-slot hand-off between producer threads and the compile thread.
///
/// At most one item waits in the slot. Offering while it is occupied drops
/// the offered item: the next edit produces a fresh one anyway, and nothing
/// ever queues up behind a slow compile.
#[derive(Debug)]
pub struct CompileGate<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

/// Producer side of a [`CompileGate`].
#[derive(Debug)]
pub struct GateSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for GateSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> GateSender<T> {
    /// Returns `false` when the item was dropped.
    pub fn offer(&self, item: T) -> bool {
        match self.sender.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("compile slot busy; dropping update");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl<T> Default for CompileGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompileGate<T> {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self { sender, receiver }
    }

    pub fn sender(&self) -> GateSender<T> {
        GateSender {
            sender: self.sender.clone(),
        }
    }

    pub fn offer(&self, item: T) -> bool {
        self.sender().offer(item)
    }

    pub fn receiver(&self) -> &Receiver<T> {
        &self.receiver
    }

    /// Takes the waiting item, freeing the slot.
    pub fn take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn drops_newest_while_busy() {
        let gate = CompileGate::new();
        assert!(gate.offer("first"));
        assert!(!gate.offer("second"));
        assert_eq!(gate.take(), Some("first"));
        assert_eq!(gate.take(), None);
        assert!(gate.offer("third"));
        assert_eq!(gate.take(), Some("third"));
    }

    #[test]
    fn senders_work_across_threads() {
        let gate = CompileGate::new();
        let sender = gate.sender();
        thread::spawn(move || {
            assert!(sender.offer(7u32));
        })
        .join()
        .unwrap();
        assert_eq!(gate.receiver().recv().unwrap(), 7);
    }
}
