//! Lock-free input inbox between the listener and a room's tick loop.
//!
//! The listener submits decoded input frames without blocking; the room
//! drains everything pending at the start of each tick. The channel is
//! bounded — a flooding sender gets drops, never backpressure into the
//! receive loop.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::input::InputFrame;

/// Room-side end: created with the room, drained every tick.
pub struct RoomInbox {
    sender: Sender<InputFrame>,
    receiver: Receiver<InputFrame>,
    capacity: usize,
}

impl RoomInbox {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// A clonable submission handle for the listener.
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            sender: self.sender.clone(),
        }
    }

    /// Drains all pending frames for this tick.
    pub fn drain(&self) -> Vec<InputFrame> {
        self.receiver.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RoomInbox {
    fn default() -> Self {
        // Four slots bursting well above the tick rate still fit.
        Self::new(256)
    }
}

/// Listener-side submission handle.
#[derive(Clone)]
pub struct InboxSender {
    sender: Sender<InputFrame>,
}

impl InboxSender {
    pub fn try_send(&self, frame: InputFrame) -> Result<(), InboxError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => InboxError::Full,
            TrySendError::Disconnected(_) => InboxError::Closed,
        })
    }
}

/// Submission failures; both mean the frame was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InboxError {
    #[error("inbox full")]
    Full,
    #[error("room gone")]
    Closed,
}
