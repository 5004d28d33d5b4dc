use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerFailure;

/// Position of a worker within its pool, fixed for the lifetime of a run
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Offset(pub usize);

impl Offset {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offset-{}", self.0)
    }
}

/// One line of worker output. `offset` is `None` when the sender could not
/// be attributed to a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub offset: Option<Offset>,
    pub text: String,
}

impl Message {
    pub fn new(offset: Offset, text: impl Into<String>) -> Self {
        Self {
            offset: Some(offset),
            text: text.into(),
        }
    }

    pub fn unattributed(text: impl Into<String>) -> Self {
        Self {
            offset: None,
            text: text.into(),
        }
    }
}

/// Lifecycle of a worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Waiting for a free slot
    Pending,
    Active,
    Complete,
    /// Completed with an error or a panic
    Failed,
}

/// Bookkeeping for one worker
#[derive(Clone, Debug)]
pub struct ProcessInfo {
    pub offset: Offset,
    pub state: ProcessState,
    /// Wall time between start and completion, once completed
    pub duration: Option<Duration>,
}

impl ProcessInfo {
    pub(crate) fn pending(offset: Offset) -> Self {
        Self {
            offset,
            state: ProcessState::Pending,
            duration: None,
        }
    }
}

/// Everything that travels through the pool's queue
#[derive(Debug)]
pub(crate) enum PoolEvent {
    Message(Message),
    Started {
        offset: Offset,
    },
    Completed {
        offset: Offset,
        duration: Duration,
        failure: Option<WorkerFailure>,
    },
}

/// Handle given to a worker function for reporting its progress
#[derive(Clone, Debug)]
pub struct Reporter {
    offset: Offset,
    sender: mpsc::UnboundedSender<PoolEvent>,
    cancel: CancellationToken,
}

impl Reporter {
    pub(crate) fn new(
        offset: Offset,
        sender: mpsc::UnboundedSender<PoolEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            offset,
            sender,
            cancel,
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<PoolEvent> {
        self.sender.clone()
    }

    /// Queue a line attributed to this worker
    pub fn send(&self, text: impl Into<String>) {
        let _ = self
            .sender
            .send(PoolEvent::Message(Message::new(self.offset, text)));
    }

    /// Queue a line without an offset. Receivers may still recover one from
    /// a `#<offset>-` marker embedded in the text.
    pub fn send_unattributed(&self, text: impl Into<String>) {
        let _ = self
            .sender
            .send(PoolEvent::Message(Message::unattributed(text)));
    }

    /// True once the run has been interrupted; workers should stop early
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
