use crate::worker::Offset;

/// Why a single worker did not produce a result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerFailure {
    /// The worker function returned an error
    #[error("worker returned an error: {0}")]
    Error(String),
    /// The worker function panicked
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Errors that can occur while running a pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A worker failed; the lowest failing offset is reported
    #[error("worker at {offset} failed: {failure}")]
    WorkerFailed {
        offset: Offset,
        #[source]
        failure: WorkerFailure,
    },
    /// The run was interrupted before every worker completed
    #[error("run interrupted")]
    Interrupted,
    /// The message queue closed while workers were still outstanding
    #[error("message queue closed with {remaining} workers outstanding")]
    QueueClosed { remaining: usize },
}
