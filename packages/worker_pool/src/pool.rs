use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture;
use crate::error::{PoolError, WorkerFailure};
use crate::worker::{Message, Offset, PoolEvent, ProcessInfo, ProcessState, Reporter};

/// Worker function: receives its data item and a reporter, returns a result.
pub type WorkerFn<D, R> = Arc<dyn Fn(D, Reporter) -> anyhow::Result<R> + Send + Sync>;

/// Receives everything the pool produces, one event at a time.
///
/// All methods run on the task that drives [`WorkerPool::run`], never
/// concurrently with each other.
pub trait MessageHandler {
    /// Inspect or rewrite a message before it is processed.
    fn get_message(&mut self, message: Message) -> Message {
        message
    }

    fn process_message(&mut self, message: Message);

    fn start_process(&mut self, _offset: Offset) {}

    /// Called after the worker at `offset` finished, successfully or not.
    fn complete_process(&mut self, _offset: Offset) {}
}

/// Runtime configuration for a pool
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// How long to wait on the queue before logging that it is quiet
    pub timeout: Duration,
    /// Maximum number of workers running at once (`None` = all)
    pub processes_to_start: Option<usize>,
    /// Stop the run on Ctrl-C instead of letting the signal kill the process
    pub handle_interrupt: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            processes_to_start: None,
            handle_interrupt: false,
        }
    }
}

/// Pool of workers, one per data item
pub struct WorkerPool<D, R> {
    function: WorkerFn<D, R>,
    process_data: Vec<D>,
    processes: Vec<ProcessInfo>,
    config: PoolConfig,
    cancel: CancellationToken,
}

impl<D, R> WorkerPool<D, R>
where
    D: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(process_data: Vec<D>, function: F, config: PoolConfig) -> Self
    where
        F: Fn(D, Reporter) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let processes = (0..process_data.len())
            .map(|index| ProcessInfo::pending(Offset(index)))
            .collect();
        Self {
            function: Arc::new(function),
            process_data,
            processes,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Number of workers, fixed at construction
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn processes(&self) -> &[ProcessInfo] {
        &self.processes
    }

    /// Per-offset durations; `None` for workers that never completed
    pub fn durations(&self) -> Vec<Option<Duration>> {
        self.processes.iter().map(|p| p.duration).collect()
    }

    /// Token cancelled when the run is interrupted. Cancelling it from
    /// outside stops the run the same way Ctrl-C does.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every worker to completion, feeding `handler` as events arrive.
    ///
    /// Results come back in offset order. The data items are consumed, so a
    /// pool runs once.
    pub async fn run<H>(&mut self, handler: &mut H) -> Result<Vec<R>, PoolError>
    where
        H: MessageHandler + ?Sized,
    {
        let process_data = std::mem::take(&mut self.process_data);
        let limit = self
            .config
            .processes_to_start
            .unwrap_or(process_data.len())
            .clamp(1, Semaphore::MAX_PERMITS);
        info!(
            "Starting {} workers, at most {} at a time",
            process_data.len(),
            limit
        );

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let slots = Arc::new(Semaphore::new(limit));
        let handles: Vec<JoinHandle<Result<R, WorkerFailure>>> = process_data
            .into_iter()
            .enumerate()
            .map(|(index, data)| {
                let reporter = Reporter::new(Offset(index), event_tx.clone(), self.cancel.clone());
                spawn_worker(self.function.clone(), data, reporter, slots.clone())
            })
            .collect();
        drop(event_tx);

        let interrupt = wait_for_interrupt(self.config.handle_interrupt, self.cancel.clone());
        tokio::pin!(interrupt);

        let mut remaining = handles.len();
        while remaining > 0 {
            let polled = tokio::select! {
                biased;
                _ = &mut interrupt => {
                    warn!("Interrupted with {} workers outstanding", remaining);
                    self.cancel.cancel();
                    return Err(PoolError::Interrupted);
                }
                polled = tokio::time::timeout(self.config.timeout, event_rx.recv()) => polled,
            };

            match polled {
                Err(_) => {
                    debug!(
                        "No messages within {:?}, {} workers outstanding",
                        self.config.timeout, remaining
                    );
                }
                Ok(None) => return Err(PoolError::QueueClosed { remaining }),
                Ok(Some(event)) => {
                    if self.dispatch(event, handler) {
                        remaining -= 1;
                    }
                }
            }
        }

        // Lines sent without an offset after their worker completed
        while let Ok(event) = event_rx.try_recv() {
            self.dispatch(event, handler);
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut first_failure = None;
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(WorkerFailure::Panicked(e.to_string())));
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => {
                    first_failure.get_or_insert(PoolError::WorkerFailed {
                        offset: Offset(index),
                        failure,
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }

    /// Apply one queue event. Returns true when it completed a worker.
    fn dispatch<H>(&mut self, event: PoolEvent, handler: &mut H) -> bool
    where
        H: MessageHandler + ?Sized,
    {
        match event {
            PoolEvent::Message(message) => {
                let message = handler.get_message(message);
                handler.process_message(message);
                false
            }
            PoolEvent::Started { offset } => {
                debug!("Worker {} started", offset);
                self.processes[offset.index()].state = ProcessState::Active;
                handler.start_process(offset);
                false
            }
            PoolEvent::Completed {
                offset,
                duration,
                failure,
            } => {
                let process = &mut self.processes[offset.index()];
                process.duration = Some(duration);
                process.state = match &failure {
                    Some(failure) => {
                        warn!("Worker {} failed: {}", offset, failure);
                        ProcessState::Failed
                    }
                    None => {
                        debug!("Worker {} completed in {:?}", offset, duration);
                        ProcessState::Complete
                    }
                };
                handler.complete_process(offset);
                true
            }
        }
    }
}

fn spawn_worker<D, R>(
    function: WorkerFn<D, R>,
    data: D,
    reporter: Reporter,
    slots: Arc<Semaphore>,
) -> JoinHandle<Result<R, WorkerFailure>>
where
    D: Send + 'static,
    R: Send + 'static,
{
    tokio::spawn(async move {
        let offset = reporter.offset();
        let events = reporter.sender();
        // The semaphore is never closed, so acquiring only fails on shutdown
        let _slot = slots
            .acquire_owned()
            .await
            .map_err(|e| WorkerFailure::Error(e.to_string()))?;

        let _ = events.send(PoolEvent::Started { offset });
        let started = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || {
            let _capture = capture::enter(reporter.clone());
            function(data, reporter)
        })
        .await;

        let outcome = match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(WorkerFailure::Error(format!("{e:#}"))),
            Err(e) if e.is_panic() => Err(WorkerFailure::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(WorkerFailure::Panicked(e.to_string())),
        };

        let _ = events.send(PoolEvent::Completed {
            offset,
            duration: started.elapsed(),
            failure: outcome.as_ref().err().cloned(),
        });
        outcome
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn wait_for_interrupt(enabled: bool, cancel: CancellationToken) {
    let ctrl_c = async {
        if enabled && tokio::signal::ctrl_c().await.is_ok() {
            return;
        }
        std::future::pending::<()>().await
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = cancel.cancelled() => {}
    }
}
