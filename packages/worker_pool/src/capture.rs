//! Forwarding of `tracing` events emitted by worker code into the pool queue.
//!
//! Workers can report progress with plain `tracing::debug!` calls instead of
//! going through their [`Reporter`]. The pool marks each worker thread with
//! its reporter for the duration of the worker function, and
//! [`WorkerLogLayer`] turns the message of every event seen on a marked
//! thread into a queued line.

use std::cell::RefCell;
use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::worker::Reporter;

thread_local! {
    static CURRENT_WORKER: RefCell<Option<Reporter>> = const { RefCell::new(None) };
}

/// Marks the current thread as running a worker until dropped
pub(crate) struct CaptureGuard {
    previous: Option<Reporter>,
}

pub(crate) fn enter(reporter: Reporter) -> CaptureGuard {
    let previous = CURRENT_WORKER.with(|current| current.replace(Some(reporter)));
    CaptureGuard { previous }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_WORKER.with(|current| current.replace(previous));
    }
}

/// `tracing` layer that queues worker log messages as progress lines.
///
/// Install it without a level filter so worker `debug!` events reach it even
/// when the console output is filtered more strictly:
///
/// ```no_run
/// use tracing_subscriber::prelude::*;
/// use tracing_subscriber::{EnvFilter, fmt};
///
/// tracing_subscriber::registry()
///     .with(fmt::layer().with_filter(EnvFilter::new("warn")))
///     .with(worker_pool::WorkerLogLayer)
///     .init();
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerLogLayer;

impl<S: Subscriber> Layer<S> for WorkerLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        CURRENT_WORKER.with(|current| {
            let current = current.borrow();
            let Some(reporter) = current.as_ref() else {
                return;
            };
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            if let Some(text) = visitor.message {
                reporter.send(text);
            }
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}
