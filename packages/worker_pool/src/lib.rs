//! Worker Pool - concurrent worker execution with a single ordered message queue
//!
//! Every worker runs on its own blocking thread and reports progress as plain
//! text lines. All lines, together with the start and completion of each
//! worker, are funnelled through one queue and handed to a [`MessageHandler`]
//! one at a time on the caller's task. A worker's lines always reach the
//! handler before its completion does.
//!
//! # Example
//!
//! ```no_run
//! use worker_pool::{Message, MessageHandler, PoolConfig, Reporter, WorkerPool};
//!
//! struct Printer;
//!
//! impl MessageHandler for Printer {
//!     fn process_message(&mut self, message: Message) {
//!         println!("{:?}: {}", message.offset, message.text);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut pool = WorkerPool::new(
//!         vec![3u64, 5],
//!         |total: u64, reporter: Reporter| {
//!             for index in 0..total {
//!                 reporter.send(format!("processed item {index}"));
//!             }
//!             Ok(total)
//!         },
//!         PoolConfig::default(),
//!     );
//!
//!     let results = pool.run(&mut Printer).await.unwrap();
//!     assert_eq!(results, vec![3, 5]);
//! }
//! ```

mod capture;
mod error;
mod pool;
pub mod worker;

pub use capture::WorkerLogLayer;
pub use error::{PoolError, WorkerFailure};
pub use pool::{MessageHandler, PoolConfig, WorkerPool};
pub use worker::{Message, Offset, ProcessInfo, ProcessState, Reporter};
