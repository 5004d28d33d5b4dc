//! Multibar - a block of terminal progress lines, one per worker
//!
//! Workers run in a [`worker_pool::WorkerPool`] and report progress as text
//! lines. [`MultiBar`] routes each line to the worker's [`BarState`], and when
//! the bar changes, redraws just that line in place using relative cursor
//! movement. Without a terminal on stderr nothing is drawn until the final
//! block, which is always written so captured output ends with the results.
//!
//! Two lines are reserved as control tokens: `reset-mppbar` resets the
//! sender's bar, and `reset-mppbar-complete` marks every bar complete. Note
//! that the latter is a broadcast; it is not scoped to the sender's line.
//!
//! [`BarState`]: progress_bar::BarState

pub mod canvas;
pub mod config;
mod coordinator;
mod error;
pub mod router;

pub use canvas::{Canvas, Movement};
pub use config::{FileConfig, load_config};
pub use coordinator::MultiBar;
pub use error::MultiBarError;
pub use router::{Directive, RESET_COMPLETE_TOKEN, RESET_TOKEN, parse_marker, route};
