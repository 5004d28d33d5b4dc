//! Progress Bar - rule-driven progress state for a single worker line
//!
//! A [`ProgressBar`] watches the text lines a worker logs and turns the ones it
//! recognizes into progress: a total, a running count and an alias. It never
//! writes to the terminal itself; callers ask it to [`render`](BarState::render)
//! and decide where the text goes.
//!
//! # Example
//!
//! ```
//! use progress_bar::{BarOptions, BarState, ProgressBar, RuleSet};
//!
//! let mut bar = ProgressBar::new(RuleSet::default().into(), BarOptions::default());
//! assert!(bar.match_line("processing total of 2"));
//! assert!(bar.match_line("processed item 0"));
//! assert!(bar.match_line("processed item 1"));
//! assert!(bar.is_complete());
//! assert!(bar.render().contains("100%"));
//! ```

mod bar;
mod error;
mod render;
mod rules;

use std::time::Duration;

pub use bar::{BarOptions, ProgressBar};
pub use error::BarError;
pub use render::format_duration;
pub use rules::{
    DEFAULT_ALIAS_RULE, DEFAULT_COUNT_RULE, DEFAULT_TOTAL_RULE, RuleMatch, RuleSet,
};

/// The capability a display needs from one line of progress state.
pub trait BarState {
    /// Feed one line of worker output. Returns true when the state changed.
    fn match_line(&mut self, text: &str) -> bool;

    /// Return to the initial, empty state.
    fn reset(&mut self);

    fn is_complete(&self) -> bool;

    fn set_complete(&mut self, complete: bool);

    /// Elapsed time of the worker behind this line, if known.
    fn set_duration(&mut self, duration: Option<Duration>);

    /// Single-line textual representation, without a trailing newline.
    fn render(&self) -> String;
}
