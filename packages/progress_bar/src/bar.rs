use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BarState;
use crate::render::{View, render_line};
use crate::rules::{RuleMatch, RuleSet};

/// Presentation knobs (lives under `[bar]` in config.toml).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarOptions {
    /// Number of cells between the bar's delimiters.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Pad the count and total to the digit width of this value so bars of
    /// different totals line up.
    #[serde(default)]
    pub max_total: Option<u64>,
    #[serde(default = "default_true")]
    pub show_fraction: bool,
    #[serde(default = "default_true")]
    pub show_percentage: bool,
    #[serde(default = "default_true")]
    pub show_duration: bool,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            max_total: None,
            show_fraction: true,
            show_percentage: true,
            show_duration: true,
        }
    }
}

fn default_width() -> usize {
    50
}

fn default_true() -> bool {
    true
}

/// Progress of one worker, updated from the lines it logs.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    rules: Arc<RuleSet>,
    options: BarOptions,
    total: Option<u64>,
    count: u64,
    alias: Option<String>,
    complete: bool,
    duration: Option<Duration>,
}

impl ProgressBar {
    pub fn new(rules: Arc<RuleSet>, options: BarOptions) -> Self {
        Self {
            rules,
            options,
            total: None,
            count: 0,
            alias: None,
            complete: false,
            duration: None,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn apply(&mut self, matched: RuleMatch) -> bool {
        let changed = match matched {
            RuleMatch::Total(total) => replace(&mut self.total, Some(total)),
            RuleMatch::Count(Some(count)) => replace(&mut self.count, count),
            RuleMatch::Count(None) => {
                self.count = self.count.saturating_add(1);
                true
            }
            RuleMatch::Alias(alias) => replace(&mut self.alias, Some(alias)),
        };

        if let Some(total) = self.total {
            if self.count >= total && !self.complete {
                debug!("progress reached its total of {total}");
                self.complete = true;
            }
        }

        changed
    }
}

/// Store `value` in `slot`, reporting whether it differed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl BarState for ProgressBar {
    fn match_line(&mut self, text: &str) -> bool {
        match self.rules.interpret(text) {
            Some(matched) => self.apply(matched),
            None => false,
        }
    }

    fn reset(&mut self) {
        self.total = None;
        self.count = 0;
        self.alias = None;
        self.complete = false;
        self.duration = None;
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration = duration;
    }

    fn render(&self) -> String {
        let view = View {
            alias: self.alias.as_deref(),
            total: self.total,
            count: self.count,
            complete: self.complete,
            duration: self.duration,
        };
        render_line(&view, &self.options)
    }
}
