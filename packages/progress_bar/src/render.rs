use std::fmt::Write as _;
use std::time::Duration;

use crate::bar::BarOptions;

const FILLED: char = '█';
const EMPTY: char = '·';
const DEFAULT_ALIAS: &str = "Processing";
const UNKNOWN_TOTAL: &str = "?";

/// The fields of a bar that end up on screen.
pub(crate) struct View<'a> {
    pub alias: Option<&'a str>,
    pub total: Option<u64>,
    pub count: u64,
    pub complete: bool,
    pub duration: Option<Duration>,
}

/// Render one bar as `alias |bar| pct% count/total duration`.
pub(crate) fn render_line(view: &View<'_>, options: &BarOptions) -> String {
    let mut out = String::with_capacity(options.width + 48);
    out.push_str(view.alias.unwrap_or(DEFAULT_ALIAS));

    let percentage = percentage(view.count, view.total);
    let filled = match view.total {
        Some(_) => options.width * percentage as usize / 100,
        None => 0,
    };

    out.push_str(" |");
    out.extend(std::iter::repeat_n(FILLED, filled));
    out.extend(std::iter::repeat_n(EMPTY, options.width - filled));
    out.push('|');

    if options.show_percentage {
        let _ = write!(out, " {percentage:>3}%");
    }

    if options.show_fraction {
        let digits = options.max_total.map(digit_width).unwrap_or(0);
        let _ = write!(out, " {:>digits$}/", view.count);
        match view.total {
            Some(total) => {
                let _ = write!(out, "{total:>digits$}");
            }
            None => {
                let _ = write!(out, "{UNKNOWN_TOTAL:>digits$}");
            }
        }
    }

    if options.show_duration && view.complete {
        if let Some(duration) = view.duration {
            out.push(' ');
            out.push_str(&format_duration(duration));
        }
    }

    out
}

/// Whole percentage of `count` over `total`, capped at 100. An empty total
/// counts as finished; an unknown one as not started.
fn percentage(count: u64, total: Option<u64>) -> u64 {
    match total {
        Some(0) => 100,
        Some(total) => (u128::from(count.min(total)) * 100 / u128::from(total)) as u64,
        None => 0,
    }
}

fn digit_width(value: u64) -> usize {
    value.checked_ilog10().map(|d| d as usize + 1).unwrap_or(1)
}

/// Short human form of an elapsed time: `4.2s`, `3m 7s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let whole = secs.round() as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    } else {
        format!("{secs:.1}s")
    }
}
