//! Attribution and classification of incoming worker lines.
//!
//! A line either already carries the offset of the worker that produced it,
//! or names one with a leading `#<offset>-` marker. Once attributed, the text
//! is classified as a control token or as bar content.

use tracing::debug;
use worker_pool::{Message, Offset};

/// Resets the bar of the worker that sent it.
pub const RESET_TOKEN: &str = "reset-mppbar";
/// Marks every bar complete, whichever worker sent it.
pub const RESET_COMPLETE_TOKEN: &str = "reset-mppbar-complete";

/// What an attributed line asks the coordinator to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive<'a> {
    Reset,
    ResetComplete,
    Content(&'a str),
}

impl<'a> Directive<'a> {
    /// Classify a line. Control tokens match exactly and case-sensitively;
    /// anything else is content for the bar's own rules.
    pub fn parse(text: &'a str) -> Self {
        const ATTEMPTS: [fn(&str) -> Option<Directive<'_>>; 2] = [reset, reset_complete];
        ATTEMPTS
            .iter()
            .find_map(|attempt| attempt(text))
            .unwrap_or(Directive::Content(text))
    }
}

fn reset(text: &str) -> Option<Directive<'_>> {
    (text == RESET_TOKEN).then_some(Directive::Reset)
}

fn reset_complete(text: &str) -> Option<Directive<'_>> {
    (text == RESET_COMPLETE_TOKEN).then_some(Directive::ResetComplete)
}

/// Split `#<digits>-<rest>` into an offset and the rest of the line.
///
/// Only the first line of `text` is considered, and only a marker at its
/// very start. The rest is returned as is, even if it holds another marker.
pub fn parse_marker(text: &str) -> Option<(Offset, &str)> {
    let line = text.split('\n').next().unwrap_or_default();
    let tagged = line.strip_prefix('#')?;
    let digits_end = tagged
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tagged.len());
    if digits_end == 0 {
        return None;
    }
    let (digits, rest) = tagged.split_at(digits_end);
    let rest = rest.strip_prefix('-')?;
    let index = digits.parse::<usize>().ok()?;
    Some((Offset(index), rest))
}

/// Attribute a message to a worker.
///
/// Messages that already carry an offset pass through untouched. Others get
/// the offset named by their marker, or stay unattributed.
pub fn route(message: Message) -> Message {
    if message.offset.is_some() {
        return message;
    }
    match parse_marker(&message.text) {
        Some((offset, rest)) => Message::new(offset, rest),
        None => {
            debug!("unable to match offset in message {:?}", message.text);
            message
        }
    }
}
