use regex::Regex;
use tracing::debug;

use crate::error::BarError;

pub const DEFAULT_TOTAL_RULE: &str = r"^processing total of (?P<value>\d+)$";
pub const DEFAULT_COUNT_RULE: &str = r"^processed item \d+$";
pub const DEFAULT_ALIAS_RULE: &str = r"^processor is (?P<value>.*)$";

/// Name of the capture group that carries a rule's value.
const VALUE_GROUP: &str = "value";

/// What a single line of worker output means to a progress bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleMatch {
    /// The number of items the worker is going to process.
    Total(u64),
    /// One more item processed, or an absolute count when the rule captures one.
    Count(Option<u64>),
    Alias(String),
}

/// Compiled matching rules, tried in the order total, count, alias.
#[derive(Clone, Debug)]
pub struct RuleSet {
    total: Option<Regex>,
    count: Option<Regex>,
    alias: Option<Regex>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(
            Some(DEFAULT_TOTAL_RULE),
            Some(DEFAULT_COUNT_RULE),
            Some(DEFAULT_ALIAS_RULE),
        )
        .expect("default rules are valid")
    }
}

impl RuleSet {
    /// Compile a rule set. A `None` rule never matches.
    pub fn new(
        total: Option<&str>,
        count: Option<&str>,
        alias: Option<&str>,
    ) -> Result<Self, BarError> {
        Ok(Self {
            total: compile("total", total)?,
            count: compile("count", count)?,
            alias: compile("alias", alias)?,
        })
    }

    /// Interpret a line. The first rule that yields a usable value wins.
    pub fn interpret(&self, line: &str) -> Option<RuleMatch> {
        if let Some(captures) = self.total.as_ref().and_then(|re| re.captures(line)) {
            match captures.name(VALUE_GROUP).map(|m| m.as_str().parse::<u64>()) {
                Some(Ok(total)) => return Some(RuleMatch::Total(total)),
                _ => debug!("total rule matched without a numeric value: {line}"),
            }
        }

        if let Some(captures) = self.count.as_ref().and_then(|re| re.captures(line)) {
            let value = captures
                .name(VALUE_GROUP)
                .and_then(|m| m.as_str().parse::<u64>().ok());
            return Some(RuleMatch::Count(value));
        }

        self.alias
            .as_ref()
            .and_then(|re| re.captures(line))
            .and_then(|captures| captures.name(VALUE_GROUP))
            .map(|m| RuleMatch::Alias(m.as_str().to_string()))
    }
}

fn compile(key: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, BarError> {
    pattern
        .map(|pattern| Regex::new(pattern).map_err(|source| BarError::InvalidRule { key, source }))
        .transpose()
}
