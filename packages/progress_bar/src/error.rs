//! Errors raised while building progress bar rules.

#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("invalid {key} rule: {source}")]
    InvalidRule {
        key: &'static str,
        #[source]
        source: regex::Error,
    },
}
