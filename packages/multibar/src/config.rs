use std::path::Path;
use std::time::Duration;

use progress_bar::{
    BarError, BarOptions, DEFAULT_ALIAS_RULE, DEFAULT_COUNT_RULE, DEFAULT_TOTAL_RULE, RuleSet,
};
use serde::{Deserialize, Serialize};
use worker_pool::PoolConfig;

// =============================================================================
// Tunable config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [pool]
//                    timeout_ms = 500
//
//   env var:         MULTIBAR_POOL__TIMEOUT_MS=500   (double underscore = nesting)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub pool: PoolFileConfig,
    #[serde(default)]
    pub bar: BarOptions,
    #[serde(default)]
    pub rules: RulesFileConfig,
}

/// Worker pool tunables (lives under `[pool]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolFileConfig {
    /// Queue poll timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum concurrently running workers (unset = all at once)
    #[serde(default)]
    pub processes_to_start: Option<usize>,
    #[serde(default = "default_handle_interrupt")]
    pub handle_interrupt: bool,
}

impl Default for PoolFileConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            processes_to_start: None,
            handle_interrupt: default_handle_interrupt(),
        }
    }
}

/// Progress matching rules (lives under `[rules]` in config.toml).
/// An empty string disables a rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulesFileConfig {
    #[serde(default = "default_total_rule")]
    pub total: String,
    #[serde(default = "default_count_rule")]
    pub count: String,
    #[serde(default = "default_alias_rule")]
    pub alias: String,
}

impl Default for RulesFileConfig {
    fn default() -> Self {
        Self {
            total: default_total_rule(),
            count: default_count_rule(),
            alias: default_alias_rule(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    1000
}
fn default_handle_interrupt() -> bool {
    true
}
fn default_total_rule() -> String {
    DEFAULT_TOTAL_RULE.to_string()
}
fn default_count_rule() -> String {
    DEFAULT_COUNT_RULE.to_string()
}
fn default_alias_rule() -> String {
    DEFAULT_ALIAS_RULE.to_string()
}

impl FileConfig {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            timeout: Duration::from_millis(self.pool.timeout_ms),
            processes_to_start: self.pool.processes_to_start,
            handle_interrupt: self.pool.handle_interrupt,
        }
    }

    pub fn rule_set(&self) -> Result<RuleSet, BarError> {
        RuleSet::new(
            enabled(&self.rules.total),
            enabled(&self.rules.count),
            enabled(&self.rules.alias),
        )
    }
}

fn enabled(pattern: &str) -> Option<&str> {
    Some(pattern).filter(|p| !p.is_empty())
}

/// Build a figment that layers: defaults → config file → MULTIBAR_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `MULTIBAR_BAR__WIDTH=30`  →  `bar.width = 30`
pub fn load_config(config_file: Option<&Path>) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    let mut figment = Figment::from(Serialized::defaults(FileConfig::default()));
    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(Env::prefixed("MULTIBAR_").split("__"))
}
