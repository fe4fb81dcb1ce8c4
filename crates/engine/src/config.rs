//! Check target and engine configuration types.
//!
//! Targets are owned and versioned by an external config store; the engine
//! treats them as immutable for the duration of one tick. Serde defaults
//! keep partially-specified targets usable.

use serde::{Deserialize, Serialize};

/// Comparison operator carried by an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionOp {
    Is,
    IsNot,
    Contains,
    NotContains,
    Matches,
    LessThan,
}

/// A single pass/fail predicate evaluated against a probe response.
///
/// Each kind is a distinct variant with its own required fields, dispatched
/// via exhaustive matching, so adding a new kind is a compile-time-checked
/// extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Assertion {
    /// Compare the response status code.
    StatusCode { op: AssertionOp, expected: u16 },
    /// Compare a named response header. A missing header reads as the empty
    /// string for `is`/`is-not` and always fails `contains`/`not-contains`.
    Header {
        name: String,
        op: AssertionOp,
        expected: String,
    },
    /// Compare the response body (possibly truncated to the capture cap).
    Body { op: AssertionOp, expected: String },
    /// Fail when elapsed time reaches or exceeds `max_ms`.
    ResponseTime { max_ms: u64 },
}

impl Assertion {
    /// Whether evaluating this assertion requires the response body.
    #[must_use]
    pub fn needs_body(&self) -> bool {
        matches!(self, Assertion::Body { .. })
    }
}

/// The assertion substituted when a target configures none: `status-code is 200`.
///
/// The substitution is the caller's job; the evaluator itself never defaults.
#[must_use]
pub fn default_assertion() -> Assertion {
    Assertion::StatusCode {
        op: AssertionOp::Is,
        expected: 200,
    }
}

/// A single monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTarget {
    /// Unique, stable key for this target.
    pub id: String,
    /// Display name.
    pub name: String,
    /// URL to probe; may contain placeholders resolved by the external
    /// URL resolver before execution.
    pub url: String,
    /// HTTP method, e.g. "GET" or "POST".
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers; these win over engine defaults on conflict.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Optional request body, attached for methods other than GET/HEAD.
    #[serde(default)]
    pub body: Option<String>,
    /// Pass/fail predicates; empty means the default `status-code is 200`.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// Additional attempts after a failed probe.
    #[serde(default)]
    pub retry_count: u32,
    /// Fixed delay between attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Hard per-attempt timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Consecutive failures required before the target is considered down.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Disabled targets are never probed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional group used by the maintenance window lookup.
    #[serde(default)]
    pub group_id: Option<String>,
}

impl CheckTarget {
    /// The assertions to evaluate for this target, substituting the default
    /// `status-code is 200` when none are configured.
    #[must_use]
    pub fn effective_assertions(&self) -> Vec<Assertion> {
        if self.assertions.is_empty() {
            vec![default_assertion()]
        } else {
            self.assertions.clone()
        }
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_enabled() -> bool {
    true
}

/// Engine-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// User-Agent header sent with probes unless the target overrides it.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Key under which the monitoring state blob is persisted.
    #[serde(default = "default_state_key")]
    pub state_key: String,
    /// Incident/result history older than this is pruned after each tick.
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            state_key: default_state_key(),
            history_retention_days: default_history_retention_days(),
        }
    }
}

fn default_user_agent() -> String {
    format!("beacon-checker/{}", env!("CARGO_PKG_VERSION"))
}

fn default_state_key() -> String {
    "monitoring".to_string()
}

fn default_history_retention_days() -> u32 {
    30
}
