//! Results, persisted state, and alert payloads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CheckTarget;

/// Health of a single target, derived from consecutive probe results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Never checked, or state was reset.
    #[default]
    Unknown,
    /// Last probe passed.
    Healthy,
    /// Failing, but still below the consecutive-failure threshold.
    Degraded,
    /// Failing at or beyond the threshold; an alert has fired.
    Unhealthy,
}

impl CheckStatus {
    /// Stable label used for metrics and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Unknown => "unknown",
            CheckStatus::Healthy => "healthy",
            CheckStatus::Degraded => "degraded",
            CheckStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Normalized outcome of one probe (the last attempt, after retries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Target this result belongs to.
    pub target_id: String,
    /// True iff the request completed and every assertion passed.
    pub success: bool,
    /// Observed status code; absent on transport failure.
    pub status_code: Option<u16>,
    /// Wall-clock time of the attempt in milliseconds.
    pub elapsed_ms: u64,
    /// Joined assertion failure reasons, or the transport error message.
    pub error: Option<String>,
}

/// Per-target persisted state.
///
/// Every field is serde-defaulted so a legacy or partial persisted blob
/// normalizes to safe values instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckState {
    /// Current health.
    #[serde(default)]
    pub status: CheckStatus,
    /// Back-to-back failing probes observed so far.
    #[serde(default)]
    pub consecutive_failures: u32,
    /// When the target was last probed.
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    /// When the target last passed.
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
    /// Error from the most recent failing probe; cleared on success.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Elapsed time of the most recent probe.
    #[serde(default)]
    pub response_time_ms: Option<u64>,
}

/// The persisted blob: all per-target states plus the last tick timestamp.
///
/// The orchestrator holds exclusive read-modify-write access for the
/// duration of one tick; entries are created lazily the first time a target
/// is seen and removed only when the target itself is removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringState {
    /// Target id → state.
    #[serde(default)]
    pub checks: HashMap<String, CheckState>,
    /// When the last tick completed.
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl MonitoringState {
    /// State for a target, defaulting to an unknown/zeroed state the first
    /// time the target is seen.
    #[must_use]
    pub fn state_for(&self, target_id: &str) -> CheckState {
        self.checks.get(target_id).cloned().unwrap_or_default()
    }
}

/// Which way a state transition crossed the alerting boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// The target just reached the consecutive-failure threshold.
    Failure,
    /// The target just came back from unhealthy.
    Recovery,
}

impl AlertKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Failure => "failure",
            AlertKind::Recovery => "recovery",
        }
    }
}

/// Artifact handed to the external alert dispatcher; not retained.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    /// Failure or recovery.
    pub kind: AlertKind,
    /// The target that transitioned.
    pub target: CheckTarget,
    /// State after the transition.
    pub state: CheckState,
    /// The probe result that triggered the transition.
    pub result: CheckResult,
    /// When the transition was applied.
    pub timestamp: DateTime<Utc>,
}

/// Active maintenance window flags for a target, as reported by the
/// external maintenance lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Skip probe execution entirely (state untouched).
    pub skip_checks: bool,
    /// Probe and track state, but do not deliver alerts.
    pub suppress_alerts: bool,
}

/// One data point handed to the external metrics sink per checked target.
#[derive(Debug, Clone, Serialize)]
pub struct MetricPoint {
    pub target_id: String,
    pub name: String,
    /// Health label after the transition was applied.
    pub health: CheckStatus,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub status_code: Option<u16>,
}
