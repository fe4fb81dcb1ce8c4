//! Alert state machine.
//!
//! Pure transition over per-target state: folds one probe result into the
//! prior state and decides whether a failure or recovery alert must fire.
//! The `Degraded` intermediate and the consecutive-failure threshold exist
//! to suppress alert spam on flapping targets.

use chrono::{DateTime, Utc};

use crate::types::{AlertKind, CheckResult, CheckState, CheckStatus};

/// Fold `result` into `prior` and return the replacement state plus the
/// alert to fire, if any.
///
/// On failure the counter increments and the new status is `Unhealthy` iff
/// the updated counter reaches `threshold`, else `Degraded`; a failure
/// alert fires only on the transition into `Unhealthy`. On success the
/// counter resets, the status becomes `Healthy`, and a recovery alert fires
/// only when the prior status was `Unhealthy`. `last_check` and
/// `response_time_ms` update unconditionally.
///
/// A `threshold` of 0 is treated as 1, so every failure alerts immediately
/// rather than never.
#[must_use]
pub fn transition(
    prior: &CheckState,
    result: &CheckResult,
    threshold: u32,
    now: DateTime<Utc>,
) -> (CheckState, Option<AlertKind>) {
    let threshold = threshold.max(1);

    let mut next = prior.clone();
    next.last_check = Some(now);
    next.response_time_ms = Some(result.elapsed_ms);

    if result.success {
        let alert = (prior.status == CheckStatus::Unhealthy).then_some(AlertKind::Recovery);
        next.status = CheckStatus::Healthy;
        next.consecutive_failures = 0;
        next.last_success = Some(now);
        next.last_error = None;
        return (next, alert);
    }

    next.consecutive_failures = prior.consecutive_failures.saturating_add(1);
    next.last_error = result.error.clone();

    if next.consecutive_failures >= threshold {
        next.status = CheckStatus::Unhealthy;
        // Alert once on the way down; stay silent while already unhealthy.
        let alert = (prior.status != CheckStatus::Unhealthy).then_some(AlertKind::Failure);
        (next, alert)
    } else {
        next.status = CheckStatus::Degraded;
        (next, None)
    }
}
