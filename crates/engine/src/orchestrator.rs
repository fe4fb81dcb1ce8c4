//! Tick orchestration.
//!
//! Drives one full monitoring pass: load persisted state once, iterate
//! enabled targets sequentially, probe and judge each, fold results through
//! the alert state machine, apply maintenance-window suppression, dispatch
//! side effects best-effort, and persist the updated state in a single
//! write at the end of the tick.
//!
//! The sequential loop is deliberate: one read-modify-write pass over the
//! shared state with no interleaving, and deterministic ordering of
//! incident/alert side effects relative to state mutation.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::EngineError;
use crate::interfaces::{
    AlertDispatcher, IncidentStore, MaintenanceLookup, MetricsSink, StateStore, TargetSource,
    UrlResolver,
};
use crate::probe::Prober;
use crate::transition::transition;
use crate::types::{AlertKind, AlertPayload, CheckResult, MetricPoint, MonitoringState};

/// Incident kind recorded when a target goes down.
const INCIDENT_KIND_DOWNTIME: &str = "downtime";

/// The collaborator set a [`Monitor`] runs against.
pub struct Collaborators {
    pub targets: Arc<dyn TargetSource>,
    pub resolver: Arc<dyn UrlResolver>,
    pub store: Arc<dyn StateStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub incidents: Arc<dyn IncidentStore>,
    pub maintenance: Arc<dyn MaintenanceLookup>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
}

/// Summary of one tick, returned to the invoking scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// When the tick finished.
    pub tick_time: DateTime<Utc>,
    /// Targets probed this tick.
    pub targets_checked: u32,
    /// Targets skipped by a maintenance window.
    pub targets_skipped: u32,
    /// Alerts handed to the dispatcher.
    pub alerts_fired: u32,
    /// Alerts produced but suppressed by a maintenance window.
    pub alerts_suppressed: u32,
    /// Wall-clock tick duration.
    pub duration_ms: u64,
}

/// The tick driver.
///
/// `run_tick` assumes at-most-one-tick-in-flight per state key: the host
/// scheduler must not invoke it concurrently against the same state store
/// key, otherwise the last writer wins on the persisted blob.
pub struct Monitor {
    config: MonitorConfig,
    prober: Prober,
    collaborators: Collaborators,
}

impl Monitor {
    #[must_use]
    pub fn new(config: MonitorConfig, collaborators: Collaborators) -> Self {
        let prober = Prober::new(config.user_agent.clone());
        Self {
            config,
            prober,
            collaborators,
        }
    }

    /// Run one full pass over all enabled targets.
    ///
    /// Per-target failures never abort the loop; they are captured as
    /// failed check results. A state-load failure degrades to an empty
    /// state. The only fatal conditions are an unreadable target source
    /// and the end-of-tick state write.
    pub async fn run_tick(&self) -> Result<TickReport, EngineError> {
        let started = Instant::now();

        let targets = self
            .collaborators
            .targets
            .enabled_targets()
            .await
            .map_err(|source| EngineError::TargetSource { source })?;

        let mut state = match self.collaborators.store.load(&self.config.state_key).await {
            Ok(state) => state,
            Err(e) => {
                // Resets all targets to unknown; accepted tradeoff over
                // failing the tick.
                warn!(error = %e, "state load failed, starting from empty state");
                MonitoringState::default()
            }
        };

        let mut report = TickReport {
            tick_time: Utc::now(),
            targets_checked: 0,
            targets_skipped: 0,
            alerts_fired: 0,
            alerts_suppressed: 0,
            duration_ms: 0,
        };

        for target in &targets {
            // The source supplies enabled targets; filter defensively.
            if !target.enabled {
                continue;
            }

            let window = match self
                .collaborators
                .maintenance
                .active_window_for(&target.id, target.group_id.as_deref())
                .await
            {
                Ok(window) => window,
                Err(e) => {
                    warn!(target_id = %target.id, error = %e, "maintenance lookup failed");
                    None
                }
            };

            if window.is_some_and(|w| w.skip_checks) {
                debug!(target_id = %target.id, "in maintenance window, skipping check");
                report.targets_skipped += 1;
                continue;
            }

            let result = match self.collaborators.resolver.resolve(&target.url).await {
                Ok(url) => self.prober.run(target, &url).await,
                // A broken placeholder counts toward the threshold like any
                // other failure instead of hiding the misconfiguration.
                Err(e) => CheckResult {
                    target_id: target.id.clone(),
                    success: false,
                    status_code: None,
                    elapsed_ms: 0,
                    error: Some(format!("URL resolution failed: {e}")),
                },
            };

            let prior = state.state_for(&target.id);
            let now = Utc::now();
            let (next, alert) = transition(&prior, &result, target.failure_threshold, now);

            if result.success {
                info!(
                    target_id = %target.id,
                    status = next.status.as_str(),
                    elapsed_ms = result.elapsed_ms,
                    "check passed"
                );
            } else {
                warn!(
                    target_id = %target.id,
                    status = next.status.as_str(),
                    consecutive_failures = next.consecutive_failures,
                    error = result.error.as_deref().unwrap_or(""),
                    "check failed"
                );
            }

            let point = MetricPoint {
                target_id: target.id.clone(),
                name: target.name.clone(),
                health: next.status,
                error: result.error.clone(),
                elapsed_ms: result.elapsed_ms,
                status_code: result.status_code,
            };
            if let Err(e) = self.collaborators.metrics.write(point).await {
                warn!(target_id = %target.id, error = %e, "metrics write failed");
            }

            // Replacement, never in-place mutation.
            state.checks.insert(target.id.clone(), next.clone());
            report.targets_checked += 1;

            let Some(kind) = alert else {
                continue;
            };

            match kind {
                AlertKind::Failure => {
                    if let Err(e) = self
                        .collaborators
                        .incidents
                        .open_incident(&target.id, INCIDENT_KIND_DOWNTIME, result.error.as_deref())
                        .await
                    {
                        warn!(target_id = %target.id, error = %e, "failed to open incident");
                    }
                }
                AlertKind::Recovery => {
                    if let Err(e) = self
                        .collaborators
                        .incidents
                        .resolve_open_incidents(&target.id)
                        .await
                    {
                        warn!(target_id = %target.id, error = %e, "failed to resolve incidents");
                    }
                }
            }

            if window.is_some_and(|w| w.suppress_alerts) {
                info!(
                    target_id = %target.id,
                    kind = kind.as_str(),
                    "alert suppressed by maintenance window"
                );
                report.alerts_suppressed += 1;
                continue;
            }

            let payload = AlertPayload {
                kind,
                target: target.clone(),
                state: next,
                result,
                timestamp: now,
            };
            report.alerts_fired += 1;
            if let Err(e) = self.collaborators.dispatcher.deliver(&payload).await {
                warn!(
                    target_id = %target.id,
                    kind = kind.as_str(),
                    error = %e,
                    "alert dispatch failed"
                );
            }
        }

        state.last_run = Some(Utc::now());
        self.collaborators
            .store
            .save(&self.config.state_key, &state)
            .await
            .map_err(|source| EngineError::StatePersist { source })?;

        let cutoff = Utc::now() - Duration::days(i64::from(self.config.history_retention_days));
        if let Err(e) = self.collaborators.incidents.prune_history(cutoff).await {
            warn!(error = %e, "history prune failed");
        }

        report.tick_time = Utc::now();
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            checked = report.targets_checked,
            skipped = report.targets_skipped,
            alerts = report.alerts_fired,
            duration_ms = report.duration_ms,
            "tick complete"
        );

        Ok(report)
    }
}
