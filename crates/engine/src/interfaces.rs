//! Collaborator interfaces consumed by the orchestrator.
//!
//! The engine owns none of these concerns: target configuration, URL
//! placeholder substitution, state persistence, metrics, incidents,
//! maintenance windows, and alert delivery all live behind these traits.
//! Implementations are supplied by the host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::CheckTarget;
use crate::types::{AlertPayload, MaintenanceWindow, MetricPoint, MonitoringState};

/// Supplies the ordered list of enabled targets for a tick.
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn enabled_targets(&self) -> anyhow::Result<Vec<CheckTarget>>;
}

/// Substitutes environment-specific placeholders in a target URL before
/// probing.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, raw_url: &str) -> anyhow::Result<String>;
}

/// Persists the monitoring state blob.
///
/// `load` should return an empty/default state on a missing key; the
/// orchestrator additionally degrades to an empty state if `load` fails
/// outright.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<MonitoringState>;
    async fn save(&self, key: &str, state: &MonitoringState) -> anyhow::Result<()>;
}

/// Fire-and-forget metrics sink; write failures are logged and swallowed.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write(&self, point: MetricPoint) -> anyhow::Result<()>;
}

/// Incident bookkeeping on the external config/incident store.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn open_incident(
        &self,
        target_id: &str,
        kind: &str,
        error: Option<&str>,
    ) -> anyhow::Result<()>;

    async fn resolve_open_incidents(&self, target_id: &str) -> anyhow::Result<()>;

    /// Drop incident/result history older than `before`.
    async fn prune_history(&self, before: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Looks up the active maintenance window for a target, if any.
#[async_trait]
pub trait MaintenanceLookup: Send + Sync {
    async fn active_window_for(
        &self,
        target_id: &str,
        group_id: Option<&str>,
    ) -> anyhow::Result<Option<MaintenanceWindow>>;
}

/// Delivers an alert payload to the external notification pipeline.
/// Failures are caught and logged by the orchestrator, never propagated.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn deliver(&self, payload: &AlertPayload) -> anyhow::Result<()>;
}
