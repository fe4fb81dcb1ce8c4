//! Uptime check engine for the beacon platform.
//!
//! Periodically probes HTTP endpoints, evaluates pass/fail assertions
//! against each response, and drives a deduplicating state machine that
//! decides when a failure or recovery alert must fire. The engine owns the
//! check execution and alerting semantics only: configuration CRUD,
//! dashboards, storage schemas, scheduling, and notification channels live
//! behind the collaborator traits in [`interfaces`].
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use beacon_engine::{Collaborators, Monitor, MonitorConfig};
//! # async fn run(targets: Arc<dyn beacon_engine::interfaces::TargetSource>,
//! #     resolver: Arc<dyn beacon_engine::interfaces::UrlResolver>,
//! #     store: Arc<dyn beacon_engine::interfaces::StateStore>,
//! #     metrics: Arc<dyn beacon_engine::interfaces::MetricsSink>,
//! #     incidents: Arc<dyn beacon_engine::interfaces::IncidentStore>,
//! #     maintenance: Arc<dyn beacon_engine::interfaces::MaintenanceLookup>,
//! #     dispatcher: Arc<dyn beacon_engine::interfaces::AlertDispatcher>,
//! # ) -> anyhow::Result<()> {
//! let monitor = Monitor::new(
//!     MonitorConfig::default(),
//!     Collaborators {
//!         targets,
//!         resolver,
//!         store,
//!         metrics,
//!         incidents,
//!         maintenance,
//!         dispatcher,
//!     },
//! );
//!
//! // Invoked once per tick by an external scheduler.
//! let report = monitor.run_tick().await?;
//! println!("checked {} targets", report.targets_checked);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! Data flows leaf-first: the orchestrator resolves each target's URL,
//! the [`probe::Prober`] executes one attempt (with retries) and hands the
//! response to [`assertions::evaluate`], the resulting
//! [`types::CheckResult`] is folded through [`transition::transition`]
//! into the persisted per-target state, and side effects (metrics,
//! incidents, alert delivery) fan out best-effort from there. State is
//! loaded once at tick start and persisted once at tick end.

pub mod assertions;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod orchestrator;
pub mod probe;
pub mod transition;
pub mod types;

pub use config::{default_assertion, Assertion, AssertionOp, CheckTarget, MonitorConfig};
pub use error::EngineError;
pub use orchestrator::{Collaborators, Monitor, TickReport};
pub use probe::{Prober, MAX_BODY_CAPTURE_BYTES};
pub use transition::transition;
pub use types::{
    AlertKind, AlertPayload, CheckResult, CheckState, CheckStatus, MaintenanceWindow, MetricPoint,
    MonitoringState,
};
