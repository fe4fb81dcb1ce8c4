//! Engine error types.

use thiserror::Error;

/// Errors that can abort a tick.
///
/// Per-target transport and assertion failures are data (failed check
/// results), and side-effect failures are logged and swallowed; only the
/// conditions below surface to the invoker.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The target source could not be read; the tick has nothing to run.
    #[error("failed to load targets: {source}")]
    TargetSource {
        #[source]
        source: anyhow::Error,
    },

    /// The end-of-tick state write failed. Fatal: losing the write risks
    /// mis-counting consecutive failures on the next tick.
    #[error("failed to persist monitoring state: {source}")]
    StatePersist {
        #[source]
        source: anyhow::Error,
    },
}
