//! Applying a changed plugin configuration to a running node.
//!
//! The stored configuration has already been written by the time this runs;
//! this module only brings the live node in line with it. A failure here is
//! never fatal: the node picks up the stored configuration on its next start.
//!
//! ```text
//! Idle -> Dispatched -> Polling* -> Done | NodeDown | RemoteError
//!   \-> NodeDown (liveness probe failed, nothing sent)
//! ```

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::node::{NodeClient, NodeError};
use super::set::PluginSet;

/// Default wait between progress ticks while a call is in flight.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

/// Which remote operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyAction {
    Enable,
    Disable,
}

impl ApplyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable progress of a live apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    /// The remote call has been issued.
    Dispatched,
    /// The call is still running after `ticks` waits.
    Polling { ticks: u64 },
}

/// How a live apply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The node acknowledged the change.
    Done,
    /// The node was down, or went down mid-call. Changes apply at next start.
    NodeDown,
    /// The node rejected the change.
    RemoteError {
        action: ApplyAction,
        payload: String,
    },
}

/// Runs one enable or disable call against a node, reporting progress.
#[derive(Debug, Clone, Copy)]
pub struct LiveApply {
    tick: Duration,
}

impl Default for LiveApply {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

impl LiveApply {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }

    /// Apply `targets` to the node.
    ///
    /// There is no overall deadline: the call is waited on one tick at a time
    /// until the node answers or is lost. `observer` sees every transition.
    pub async fn run<N, F>(
        &self,
        node: &N,
        action: ApplyAction,
        targets: &PluginSet,
        mut observer: F,
    ) -> ApplyOutcome
    where
        N: NodeClient + ?Sized,
        F: FnMut(&ApplyState),
    {
        if targets.is_empty() {
            debug!(node = %node.name(), %action, "nothing to apply");
            return ApplyOutcome::Done;
        }

        if !node.is_alive().await {
            info!(node = %node.name(), %action, "node down, change deferred to next start");
            return ApplyOutcome::NodeDown;
        }

        let call = async {
            match action {
                ApplyAction::Enable => node.enable(targets).await,
                ApplyAction::Disable => node.disable(targets).await,
            }
        };
        tokio::pin!(call);

        debug!(node = %node.name(), %action, plugins = %targets, "dispatched");
        observer(&ApplyState::Dispatched);

        let mut ticks = 0u64;
        let result = loop {
            match tokio::time::timeout(self.tick, &mut call).await {
                Ok(result) => break result,
                Err(_elapsed) => {
                    ticks += 1;
                    observer(&ApplyState::Polling { ticks });
                }
            }
        };

        match result {
            Ok(()) => {
                info!(node = %node.name(), %action, plugins = %targets, ticks, "applied");
                ApplyOutcome::Done
            }
            Err(NodeError::Down) => {
                warn!(node = %node.name(), %action, "node went down during apply");
                ApplyOutcome::NodeDown
            }
            Err(NodeError::Remote { payload }) => {
                warn!(node = %node.name(), %action, %payload, "node rejected change");
                ApplyOutcome::RemoteError { action, payload }
            }
        }
    }
}
