//! One-shot readiness gate for background initialization.
//!
//! The solution manager runs its population walk exactly once, on a
//! background task. Queries that need a consistent cache await this gate;
//! the gate opens exactly once, whether the walk succeeded or failed, and
//! the outcome stays observable afterwards. Because waiting is just an
//! `await`, callers that cannot afford an unbounded wait wrap it in
//! [`tokio::time::timeout`]; the gate itself imposes none.

use tokio::sync::watch;

/// How background initialization ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The population walk completed.
    Succeeded,
    /// The walk failed; the cache holds whatever partial state resulted.
    Failed,
}

/// One-shot gate: closed until [`open`](InitGate::open) is called once,
/// then permanently open with that outcome.
#[derive(Debug)]
pub(crate) struct InitGate {
    state: watch::Sender<Option<InitOutcome>>,
}

impl InitGate {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    /// Opens the gate with `outcome`. Only the first call has any effect.
    pub(crate) fn open(&self, outcome: InitOutcome) {
        self.state.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(outcome);
                true
            } else {
                false
            }
        });
    }

    /// Waits until the gate is open and returns the recorded outcome.
    pub(crate) async fn wait(&self) -> InitOutcome {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(Option::is_some).await {
            Ok(value) => (*value).unwrap_or(InitOutcome::Failed),
            // The sender lives as long as the gate; a closed channel here
            // means the owner is tearing down mid-wait.
            Err(_) => InitOutcome::Failed,
        }
    }

    /// Non-blocking observation: `None` while initialization is still
    /// running.
    pub(crate) fn outcome(&self) -> Option<InitOutcome> {
        *self.state.borrow()
    }
}
