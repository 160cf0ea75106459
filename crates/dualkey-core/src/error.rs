use thiserror::Error;

/// Why a hook gave up on an event. Always a logic defect, never transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("tap/hold slot {slot} in {state} cannot take a {transition} transition")]
    InvalidSlotTransition {
        slot: usize,
        state: &'static str,
        transition: &'static str,
    },
    #[error("queue engine hook called while {0}")]
    UnexpectedQueueState(&'static str),
}

/// Rejections from `start_queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Another recording is already armed with a different stop condition.
    #[error("a different recording request is already pending")]
    Conflict,
    #[error("cannot start a recording while a replay is in progress")]
    ReplayInProgress,
    #[error("cannot start a recording while recording")]
    Recording,
    #[error("timeout of {0} ms does not fit a 15-bit offset")]
    TimeoutTooLong(u16),
}

/// A fatal hook result surfaced by the cycle driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("{hook} aborted: {fault}")]
    Fatal { hook: &'static str, fault: Fault },
}

impl CycleError {
    pub fn fault(&self) -> Fault {
        match self {
            CycleError::Fatal { fault, .. } => *fault,
        }
    }
}
