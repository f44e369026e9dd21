use thiserror::Error;

/// Explicit per-call pipeline state. Callers never observe anything but
/// `Done` or `Failed`; the intermediate states exist so the short-circuit
/// and degraded paths are auditable and testable in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Pending,
    Extracting,
    Normalizing,
    Matching,
    Ranked,
    Done,
    Failed,
}

impl ResolveState {
    /// Legal transition table. `Failed` is reachable from every non-`Done`
    /// state; `Pending -> Done` is the cache-hit short circuit;
    /// `Extracting -> Ranked` covers zero extracted spans and
    /// `Normalizing -> Ranked` covers every span failing normalization.
    pub fn can_transition(self, next: ResolveState) -> bool {
        use ResolveState::*;
        match (self, next) {
            (Pending, Extracting) | (Pending, Done) => true,
            (Extracting, Normalizing) | (Extracting, Ranked) => true,
            (Normalizing, Matching) | (Normalizing, Ranked) => true,
            (Matching, Ranked) => true,
            (Ranked, Done) => true,
            (from, Failed) => from != Done && from != Failed,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ResolveState::Done | ResolveState::Failed)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Illegal pipeline transition {from:?} -> {to:?}")]
pub struct StateError {
    pub from: ResolveState,
    pub to: ResolveState,
}

/// Tracks one call's progress through the pipeline states.
#[derive(Debug)]
pub struct StateTracker {
    state: ResolveState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        StateTracker {
            state: ResolveState::Pending,
        }
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    pub fn advance(&mut self, next: ResolveState) -> Result<(), StateError> {
        if !self.state.can_transition(next) {
            return Err(StateError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
