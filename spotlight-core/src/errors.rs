//! Shared error vocabulary for the spotlight workspace.
//!
//! Each crate that needs its own error detail defines its own `thiserror`
//! enum and converts into `SpotlightError` at its boundary, the same
//! layering this workspace uses elsewhere (subsystem errors folding into an
//! umbrella type rather than one flat enum for everything).

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum SpotlightError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("indexing error: {0}")]
    Indexing(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Sentinel for "the agent has nothing useful to say about this query".
///
/// Deliberately not a `SpotlightError` variant: per the error design, this
/// case is swallowed by callers without logging, matched by type rather
/// than by inspecting a message string.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrNoAgentAnswer;

impl fmt::Display for ErrNoAgentAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent has no answer for this query")
    }
}

impl std::error::Error for ErrNoAgentAnswer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_agent_answer_is_distinguishable_by_downcast() {
        let err: Box<dyn std::error::Error> = Box::new(ErrNoAgentAnswer);
        assert!(err.downcast_ref::<ErrNoAgentAnswer>().is_some());
    }
}
