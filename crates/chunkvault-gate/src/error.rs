use crate::controller::GateClass;

/// Errors produced by admission control.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The gate is at capacity. The request was shed, not attempted.
    #[error("{class} gate exhausted: {limit} requests already in flight")]
    Exhausted { class: GateClass, limit: usize },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
