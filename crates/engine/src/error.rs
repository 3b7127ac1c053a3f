//! Engine error types.

use thiserror::Error;

/// Errors surfaced while evaluating a flow's step tree.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// An action step referenced an identifier no registered action answers to.
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// A registered action ran and failed.
    #[error("action '{identifier}' failed: {message}")]
    ActionFailed { identifier: String, message: String },

    /// A condition expression could not be evaluated.
    #[error("condition evaluation failed: {0}")]
    Condition(String),

    /// The engine was built without a condition evaluator but the flow
    /// contains condition steps.
    #[error("condition expressions are not supported by this engine")]
    ConditionsUnsupported,
}
