//! Error taxonomy for the bridge.
//!
//! Boundary errors are never swallowed: whatever the engine reports
//! propagates to the caller of the session operation that triggered it.
//! The single exception is cleanup failure inside the reference
//! monitor, which runs asynchronously with no caller to report to and
//! is contained there.

use thiserror::Error;

use crate::types::TypeTag;

/// Result alias used across the bridge.
pub type EngineResult<T> = Result<T, EngineError>;

/// Everything that can go wrong talking to the foreign engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A type tag outside the engine's supported set was requested for
    /// allocation. Fatal to the call, not to the session.
    #[error("engine does not support allocating values of type {0}")]
    UnsupportedType(TypeTag),

    /// A handle could not be resolved to the requested wrapper shape.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The engine rejected the source text. The message is the
    /// engine's diagnostic, verbatim. Session state is not corrupted.
    #[error("compilation of '{script_name}' failed: {message}")]
    CompilationFailure { script_name: String, message: String },

    /// A runtime error raised inside the foreign engine, including an
    /// error raised by a host callback invoked from foreign code; in
    /// that case `source` carries the callback's original error.
    #[error("execution failed: {message}")]
    ExecutionFailure {
        message: String,
        #[source]
        source: Option<Box<EngineError>>,
    },

    /// The engine reported a representation mismatch for a typed
    /// accessor (for example a boolean read on a handle that is no
    /// longer boolean).
    #[error("type mismatch: expected {expected}, engine reports {actual}")]
    TypeMismatch { expected: TypeTag, actual: TypeTag },

    /// Operation attempted after the owning session was closed.
    #[error("session is closed")]
    ClosedSession,

    /// A host callback failed. Raised by the callback itself; the
    /// engine wraps it into an [`EngineError::ExecutionFailure`] before
    /// surfacing it to the script caller.
    #[error("host callback failed: {0}")]
    Callback(String),

    /// Host-side failure outside the engine (thread spawn, malformed
    /// timestamp, and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Builds the execution failure the engine surfaces when a host
    /// callback raised `cause` while foreign code was running.
    pub fn execution_from_callback(cause: EngineError) -> Self {
        EngineError::ExecutionFailure {
            message: format!("host callback raised: {cause}"),
            source: Some(Box::new(cause)),
        }
    }

    /// Plain execution failure with the engine's own message.
    pub fn execution(message: impl Into<String>) -> Self {
        EngineError::ExecutionFailure {
            message: message.into(),
            source: None,
        }
    }
}
