//! Error types for parameter clients.

use std::time::Duration;

pub type Result<T> = std::result::Result<T, ParamError>;

/// Errors surfaced by the parameter clients.
///
/// Errors are `Clone` because a [`ParameterFuture`](crate::future::ParameterFuture)
/// hands the same outcome to every reader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// The client could not be set up (unresolved remote name, invoker creation failed).
    #[error("failed to construct parameter client: {0}")]
    Construction(String),

    /// The response list does not line up with the request list.
    #[error("{operation}: expected {expected} entries in response, got {actual}")]
    ShapeMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The request could not be written, or the transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response payload could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The remote service replied with an error instead of a response.
    #[error("remote service error: {0}")]
    Remote(String),

    /// The reactor gave up waiting before the call completed.
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    /// The reactor was shut down before the call completed.
    #[error("reactor shut down before the call completed")]
    Shutdown,

    /// The calling thread is already driving the reactor further up the stack.
    #[error("reactor is already being driven; blocking calls from reactor callbacks are not allowed")]
    ReentrantDrive,

    /// Another thread is driving the reactor.
    #[error("reactor is being driven by another thread")]
    ReactorBusy,
}

impl From<zenoh::Error> for ParamError {
    fn from(value: zenoh::Error) -> Self {
        ParamError::Transport(value.to_string())
    }
}
