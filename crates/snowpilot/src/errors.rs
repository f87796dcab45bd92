use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving or running a tool call. These never escape
/// the dispatcher: they are rendered into a failed tool result for the model.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Faults raised by the ServiceNow adapter. HTTP error responses are not
/// faults: they come back as a failed `RemoteCallResult`.
#[derive(Error, Debug)]
pub enum SnowError {
    #[error("ServiceNow request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid ServiceNow instance '{0}'")]
    InvalidInstance(String),
}

pub type SnowResult<T> = Result<T, SnowError>;
