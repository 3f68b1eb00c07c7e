use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the agent loop and the tool systems.
///
/// These are serializable because tool failures are recorded inside the
/// conversation history, where the model reads and reacts to them.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
