use async_trait::async_trait;

use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolCall};

/// Core trait for a named collection of tools the agent can drive.
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Instructions folded into the agent's system prompt
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Execute a tool call, returning its text payload.
    ///
    /// Implementations return `Err` only for unknown tools or malformed
    /// parameters. Failures of the backing provider are reported as ordinary
    /// text so the model can read and react to them.
    async fn call(&self, tool_call: ToolCall) -> AgentResult<String>;
}
