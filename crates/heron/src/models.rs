//! The message model shared by the agent loop, the LLM providers, and the
//! tool systems.
//!
//! The same structures serve three exchanges: requests to the chat-completion
//! API, tool dispatch to the systems, and the conversation history the
//! orchestrator reads after a session completes. Provider wire formats are
//! converted to and from these structs at the provider boundary.
pub mod message;
pub mod role;
pub mod tool;
