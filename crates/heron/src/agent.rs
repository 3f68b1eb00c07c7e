use std::sync::Arc;

use anyhow::Result;
use futures::stream::BoxStream;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Provider;
use crate::systems::System;

/// An event observed while the agent works through a request, in arrival
/// order. Consumers must not assume an invocation is followed immediately by
/// its result; results only appear in the history carried by [`AgentEvent::Result`].
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A chunk of assistant text.
    TextDelta { content: String },
    /// The assistant invoked a tool. Emitted once per invocation, including
    /// repeats of the same tool.
    ToolInvocation { name: String },
    /// Terminal event: the final assistant message and the full conversation
    /// history. The stream ends after this.
    Result(Box<ReplyOutcome>),
}

/// Everything a session leaves behind once the reply loop finishes.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub response: Message,
    pub messages: Vec<Message>,
}

/// Agent integrates a chat-completion provider with the systems it can drive
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Arc<dyn Provider>,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
        }
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Get all tools across all systems
    fn get_tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    /// Find the system that owns a tool
    fn get_system_for_tool(&self, name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|system| system.tools().iter().any(|tool| tool.name == name))
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the owning system
    async fn dispatch_tool_call(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<String> {
        let call = tool_call?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        system.call(call).await
    }

    /// Compose the system prompt from the instructions of every system
    fn get_system_prompt(&self) -> String {
        if self.systems.is_empty() {
            return "No systems loaded".to_string();
        }
        self.systems
            .iter()
            .map(|system| system.instructions())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Create a stream of events for the agent working through the given
    /// conversation: text and tool invocations as they happen, then a single
    /// terminal [`AgentEvent::Result`] carrying the accumulated history.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<AgentEvent>>> {
        let mut messages = messages.to_vec();
        let tools = self.get_tools();
        let system_prompt = self.get_system_prompt();

        Ok(Box::pin(async_stream::try_stream! {
            loop {
                let (response, _usage) = self.provider.complete(
                    &system_prompt,
                    &messages,
                    &tools,
                ).await?;

                for content in &response.content {
                    match content {
                        MessageContent::Text(text) => {
                            yield AgentEvent::TextDelta { content: text.text.clone() };
                        }
                        MessageContent::ToolRequest(request) => {
                            // A malformed call has no usable name; its error
                            // still reaches the model as a tool response below.
                            if let Ok(call) = &request.tool_call {
                                yield AgentEvent::ToolInvocation { name: call.name.clone() };
                            }
                        }
                        MessageContent::ToolResponse(_) => {}
                    }
                }

                // Ensure the events above reach the consumer before
                // potentially long-running tool executions start
                tokio::task::yield_now().await;

                let tool_requests: Vec<ToolRequest> = response.content
                    .iter()
                    .filter_map(|content| content.as_tool_request())
                    .cloned()
                    .collect();

                messages.push(response.clone());

                if tool_requests.is_empty() {
                    // No more tool calls, the conversation is complete
                    yield AgentEvent::Result(Box::new(ReplyOutcome {
                        response,
                        messages: messages.clone(),
                    }));
                    break;
                }

                // Dispatch all requested tools and wait until all are finished
                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                    .collect();
                let outputs = futures::future::join_all(futures).await;

                // Combine the outputs into one tool response message keyed by
                // the original request ids
                let mut message_tool_response = Message::user();
                for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                    message_tool_response = message_tool_response.with_tool_response(
                        request.id.clone(),
                        output,
                    );
                }

                messages.push(message_tool_response);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::json;

    // Mock system for testing
    struct MockSystem {
        tools: Vec<Tool>,
    }

    impl MockSystem {
        fn new() -> Self {
            Self {
                tools: vec![Tool::new(
                    "echo",
                    "Echoes back the input",
                    json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}),
                )],
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            "test"
        }

        fn description(&self) -> &str {
            "A mock system for testing"
        }

        fn instructions(&self) -> &str {
            "Mock system instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
            match tool_call.name.as_str() {
                "echo" => Ok(tool_call.arguments["message"]
                    .as_str()
                    .unwrap_or("")
                    .to_string()),
                _ => Err(AgentError::ToolNotFound(tool_call.name)),
            }
        }
    }

    async fn collect_events(agent: &Agent, messages: Vec<Message>) -> Vec<AgentEvent> {
        let mut stream = agent.reply(&messages).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = stream.try_next().await.unwrap() {
            events.push(event);
        }
        events
    }

    fn outcome(events: &[AgentEvent]) -> &ReplyOutcome {
        match events.last().unwrap() {
            AgentEvent::Result(outcome) => outcome,
            other => panic!("expected terminal result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_simple_response() {
        let response = Message::assistant().with_text("Hello!");
        let provider = MockProvider::new(vec![response.clone()]);
        let agent = Agent::new(Arc::new(provider));

        let events = collect_events(&agent, vec![Message::user().with_text("Hi")]).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            AgentEvent::TextDelta { content } if content == "Hello!"
        ));
        assert_eq!(outcome(&events).response, response);
        // History: the user turn plus the assistant response
        assert_eq!(outcome(&events).messages.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_call() {
        let mut agent = Agent::new(Arc::new(MockProvider::new(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new("echo", json!({"message": "test"}))),
            ),
            Message::assistant().with_text("Done!"),
        ])));
        agent.add_system(Box::new(MockSystem::new()));

        let events = collect_events(&agent, vec![Message::user().with_text("Echo test")]).await;

        assert!(matches!(
            &events[0],
            AgentEvent::ToolInvocation { name } if name == "echo"
        ));

        let outcome = outcome(&events);
        assert_eq!(outcome.response.text(), "Done!");
        // History: user, assistant request, tool response, final assistant
        assert_eq!(outcome.messages.len(), 4);
        let tool_response = outcome.messages[2].content[0].as_tool_response().unwrap();
        assert_eq!(tool_response.id, "1");
        assert_eq!(tool_response.tool_result, Ok("test".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_tool() {
        let mut agent = Agent::new(Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("not_a_tool", json!({})))),
            Message::assistant().with_text("Error occurred"),
        ])));
        agent.add_system(Box::new(MockSystem::new()));

        let events = collect_events(&agent, vec![Message::user().with_text("Invalid tool")]).await;

        // The invocation is still observed, and the failure lands in history
        assert!(matches!(
            &events[0],
            AgentEvent::ToolInvocation { name } if name == "not_a_tool"
        ));
        let outcome = outcome(&events);
        assert_eq!(outcome.response.text(), "Error occurred");
        let tool_response = outcome.messages[2].content[0].as_tool_response().unwrap();
        assert!(matches!(
            tool_response.tool_result,
            Err(AgentError::ToolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_multiple_tool_calls() {
        let mut agent = Agent::new(Arc::new(MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("1", Ok(ToolCall::new("echo", json!({"message": "first"}))))
                .with_tool_request("2", Ok(ToolCall::new("echo", json!({"message": "second"})))),
            Message::assistant().with_text("All done!"),
        ])));
        agent.add_system(Box::new(MockSystem::new()));

        let events = collect_events(&agent, vec![Message::user().with_text("Multiple")]).await;

        let invocations: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                AgentEvent::ToolInvocation { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(invocations, vec!["echo", "echo"]);

        let outcome = outcome(&events);
        let responses: Vec<_> = outcome.messages[2]
            .content
            .iter()
            .filter_map(|content| content.as_tool_response())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].tool_result, Ok("first".to_string()));
        assert_eq!(responses[1].tool_result, Ok("second".to_string()));
    }

    #[tokio::test]
    async fn test_system_prompt_composition() {
        let mut agent = Agent::new(Arc::new(MockProvider::new(vec![])));
        assert_eq!(agent.get_system_prompt(), "No systems loaded");

        agent.add_system(Box::new(MockSystem::new()));
        assert_eq!(agent.get_system_prompt(), "Mock system instructions");
    }
}
