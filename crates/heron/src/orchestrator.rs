//! The research session loop: validates a request, drives the agent's event
//! stream, tracks distinct tool usage, and resolves the final answer from the
//! conversation history once the stream completes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::agent::{Agent, AgentEvent, ReplyOutcome};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::providers::base::Provider;
use crate::research::system::{ResearchSystem, FORMAT_TOOL};
use crate::research::tavily::SearchProvider;

/// A single research request. Immutable once constructed.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    "default".to_string()
}

impl ResearchRequest {
    pub fn new<Q: Into<String>>(query: Q) -> Self {
        Self {
            query: query.into(),
            session_id: default_session_id(),
        }
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Build a request from a loosely-shaped payload: either an object with a
    /// `query` field (optionally a `session_id`) or a bare string. Anything
    /// else yields an empty query, which the loop rejects with an error
    /// notice.
    pub fn from_value(payload: &Value) -> Self {
        match payload {
            Value::String(query) => Self::new(query.clone()),
            Value::Object(map) => Self {
                query: map
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                session_id: map
                    .get("session_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("default")
                    .to_string(),
            },
            _ => Self::new(String::new()),
        }
    }
}

/// Category tag attached to tool-execution notices, derived from the tool
/// name by substring match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Crawl,
    Search,
    Format,
    Extract,
    Other,
}

impl ToolCategory {
    pub fn classify(name: &str) -> Self {
        if name.contains("crawl") {
            ToolCategory::Crawl
        } else if name.contains("search") {
            ToolCategory::Search
        } else if name.contains("format") {
            ToolCategory::Format
        } else if name.contains("extract") {
            ToolCategory::Extract
        } else {
            ToolCategory::Other
        }
    }
}

/// Insertion-ordered record of the distinct tool names used in one session.
#[derive(Debug, Clone, Default)]
pub struct ToolLedger {
    names: Vec<String>,
}

impl ToolLedger {
    /// Record a tool use. Returns true only on the first occurrence of the
    /// name.
    pub fn record(&mut self, name: &str) -> bool {
        if self.names.iter().any(|n| n == name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }
}

/// Resolved outcome of one research session.
#[derive(Debug, Clone, Serialize)]
pub struct FinalAnswer {
    pub formatted_response: String,
    pub tools_used: Vec<String>,
    pub tool_count: usize,
    pub session_id: String,
}

/// Progress notice emitted while a research session runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Notice {
    Starting {
        message: String,
        session_id: String,
    },
    AgentCreated {
        message: String,
    },
    Thinking {
        content: String,
    },
    ToolExecution {
        tool: String,
        category: ToolCategory,
        message: String,
        tool_count: usize,
    },
    Completed {
        formatted_response: String,
        tools_used: Vec<String>,
        tool_count: usize,
        session_id: String,
        message: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        example: Option<Value>,
        message: String,
    },
}

fn error_notice(error: String) -> Notice {
    Notice::Error {
        error,
        example: None,
        message: "An error occurred during research".to_string(),
    }
}

/// Drives research sessions against a chat-completion provider and a search
/// provider. Holds no per-session state; each run owns its ledger and
/// history and discards them at session end.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    search: Arc<dyn SearchProvider>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, search: Arc<dyn SearchProvider>) -> Self {
        Self { provider, search }
    }

    /// Run one research session, yielding notices in order.
    ///
    /// An empty query terminates immediately with a single error notice.
    /// Otherwise the session announces itself, consumes the agent's event
    /// stream (recording each distinct tool once), exits early on the first
    /// terminal result, and closes with either a `completed` notice carrying
    /// the resolved answer or a terminal `error` notice.
    pub fn run(&self, request: ResearchRequest) -> BoxStream<'static, Notice> {
        let provider = Arc::clone(&self.provider);
        let search = Arc::clone(&self.search);

        Box::pin(async_stream::stream! {
            if request.query.trim().is_empty() {
                yield Notice::Error {
                    error: "missing or empty 'query' in request".to_string(),
                    example: Some(json!({"query": "What are the latest features in AWS Bedrock?"})),
                    message: "A research query is required".to_string(),
                };
                return;
            }

            info!(session_id = %request.session_id, "starting research: {}", request.query);
            yield Notice::Starting {
                message: format!("Starting research: {}", request.query),
                session_id: request.session_id.clone(),
            };

            let mut agent = Agent::new(Arc::clone(&provider));
            agent.add_system(Box::new(ResearchSystem::new(search, provider)));
            yield Notice::AgentCreated {
                message: "Research agent initialized with web tools".to_string(),
            };

            let conversation = vec![Message::user().with_text(request.query.clone())];
            let mut stream = match agent.reply(&conversation).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("failed to start the agent stream: {}", e);
                    yield error_notice(e.to_string());
                    return;
                }
            };

            let mut ledger = ToolLedger::default();
            let mut outcome: Option<Box<ReplyOutcome>> = None;

            loop {
                let event = match stream.next().await {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        error!("error during research: {}", e);
                        yield error_notice(e.to_string());
                        return;
                    }
                    None => break,
                };

                match event {
                    AgentEvent::TextDelta { content } => {
                        yield Notice::Thinking { content };
                    }
                    AgentEvent::ToolInvocation { name } => {
                        if ledger.record(&name) {
                            info!(tool = %name, count = ledger.count(), "tool invoked");
                            yield Notice::ToolExecution {
                                tool: name.clone(),
                                category: ToolCategory::classify(&name),
                                message: format!("Executing {}", name),
                                tool_count: ledger.count(),
                            };
                        }
                    }
                    AgentEvent::Result(reply) => {
                        // First terminal result ends consumption; do not wait
                        // for stream closure
                        outcome = Some(reply);
                        break;
                    }
                }
            }

            let Some(outcome) = outcome else {
                error!("agent stream ended without a result");
                yield error_notice("agent stream ended without a result".to_string());
                return;
            };

            let answer = resolve_answer(&outcome, &ledger, &request.session_id);
            info!(tool_count = answer.tool_count, "research completed");
            yield Notice::Completed {
                formatted_response: answer.formatted_response,
                tools_used: answer.tools_used,
                tool_count: answer.tool_count,
                session_id: answer.session_id,
                message: format!("Research completed with {} tool invocations", ledger.count()),
            };
        })
    }
}

/// Resolve the final answer from a completed session.
///
/// The preferred answer is the last successful result of the formatting tool,
/// located by correlating tool results back to their originating requests.
/// When no such result exists, the text of the last message in history is
/// used instead.
fn resolve_answer(outcome: &ReplyOutcome, ledger: &ToolLedger, session_id: &str) -> FinalAnswer {
    // Index every tool request by correlation id. Duplicate ids are resolved
    // deterministically: the first request seen keeps the id.
    let mut requests_by_id: HashMap<&str, &str> = HashMap::new();
    for message in &outcome.messages {
        if message.role != Role::Assistant {
            continue;
        }
        for content in &message.content {
            if let MessageContent::ToolRequest(request) = content {
                if let Ok(call) = &request.tool_call {
                    requests_by_id
                        .entry(request.id.as_str())
                        .or_insert(call.name.as_str());
                }
            }
        }
    }

    // Walk the history forward; the last successful formatting result wins.
    let mut formatted: Option<&str> = None;
    for message in &outcome.messages {
        if message.role != Role::User {
            continue;
        }
        for content in &message.content {
            if let MessageContent::ToolResponse(response) = content {
                if let Ok(text) = &response.tool_result {
                    if requests_by_id.get(response.id.as_str()).copied() == Some(FORMAT_TOOL) {
                        formatted = Some(text);
                    }
                }
            }
        }
    }

    let final_response = outcome
        .messages
        .last()
        .map(|message| message.text())
        .unwrap_or_default();

    FinalAnswer {
        formatted_response: formatted
            .filter(|text| !text.is_empty())
            .map(String::from)
            .unwrap_or(final_response),
        tools_used: ledger.names().to_vec(),
        tool_count: ledger.count(),
        session_id: session_id.to_string(),
    }
}
