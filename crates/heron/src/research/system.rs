use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Provider;
use crate::systems::System;

use super::formatters::{format_crawl_results, format_extract_results, format_search_results};
use super::prompts::{research_preamble, FORMATTER_PROMPT, RESEARCH_INSTRUCTIONS};
use super::tavily::SearchProvider;

/// Name of the tool whose successful result is the preferred final answer.
pub const FORMAT_TOOL: &str = "format_research_response";

const MAX_SEARCH_RESULTS: u32 = 10;
const CRAWL_MAX_DEPTH: u32 = 2;
const CRAWL_LIMIT: u32 = 20;

/// The web research tools: search, extract, crawl, and response formatting.
///
/// Provider failures never leave this system as errors; they are folded into
/// the returned text so the model can read them and adjust course.
pub struct ResearchSystem {
    tools: Vec<Tool>,
    instructions: String,
    search: Arc<dyn SearchProvider>,
    provider: Arc<dyn Provider>,
}

impl ResearchSystem {
    pub fn new(search: Arc<dyn SearchProvider>, provider: Arc<dyn Provider>) -> Self {
        let search_tool = Tool::new(
            "web_search",
            "Perform a web search. Returns the search results as a string, with the \
             title, url, and content of each result ranked by relevance.",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to be sent for the web search."
                    },
                    "time_range": {
                        "type": "string",
                        "enum": ["d", "w", "m", "y"],
                        "description": "Limits results to content published within a specific timeframe: 'd' (day), 'w' (week), 'm' (month), 'y' (year)."
                    },
                    "include_domains": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "A list of domains to restrict search results to."
                    }
                }
            }),
        );

        let extract_tool = Tool::new(
            "web_extract",
            "Extract content from one or more web pages. Returns the full raw content \
             of each page, any images found (if requested), and information about any \
             URLs that failed to be processed.",
            json!({
                "type": "object",
                "required": ["urls"],
                "properties": {
                    "urls": {
                        "description": "A single URL string or a list of URLs to extract content from.",
                        "anyOf": [
                            {"type": "string"},
                            {"type": "array", "items": {"type": "string"}}
                        ]
                    },
                    "include_images": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to also extract image URLs from the pages."
                    },
                    "extract_depth": {
                        "type": "string",
                        "enum": ["basic", "advanced"],
                        "default": "basic",
                        "description": "The depth of extraction. 'basic' provides standard content extraction, 'advanced' provides more detailed extraction."
                    }
                }
            }),
        );

        let crawl_tool = Tool::new(
            "web_crawl",
            "Crawl a website starting from the given URL, following nested links. \
             Each result includes the URL and a snippet of the page content.",
            json!({
                "type": "object",
                "required": ["url"],
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL of the website to crawl."
                    },
                    "instructions": {
                        "type": "string",
                        "description": "Specific instructions to guide the crawler, such as focusing on certain types of content or avoiding others."
                    }
                }
            }),
        );

        let format_tool = Tool::new(
            FORMAT_TOOL,
            "Format research content into a well-structured, properly cited response \
             with clear structure and appropriate style for the intended audience.",
            json!({
                "type": "object",
                "required": ["research_content"],
                "properties": {
                    "research_content": {
                        "type": "string",
                        "description": "The raw research content to be formatted."
                    },
                    "format_style": {
                        "type": "string",
                        "description": "Desired format style (e.g. \"blog\", \"report\", \"executive summary\", \"bullet points\", \"direct answer\")."
                    },
                    "user_query": {
                        "type": "string",
                        "description": "Original user question to help determine the appropriate format."
                    }
                }
            }),
        );

        let instructions = format!("{}\n{}", research_preamble(), RESEARCH_INSTRUCTIONS);

        Self {
            tools: vec![search_tool, extract_tool, crawl_tool, format_tool],
            instructions,
            search,
            provider,
        }
    }

    /// Normalize a URL argument the model produced.
    ///
    /// Models occasionally pass a fragment of the tool-call JSON instead of
    /// the bare URL; unwrap the quoted value first. Anything without a scheme
    /// gets `https://` prepended.
    fn clean_url(url: &str) -> String {
        let mut url = url.trim().to_string();

        if url.starts_with('{') && url.contains("\"url\"") {
            let re = Regex::new(r#""url"\s*:\s*"([^"]+)""#).unwrap();
            if let Some(captures) = re.captures(&url) {
                url = captures[1].to_string();
            }
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            url = format!("https://{}", url);
        }

        url
    }

    async fn web_search(&self, params: Value) -> AgentResult<String> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::InvalidParameters("'query' is required".into()))?;
        let time_range = params.get("time_range").and_then(|v| v.as_str());
        let include_domains: Option<Vec<String>> = params.get("include_domains").map(|v| {
            match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect(),
                Value::String(domain) => vec![domain.clone()],
                _ => Vec::new(),
            }
        });

        match self
            .search
            .search(
                query,
                MAX_SEARCH_RESULTS,
                time_range,
                include_domains.as_deref(),
            )
            .await
        {
            Ok(response) => Ok(format_search_results(&response)),
            Err(e) => Ok(format!(
                "Error: {}\nQuery attempted: {}\nFailed to search the web.",
                e, query
            )),
        }
    }

    async fn web_extract(&self, params: Value) -> AgentResult<String> {
        let urls_param = params
            .get("urls")
            .ok_or_else(|| AgentError::InvalidParameters("'urls' is required".into()))?;

        // A single URL string and a list of URLs are both accepted.
        let raw_urls: Vec<String> = match urls_param {
            Value::String(url) => vec![url.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect(),
            _ => {
                return Err(AgentError::InvalidParameters(
                    "'urls' must be a string or a list of strings".into(),
                ))
            }
        };
        if raw_urls.is_empty() {
            return Err(AgentError::InvalidParameters(
                "'urls' must name at least one URL".into(),
            ));
        }

        let include_images = params
            .get("include_images")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let extract_depth = params
            .get("extract_depth")
            .and_then(|v| v.as_str())
            .unwrap_or("basic");

        let cleaned_urls: Vec<String> = raw_urls.iter().map(|url| Self::clean_url(url)).collect();

        match self
            .search
            .extract(&cleaned_urls, include_images, extract_depth)
            .await
        {
            Ok(response) => Ok(format_extract_results(&response)),
            Err(e) => Ok(format!(
                "Error: {}\nURL attempted: {}\nFailed to extract the pages.",
                e,
                raw_urls.join(", ")
            )),
        }
    }

    async fn web_crawl(&self, params: Value) -> AgentResult<String> {
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::InvalidParameters("'url' is required".into()))?;
        let instructions = params.get("instructions").and_then(|v| v.as_str());

        let url = Self::clean_url(url);

        match self
            .search
            .crawl(&url, CRAWL_MAX_DEPTH, CRAWL_LIMIT, instructions)
            .await
        {
            Ok(response) => Ok(format_crawl_results(&response.results)),
            Err(e) => Ok(format!(
                "Error: {}\nURL attempted: {}\nFailed to crawl the website.",
                e, url
            )),
        }
    }

    async fn format_response(&self, params: Value) -> AgentResult<String> {
        let research_content = params
            .get("research_content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentError::InvalidParameters("'research_content' is required".into())
            })?;
        let format_style = params.get("format_style").and_then(|v| v.as_str());
        let user_query = params.get("user_query").and_then(|v| v.as_str());

        let mut format_input = format!("Research Content:\n{}\n\n", research_content);
        if let Some(style) = format_style {
            format_input.push_str(&format!("Requested Format Style: {}\n\n", style));
        }
        if let Some(query) = user_query {
            format_input.push_str(&format!("Original User Query: {}\n\n", query));
        }
        format_input.push_str(
            "Please format this research content according to the guidelines and appropriate style.",
        );

        let messages = vec![Message::user().with_text(format_input)];
        match self.provider.complete(FORMATTER_PROMPT, &messages, &[]).await {
            Ok((response, _usage)) => Ok(response.text()),
            Err(e) => Ok(format!("Error in research formatting: {}", e)),
        }
    }
}

#[async_trait]
impl System for ResearchSystem {
    fn name(&self) -> &str {
        "research"
    }

    fn description(&self) -> &str {
        "Web research tools: search, extract, crawl, and response formatting"
    }

    fn instructions(&self) -> &str {
        &self.instructions
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "web_search" => self.web_search(tool_call.arguments).await,
            "web_extract" => self.web_extract(tool_call.arguments).await,
            "web_crawl" => self.web_crawl(tool_call.arguments).await,
            FORMAT_TOOL => self.format_response(tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
