use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

pub const TAVILY_HOST: &str = "https://api.tavily.com";

/// A single ranked document in a search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub raw_content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailedExtract {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub results: Vec<ExtractResult>,
    #[serde(default)]
    pub failed_results: Vec<FailedExtract>,
    #[serde(default)]
    pub response_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub raw_content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResponse {
    #[serde(default)]
    pub results: Vec<CrawlResult>,
}

/// The web search/extract/crawl provider behind the research tools.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        time_range: Option<&str>,
        include_domains: Option<&[String]>,
    ) -> Result<SearchResponse>;

    async fn extract(
        &self,
        urls: &[String],
        include_images: bool,
        extract_depth: &str,
    ) -> Result<ExtractResponse>;

    async fn crawl(
        &self,
        url: &str,
        max_depth: u32,
        limit: u32,
        instructions: Option<&str>,
    ) -> Result<CrawlResponse>;
}

#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub host: String,
    pub api_key: String,
}

/// HTTP client for the Tavily search API.
///
/// The credential is an explicit constructor input rather than ambient
/// process state, so tests can point the client at a fake server.
pub struct TavilyClient {
    client: Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, payload: Value) -> Result<T> {
        let url = format!("{}/{}", self.config.host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => Err(anyhow!("Request failed: {}", response.status())),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        time_range: Option<&str>,
        include_domains: Option<&[String]>,
    ) -> Result<SearchResponse> {
        let mut payload = json!({
            "query": query,
            "max_results": max_results,
        });
        if let Some(range) = time_range {
            payload
                .as_object_mut()
                .unwrap()
                .insert("time_range".to_string(), json!(range));
        }
        if let Some(domains) = include_domains {
            payload
                .as_object_mut()
                .unwrap()
                .insert("include_domains".to_string(), json!(domains));
        }

        self.post("search", payload).await
    }

    async fn extract(
        &self,
        urls: &[String],
        include_images: bool,
        extract_depth: &str,
    ) -> Result<ExtractResponse> {
        let payload = json!({
            "urls": urls,
            "include_images": include_images,
            "extract_depth": extract_depth,
        });

        self.post("extract", payload).await
    }

    async fn crawl(
        &self,
        url: &str,
        max_depth: u32,
        limit: u32,
        instructions: Option<&str>,
    ) -> Result<CrawlResponse> {
        let mut payload = json!({
            "url": url,
            "max_depth": max_depth,
            "limit": limit,
        });
        if let Some(instructions) = instructions {
            payload
                .as_object_mut()
                .unwrap()
                .insert("instructions".to_string(), json!(instructions));
        }

        self.post("crawl", payload).await
    }
}

#[cfg(test)]
pub mod stub {
    //! Canned search provider for tests: returns preset responses, records
    //! every call, and fails for any operation without a preset.
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::{CrawlResponse, ExtractResponse, SearchProvider, SearchResponse};

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedCall {
        Search {
            query: String,
            max_results: u32,
            time_range: Option<String>,
            include_domains: Option<Vec<String>>,
        },
        Extract {
            urls: Vec<String>,
            include_images: bool,
            extract_depth: String,
        },
        Crawl {
            url: String,
            max_depth: u32,
            limit: u32,
            instructions: Option<String>,
        },
    }

    #[derive(Default)]
    pub struct StubSearchProvider {
        search_response: Option<SearchResponse>,
        extract_response: Option<ExtractResponse>,
        crawl_response: Option<CrawlResponse>,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl StubSearchProvider {
        pub fn with_search(mut self, response: SearchResponse) -> Self {
            self.search_response = Some(response);
            self
        }

        pub fn with_extract(mut self, response: ExtractResponse) -> Self {
            self.extract_response = Some(response);
            self
        }

        pub fn with_crawl(mut self, response: CrawlResponse) -> Self {
            self.crawl_response = Some(response);
            self
        }

        /// Handle to the call log, kept alive after the stub moves into a
        /// system.
        pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearchProvider {
        async fn search(
            &self,
            query: &str,
            max_results: u32,
            time_range: Option<&str>,
            include_domains: Option<&[String]>,
        ) -> Result<SearchResponse> {
            self.calls.lock().unwrap().push(RecordedCall::Search {
                query: query.to_string(),
                max_results,
                time_range: time_range.map(String::from),
                include_domains: include_domains.map(|d| d.to_vec()),
            });
            self.search_response
                .clone()
                .ok_or_else(|| anyhow!("search backend offline"))
        }

        async fn extract(
            &self,
            urls: &[String],
            include_images: bool,
            extract_depth: &str,
        ) -> Result<ExtractResponse> {
            self.calls.lock().unwrap().push(RecordedCall::Extract {
                urls: urls.to_vec(),
                include_images,
                extract_depth: extract_depth.to_string(),
            });
            self.extract_response
                .clone()
                .ok_or_else(|| anyhow!("extract backend offline"))
        }

        async fn crawl(
            &self,
            url: &str,
            max_depth: u32,
            limit: u32,
            instructions: Option<&str>,
        ) -> Result<CrawlResponse> {
            self.calls.lock().unwrap().push(RecordedCall::Crawl {
                url: url.to_string(),
                max_depth,
                limit,
                instructions: instructions.map(String::from),
            });
            self.crawl_response
                .clone()
                .ok_or_else(|| anyhow!("crawl backend offline"))
        }
    }
}
