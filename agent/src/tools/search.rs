use crate::llm::Message;
use crate::tools::{FunctionalTool, ToolCall, ToolDefinition};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const TOOL_NAME: &str = "search_the_internet";

/// Web search backed by the Serper Google search API.
#[derive(Clone)]
pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    n_results: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

#[derive(Deserialize, JsonSchema)]
struct SearchArgs {
    /// Mandatory search query you want to use to search the internet
    search_query: String,
}

impl SerperSearch {
    pub fn new(api_key: String, n_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
            n_results,
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn n_results(&self) -> usize {
        self.n_results
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        debug!(query, n_results = self.n_results, "searching the web");

        let res = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: query,
                num: self.n_results,
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::SearchError {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let mut results = res.json::<SerperResponse>().await?.organic;
        results.truncate(self.n_results);
        Ok(results)
    }
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No search results found for '{}'", query);
    }

    results
        .iter()
        .map(|r| format!("Title: {}\nLink: {}\nSnippet: {}", r.title, r.link, r.snippet))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

#[async_trait]
impl FunctionalTool for SerperSearch {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<SearchArgs>(
            TOOL_NAME,
            "A tool that can be used to search the internet with a search_query. Returns the title, link and snippet of the top results.",
        )
    }

    async fn invoke_fn(&self, call: &ToolCall) -> Result<Message> {
        let args: SearchArgs = call.args()?;
        let results = self.search(&args.search_query).await?;

        Ok(Message::Tool {
            id: call.id.clone(),
            name: TOOL_NAME.to_string(),
            result: format_results(&args.search_query, &results),
        })
    }
}
