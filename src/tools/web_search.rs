//! DuckDuckGo web search with a fixed fallback chain.
//!
//! `search_with_fallback` tries, in order: the instant-answer API, the HTML
//! results page, then the API again with time words stripped from the query.
//! No backoff and no retries beyond that sequence.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::AppError;

/// Prefix the ReAct loop treats as a finished answer.
pub const FINAL_ANSWER_PREFIX: &str = "Final Answer: ";

pub const EMPTY_QUERY_MESSAGE: &str = "Final Answer: The search query is empty or invalid.";

pub const SEARCH_UNAVAILABLE_MESSAGE: &str = "Final Answer: Sorry, search is unavailable right now. \
     Please try again later or rephrase the query.";

/// Time words dropped when building the simplified query.
const TIME_WORDS: &[&str] = &["ล่าสุด", "วันนี้", "latest", "today"];

/// Results taken from the API when retrying with the simplified query.
const SIMPLIFIED_MAX_RESULTS: usize = 3;

const USER_AGENT: &str = concat!("ollama-agents/", env!("CARGO_PKG_VERSION"));

static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__a"[^>]*>(.*?)</a>.*?class="result__snippet"[^>]*>(.*?)</a>"#)
        .expect("result regex is valid")
});

// ── Backends ──────────────────────────────────────────────────────────────────

/// Where a query is sent.
#[derive(Debug, Clone)]
pub enum SearchBackend {
    /// `api.duckduckgo.com` instant answers (JSON).
    DuckDuckGoApi { url: String },
    /// `html.duckduckgo.com` result page, scraped for snippets.
    DuckDuckGoHtml { url: String },
    /// Fixed query → result table. Unknown queries return no results.
    Canned(HashMap<String, String>),
}

impl SearchBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SearchBackend::DuckDuckGoApi { .. } => "api",
            SearchBackend::DuckDuckGoHtml { .. } => "html",
            SearchBackend::Canned(_) => "canned",
        }
    }

    /// Run one query. An empty string means no results.
    pub async fn search(&self, client: &Client, query: &str, max_results: usize) -> Result<String, AppError> {
        match self {
            SearchBackend::DuckDuckGoApi { url } => search_api(client, url, query, max_results).await,
            SearchBackend::DuckDuckGoHtml { url } => search_html(client, url, query, max_results).await,
            SearchBackend::Canned(table) => Ok(table.get(query).cloned().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

fn collect_topics(topics: &[RelatedTopic], out: &mut Vec<String>, max: usize) {
    for t in topics {
        if out.len() >= max {
            return;
        }
        match t {
            RelatedTopic::Entry { text } if !text.trim().is_empty() => out.push(text.trim().to_string()),
            RelatedTopic::Entry { .. } => {}
            RelatedTopic::Group { topics } => collect_topics(topics, out, max),
        }
    }
}

/// Flatten an instant-answer document into at most `max_results` lines.
fn format_instant_answer(doc: &InstantAnswer, max_results: usize) -> String {
    let mut lines: Vec<String> = [&doc.answer, &doc.abstract_text, &doc.definition]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    lines.truncate(max_results);
    collect_topics(&doc.related_topics, &mut lines, max_results);
    lines.join("\n")
}

async fn search_api(client: &Client, url: &str, query: &str, max_results: usize) -> Result<String, AppError> {
    let url = Url::parse_with_params(
        url,
        &[("q", query), ("format", "json"), ("no_html", "1"), ("skip_disambig", "1")],
    )
    .map_err(|e| AppError::Tool(format!("search api: bad url: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Tool(format!("search api: request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(AppError::Tool(format!("search api: HTTP {}", response.status())));
    }
    let doc = response
        .json::<InstantAnswer>()
        .await
        .map_err(|e| AppError::Tool(format!("search api: bad response: {e}")))?;
    Ok(format_instant_answer(&doc, max_results))
}

/// One result fragment as Markdown text, entities decoded.
fn fragment_text(html: &str) -> Result<String, AppError> {
    htmd::convert(html)
        .map(|md| md.split_whitespace().collect::<Vec<_>>().join(" "))
        .map_err(|e| AppError::Tool(format!("search html: convert fragment: {e}")))
}

/// Pull `title: snippet` lines out of a DuckDuckGo HTML result page.
fn parse_html_results(html: &str, max_results: usize) -> Result<String, AppError> {
    let mut lines = Vec::new();
    for caps in RESULT_RE.captures_iter(html) {
        if lines.len() >= max_results {
            break;
        }
        let title = fragment_text(&caps[1])?;
        let snippet = fragment_text(&caps[2])?;
        if snippet.is_empty() {
            continue;
        }
        lines.push(if title.is_empty() { snippet } else { format!("{title}: {snippet}") });
    }
    Ok(lines.join("\n"))
}

async fn search_html(client: &Client, url: &str, query: &str, max_results: usize) -> Result<String, AppError> {
    let url = Url::parse_with_params(url, &[("q", query)])
        .map_err(|e| AppError::Tool(format!("search html: bad url: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Tool(format!("search html: request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(AppError::Tool(format!("search html: HTTP {}", response.status())));
    }
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Tool(format!("search html: read body: {e}")))?;
    parse_html_results(&body, max_results)
}

// ── Tool ──────────────────────────────────────────────────────────────────────

/// Web search over a primary (API) and secondary (HTML) backend.
#[derive(Debug, Clone)]
pub struct SearchTool {
    client: Client,
    api: SearchBackend,
    html: SearchBackend,
    api_max_results: usize,
    html_max_results: usize,
    min_result_chars: usize,
}

impl SearchTool {
    pub fn new(api: SearchBackend, html: SearchBackend, config: &SearchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Tool(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api,
            html,
            api_max_results: config.api_max_results,
            html_max_results: config.html_max_results,
            min_result_chars: config.min_result_chars,
        })
    }

    /// DuckDuckGo API + HTML backends at the configured URLs.
    pub fn from_config(config: &SearchConfig) -> Result<Self, AppError> {
        Self::new(
            SearchBackend::DuckDuckGoApi { url: config.api_url.clone() },
            SearchBackend::DuckDuckGoHtml { url: config.html_url.clone() },
            config,
        )
    }

    fn acceptable(&self, result: &str) -> bool {
        result.trim().chars().count() > self.min_result_chars
    }

    async fn attempt(&self, backend: &SearchBackend, query: &str, max_results: usize) -> Option<String> {
        info!(backend = backend.name(), query, "searching");
        match backend.search(&self.client, query, max_results).await {
            Ok(result) if self.acceptable(&result) => Some(result),
            Ok(_) => {
                debug!(backend = backend.name(), "search returned too little text");
                None
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "search backend failed");
                None
            }
        }
    }

    /// Raw search through the fallback chain. `None` when every step missed.
    pub async fn search(&self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(r) = self.attempt(&self.api, query, self.api_max_results).await {
            return Some(r);
        }
        if let Some(r) = self.attempt(&self.html, query, self.html_max_results).await {
            return Some(r);
        }
        let simplified = simplify_query(query);
        if !simplified.is_empty() && simplified != query {
            info!(simplified = %simplified, "retrying with simplified query");
            return self.attempt(&self.api, &simplified, SIMPLIFIED_MAX_RESULTS).await;
        }
        None
    }

    /// Search and phrase the outcome as a finished ReAct answer.
    pub async fn search_with_fallback(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return EMPTY_QUERY_MESSAGE.to_string();
        }
        match self.search(query).await {
            Some(result) => format!("{FINAL_ANSWER_PREFIX}{result}"),
            None => SEARCH_UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Drop time words and collapse the remaining whitespace. A query without
/// time words comes back trimmed but otherwise unchanged.
pub fn simplify_query(query: &str) -> String {
    let query = query.trim();
    if !TIME_WORDS.iter().any(|w| query.contains(w)) {
        return query.to_string();
    }
    let mut q = query.to_string();
    for w in TIME_WORDS {
        q = q.replace(w, " ");
    }
    q.split_whitespace().collect::<Vec<_>>().join(" ")
}
