//! Tools the ReAct loop can call.
//!
//! `Tool` is an enum over the concrete tools, dispatched like `LlmProvider`.
//! A tool never ends the run by failing: errors come back as observation text.

pub mod exchange_rate;
pub mod web_search;

use crate::error::AppError;
use web_search::SearchTool;

#[derive(Debug, Clone)]
pub enum Tool {
    /// Search whose observation is already phrased as `Final Answer: ...`.
    WebSearch(SearchTool),
    /// Search returning raw result text, for gathering evidence.
    Search(SearchTool),
    ExchangeRate,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::WebSearch(_) => "web_search",
            Tool::Search(_) => "search",
            Tool::ExchangeRate => "exchange_rate",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Tool::ExchangeRate => exchange_rate::ALIASES,
            Tool::WebSearch(_) | Tool::Search(_) => &[],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::WebSearch(_) => {
                "Search the internet with DuckDuckGo for current information: latest news, \
                 current events, recent technology updates. Input is a clear, specific search \
                 query in Thai or English. The tool already returns 'Final Answer:' so do not \
                 add it yourself."
            }
            Tool::Search(_) => {
                "Search the internet to cross-check whether a claim is accurate. \
                 Input is a search query."
            }
            Tool::ExchangeRate => {
                "Look up the Thai baht to US dollar exchange rate. Also callable as \
                 'ตรวจสอบอัตราแลกเปลี่ยน', 'อัตราแลกเปลี่ยน' or 'ดูอัตราแลกเปลี่ยน'."
            }
        }
    }

    /// True when `name` is this tool's name or one of its aliases.
    /// Case and surrounding quotes/whitespace are ignored.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
        name.eq_ignore_ascii_case(self.name()) || self.aliases().iter().any(|a| *a == name)
    }

    pub async fn run(&self, input: &str) -> Result<String, AppError> {
        match self {
            Tool::WebSearch(s) => Ok(s.search_with_fallback(input).await),
            Tool::Search(s) => match s.search(input).await {
                Some(result) => Ok(result),
                None if input.trim().is_empty() => Err(AppError::Tool("empty search query".into())),
                None => Ok("No results found.".to_string()),
            },
            Tool::ExchangeRate => Ok(exchange_rate::get_exchange_rate(input)),
        }
    }
}

/// Find the tool answering to `name`.
pub fn find<'a>(tools: &'a [Tool], name: &str) -> Option<&'a Tool> {
    tools.iter().find(|t| t.answers_to(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_rate_answers_to_aliases() {
        let tools = [Tool::ExchangeRate];
        assert!(find(&tools, "exchange_rate").is_some());
        assert!(find(&tools, " `อัตราแลกเปลี่ยน` ").is_some());
        assert!(find(&tools, "EXCHANGE_RATE").is_some());
        assert!(find(&tools, "calculator").is_none());
    }

    #[tokio::test]
    async fn exchange_rate_runs() {
        let out = Tool::ExchangeRate.run("now?").await.unwrap();
        assert!(out.contains("36.50"));
    }
}
