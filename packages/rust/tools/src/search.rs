//! Web search over DuckDuckGo's HTML frontend.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use scriptcrew_shared::{Result, ScriptCrewError, SearchConfig, ToolKind};

use crate::Tool;
use crate::net::{MAX_REDIRECTS, build_client};

/// Reply when the provider returns nothing.
pub const NO_RESULTS: &str = "No results found for the search.";

/// One organic search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// Search tool backed by `html.duckduckgo.com`.
pub struct SearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl SearchTool {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs, Policy::limited(MAX_REDIRECTS))?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }

    /// Run a query and return up to `max_results` hits.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScriptCrewError::validation("search query is empty"));
        }

        let url = format!("{}/html/", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ScriptCrewError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScriptCrewError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScriptCrewError::Network(format!("{url}: failed to read body: {e}")))?;

        let hits = parse_results(&body, self.max_results);
        debug!(hits = hits.len(), "search complete");
        Ok(hits)
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchTool
    }

    fn description(&self) -> &str {
        "Search the internet with DuckDuckGo and return the top results. \
         Useful for finding information, news and recent data."
    }

    fn input_field(&self) -> &str {
        "query"
    }

    fn input_description(&self) -> &str {
        "The search query to send to DuckDuckGo."
    }

    async fn run(&self, input: &str) -> String {
        match self.search(input).await {
            Ok(hits) if hits.is_empty() => NO_RESULTS.to_string(),
            Ok(hits) => format_hits(&hits),
            Err(e) => {
                warn!(error = %e, "search tool failed");
                format!("An error occurred while using the search tool: {e}")
            }
        }
    }
}

/// Parse organic results out of the DuckDuckGo HTML page (ads skipped).
fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let result_sel = Selector::parse(".result").unwrap();
    let title_sel = Selector::parse(".result__a").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();

    doc.select(&result_sel)
        .filter(|el| {
            !el.value()
                .classes()
                .any(|c| c == "result--ad" || c == "result--no-result")
        })
        .filter_map(|el| {
            let link = el.select(&title_sel).next()?;
            let title = collapse_ws(&link.text().collect::<String>());
            let href = resolve_href(link.value().attr("href")?);
            let body = el
                .select(&snippet_sel)
                .next()
                .map(|s| collapse_ws(&s.text().collect::<String>()))
                .unwrap_or_default();
            (!title.is_empty()).then_some(SearchHit { title, href, body })
        })
        .take(limit)
        .collect()
}

/// Unwrap DuckDuckGo's `/l/?uddg=<target>` redirect links.
fn resolve_href(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let Ok(url) = Url::parse(&absolute) else {
        return href.to_string();
    };

    if url.path().starts_with("/l/") {
        if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
            return target.into_owned();
        }
    }

    absolute
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render hits as numbered text blocks for the agent.
fn format_hits(hits: &[SearchHit]) -> String {
    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "Result {}:\n  Title: {}\n  Link: {}\n  Snippet: {}\n-----------------",
                i + 1,
                or_na(&hit.title),
                or_na(&hit.href),
                or_na(&hit.body),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULTS_PAGE: &str = r#"<html><body>
<div class="result result--ad"><a class="result__a" href="https://ads.example">Ad</a></div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fia&amp;rut=abc">IA e <b>emprego</b></a></h2>
  <a class="result__snippet">O impacto da   IA no mercado.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="https://news.example/privacidade">Privacidade</a></h2>
</div>
<div class="result results_links web-result">
  <h2 class="result__title"><a class="result__a" href="https://third.example/">Third</a></h2>
  <a class="result__snippet">Third snippet</a>
</div>
</body></html>"#;

    fn config_for(server: &MockServer, max_results: usize) -> SearchConfig {
        SearchConfig {
            endpoint: server.uri(),
            max_results,
            timeout_secs: 5,
        }
    }

    #[test]
    fn parse_results_skips_ads_and_unwraps_redirects() {
        let hits = parse_results(RESULTS_PAGE, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "IA e emprego");
        assert_eq!(hits[0].href, "https://example.com/ia");
        assert_eq!(hits[0].body, "O impacto da IA no mercado.");
        assert_eq!(hits[1].body, "");
    }

    #[test]
    fn parse_results_respects_limit() {
        assert_eq!(parse_results(RESULTS_PAGE, 2).len(), 2);
    }

    #[test]
    fn format_hits_numbers_blocks() {
        let text = format_hits(&parse_results(RESULTS_PAGE, 2));
        assert!(text.starts_with("Result 1:\n  Title: IA e emprego\n  Link: https://example.com/ia"));
        assert!(text.contains("Result 2:"));
        assert!(text.contains("Snippet: N/A"));
        assert!(text.ends_with("-----------------"));
    }

    #[tokio::test]
    async fn run_returns_formatted_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "futuro do emprego"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .mount(&server)
            .await;

        let tool = SearchTool::new(&config_for(&server, 5)).unwrap();
        let out = tool.run("futuro do emprego").await;
        assert!(out.contains("Result 3:"));
        assert!(out.contains("https://third.example/"));
    }

    #[tokio::test]
    async fn run_reports_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let tool = SearchTool::new(&config_for(&server, 5)).unwrap();
        assert_eq!(tool.run("nada").await, NO_RESULTS);
    }

    #[tokio::test]
    async fn run_turns_failures_into_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tool = SearchTool::new(&config_for(&server, 5)).unwrap();
        let out = tool.run("qualquer").await;
        assert!(out.starts_with("An error occurred while using the search tool:"));
        assert!(out.contains("503"));

        let out = tool.run("   ").await;
        assert!(out.contains("empty"));
    }
}
