//! Website scraping tool.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, header};
use tracing::{debug, instrument, warn};
use url::Url;

use scriptcrew_shared::{Result, ScrapeConfig, ScriptCrewError, ToolKind};

use crate::Tool;
use crate::content::{self, truncate_chars};
use crate::net::{MAX_REDIRECTS, build_client, is_ssrf_target, resolves_to_private};

/// Fetches a page and returns its readable text.
pub struct ScrapeTool {
    client: Client,
    max_chars: usize,
    /// Host exempt from the SSRF check (tests only).
    #[cfg(test)]
    trusted_host: Option<String>,
}

impl ScrapeTool {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        Ok(Self {
            // Redirects are followed in `scrape` so every hop is checked.
            client: build_client(config.timeout_secs, Policy::none())?,
            max_chars: config.max_chars,
            #[cfg(test)]
            trusted_host: None,
        })
    }

    /// Trust the literal `127.0.0.1` host that wiremock listens on.
    #[cfg(test)]
    fn allow_localhost(mut self) -> Self {
        self.trusted_host = Some("127.0.0.1".to_string());
        self
    }

    async fn check_target(&self, url: &Url) -> Result<()> {
        #[cfg(test)]
        if self.trusted_host.is_some() && self.trusted_host.as_deref() == url.host_str() {
            return Ok(());
        }
        if is_ssrf_target(url) || resolves_to_private(url).await? {
            return Err(ScriptCrewError::validation(format!(
                "refusing to fetch private or non-HTTP URL: {url}"
            )));
        }
        Ok(())
    }

    /// Fetch `raw_url` and return its title and readable body.
    #[instrument(skip(self))]
    pub async fn scrape(&self, raw_url: &str) -> Result<String> {
        let mut url = Url::parse(raw_url.trim())
            .map_err(|e| ScriptCrewError::validation(format!("invalid URL '{raw_url}': {e}")))?;

        let mut hops = 0;
        let response = loop {
            self.check_target(&url).await?;

            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| ScriptCrewError::Network(format!("{url}: {e}")))?;

            if !response.status().is_redirection() {
                break response;
            }
            if hops == MAX_REDIRECTS {
                return Err(ScriptCrewError::Network(format!("{url}: too many redirects")));
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    ScriptCrewError::Network(format!("{url}: redirect without a Location header"))
                })?;
            let next = url
                .join(location)
                .map_err(|e| ScriptCrewError::Network(format!("{url}: bad redirect target: {e}")))?;
            url = next;
            hops += 1;
            debug!(%url, hops, "following redirect");
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ScriptCrewError::Network(format!("{url}: HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScriptCrewError::Network(format!("{url}: failed to read body: {e}")))?;

        let page = content::extract(&html)?;
        debug!(chars = page.body.len(), "page extracted");

        let mut out = String::new();
        if let Some(title) = &page.title {
            out.push_str(&format!("Title: {title}\n"));
        }
        out.push_str(&format!("Source: {url}\n\n"));
        out.push_str(&truncate_chars(&page.body, self.max_chars));
        Ok(out)
    }
}

#[async_trait]
impl Tool for ScrapeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ScrapeTool
    }

    fn description(&self) -> &str {
        "Read the content of a website. Use it on links found by the search \
         tool to dig into a subject."
    }

    fn input_field(&self) -> &str {
        "website_url"
    }

    fn input_description(&self) -> &str {
        "Absolute http(s) URL of the page to read."
    }

    async fn run(&self, input: &str) -> String {
        match self.scrape(input).await {
            Ok(text) if text.trim().is_empty() => "The page had no readable content.".to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "scrape tool failed");
                format!("An error occurred while reading the website: {e}")
            }
        }
    }
}
