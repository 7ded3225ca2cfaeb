//! Readable-text extraction for scraped pages.
//!
//! Finds the main content area with readability heuristics, strips page
//! chrome, converts to Markdown with `htmd`, and tidies the result so it can
//! be handed to a model.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use scriptcrew_shared::{Result, ScriptCrewError};

/// Elements never worth sending to a model.
const SKIP_TAGS: [&str; 8] = [
    "script", "style", "nav", "iframe", "noscript", "svg", "form", "button",
];

/// Readable text extracted from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// `<title>` or first H1, if any.
    pub title: Option<String>,
    /// Markdown body.
    pub body: String,
}

/// Extract the readable Markdown body of an HTML document.
pub fn extract(html: &str) -> Result<PageText> {
    let doc = Html::parse_document(html);
    let title = extract_title(&doc);
    let content_html = main_content_html(&doc);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let markdown = converter
        .convert(&content_html)
        .map_err(|e| ScriptCrewError::Network(format!("htmd conversion failed: {e}")))?;

    Ok(PageText {
        title,
        body: tidy(&markdown),
    })
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            format!("{}\n\n[... content truncated ...]", &text[..cut])
        }
    }
}

/// Readability heuristics: `<main>`, `<article>`, role=main, `.content`, then body.
fn main_content_html(doc: &Html) -> String {
    let selectors = ["main", "article", r#"[role="main"]"#, ".content", "body"];

    for sel_str in selectors {
        let sel = Selector::parse(sel_str).expect("valid selector");
        if let Some(el) = doc.select(&sel).next() {
            return strip_chrome(&el.inner_html());
        }
    }

    String::new()
}

fn extract_title(doc: &Html) -> Option<String> {
    ["title", "h1"].into_iter().find_map(|sel_str| {
        let sel = Selector::parse(sel_str).expect("valid selector");
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Strip common navigation/chrome elements from HTML content.
fn strip_chrome(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    let chrome_sel = Selector::parse(
        "nav, header, footer, aside, script, style, .sidebar, .nav, .cookie-banner, .advertisement",
    )
    .expect("valid selector");

    let mut result = html.to_string();
    for el in doc.select(&chrome_sel) {
        result = result.replace(&el.html(), "");
    }
    result
}

/// Trim line ends and collapse runs of blank lines.
fn tidy(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed = md
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    MULTI_BLANK_RE
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}
