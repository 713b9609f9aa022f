//! Minimal page fetching: a plain GET per URL and tag stripping.
//!
//! There is no crawling and no deduplication. Each URL becomes exactly one
//! [`Document`] whose origin is the URL as given.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Node};
use tracing::info;
use webqa_rag::Document;

/// Elements whose content is never page text.
const SKIPPED_ELEMENTS: &[&str] =
    &["head", "script", "style", "noscript", "template", "svg", "iframe", "object"];

/// Elements that start a new paragraph.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Downloads pages over HTTP.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("webqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch `url` and return its text content.
    pub async fn fetch(&self, url: &str) -> Result<Document> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} returned {status}");
        }
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("html"));

        let body = response.text().await.with_context(|| format!("failed to read body of {url}"))?;
        let text = if is_html || looks_like_html(&body) { html_to_text(&body) } else { body };

        info!(url, chars = text.chars().count(), is_html, "fetched page");
        Ok(Document::new(url, text))
    }
}

/// Whether `text` appears to be an HTML document rather than plain text.
pub fn looks_like_html(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(512).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html") || head.contains("<body")
}

/// Reduce HTML to readable text.
///
/// Head, script and style content is skipped. Block elements become paragraph
/// breaks and `<br>` a line break, so the chunker's paragraph and line
/// boundaries survive. Character references are decoded by the parser.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    tidy_lines(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push_str("\n\n");
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
                if block {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of whitespace within lines and runs of blank lines into one paragraph break.
fn tidy_lines(text: &str) -> String {
    let mut out = String::new();
    let mut blank_run = false;
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        blank_run = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_scripts_and_styles() {
        let html = r#"<!DOCTYPE html><html><head><title>T</title>
            <style>body { color: red; }</style>
            <script type="text/javascript">alert("x < y");</script></head>
            <body><h1>Borrowing</h1><p>References <b>never</b> outlive their owner.</p>
            <!-- hidden --><p>Tom &amp; Jerry</p></body></html>"#;
        let text = html_to_text(html);

        assert!(text.contains("Borrowing"));
        assert!(text.contains("References never outlive their owner."));
        assert!(text.contains("Tom & Jerry"));
        assert!(!text.contains("color"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn block_tags_become_line_breaks() {
        let text = html_to_text("<div>one</div><div>two</div>");
        assert_eq!(text, "one\n\ntwo");
        let text = html_to_text("first<br>second");
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn decodes_character_references() {
        let text = html_to_text("<p>It&#8217;s &copy; 2024 &mdash; caf&eacute; &#x27;x&#x27;</p>");
        assert_eq!(text, "It\u{2019}s \u{a9} 2024 \u{2014} caf\u{e9} 'x'");
    }

    #[test]
    fn angle_brackets_in_attributes_do_not_leak() {
        let text = html_to_text(r#"<p><a title="a > b" href="/x">link</a> text</p>"#);
        assert_eq!(text, "link text");
    }

    #[test]
    fn collapses_inline_whitespace() {
        assert_eq!(html_to_text("<p>  a \t  b  </p>"), "a b");
    }

    #[test]
    fn detects_html_documents() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<HTML><BODY>x</BODY></HTML>"));
        assert!(!looks_like_html("Plain text about <generics> in Rust."));
    }
}
