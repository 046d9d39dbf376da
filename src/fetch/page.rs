// src/fetch/page.rs

use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Node};
use tracing::{debug, error};
use url::Url;

use super::get_text;
use crate::config::Config;

/// Visible text of an HTML document, whitespace-collapsed and cut to
/// `max_chars` characters. `script` and `style` contents are dropped.
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style"))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    // trim lines, break on double spaces, drop blanks
    let cleaned = raw
        .lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    cleaned.chars().take(max_chars).collect()
}

pub async fn try_scrape_website(client: &Client, cfg: &Config, url: &str) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("parsing URL {:?}", url))?;
    let html = get_text(client, cfg, &url).await?;
    let text = html_to_text(&html, cfg.max_page_chars);
    debug!(%url, chars = text.len(), "scraped page");
    Ok(text)
}

/// Page text for `url`, or `"Error scraping website: ..."` on failure.
pub async fn scrape_website(client: &Client, cfg: &Config, url: &str) -> String {
    match try_scrape_website(client, cfg, url).await {
        Ok(text) => text,
        Err(e) => {
            error!("Error scraping website {}: {:#}", url, e);
            format!("Error scraping website: {:#}", e)
        }
    }
}
