// src/fetch/search.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

use super::get_text;
use crate::config::Config;

static RESULT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.result").expect("result selector should parse"));
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("title selector should parse"));
static SNIPPET_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("snippet selector should parse"));

/// One organic hit from the HTML search page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    /// Title and snippet as one line of prose.
    pub fn content(&self) -> String {
        match (self.title.is_empty(), self.snippet.is_empty()) {
            (false, false) => format!("{}: {}", self.title, self.snippet),
            (false, true) => self.title.clone(),
            _ => self.snippet.clone(),
        }
    }

    /// `{source, content}` record in the shape the normalizer consumes.
    pub fn to_record(&self) -> Value {
        json!({ "source": self.url, "content": self.content() })
    }
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unwrap `//duckduckgo.com/l/?uddg=<target>` redirect links.
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    match Url::parse(&absolute) {
        Ok(u) if u.path().starts_with("/l/") => u
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Parse up to `limit` hits out of a DuckDuckGo HTML results page.
pub fn parse_search_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_SEL)
        .filter_map(|block| {
            let link = block.select(&TITLE_SEL).next()?;
            let url = resolve_link(link.value().attr("href")?);
            let snippet = block
                .select(&SNIPPET_SEL)
                .next()
                .map(collapsed_text)
                .unwrap_or_default();
            Some(SearchHit {
                title: collapsed_text(link),
                url,
                snippet,
            })
        })
        .take(limit)
        .collect()
}

pub async fn try_search(client: &Client, cfg: &Config, query: &str) -> Result<Vec<SearchHit>> {
    let mut url = Url::parse(&cfg.search_url)
        .with_context(|| format!("parsing search URL {:?}", cfg.search_url))?;
    url.query_pairs_mut().append_pair("q", query);

    let html = get_text(client, cfg, &url)
        .await
        .with_context(|| format!("searching {:?}", query))?;
    let hits = parse_search_results(&html, cfg.max_results);
    info!(query, hits = hits.len(), "search complete");
    Ok(hits)
}

/// Search result as loosely-typed JSON:
/// `{"query", "results": [{source, content}, ...], "source": "direct_search"}`,
/// or `{"error": ...}` when the search fails.
pub async fn search_bond_info(client: &Client, cfg: &Config, query: &str) -> Value {
    match try_search(client, cfg, query).await {
        Ok(hits) => json!({
            "query": query,
            "results": hits.iter().map(SearchHit::to_record).collect::<Vec<_>>(),
            "source": "direct_search",
        }),
        Err(e) => {
            error!("Error searching bond info: {:#}", e);
            json!({ "error": format!("{:#}", e) })
        }
    }
}
