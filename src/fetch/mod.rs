// src/fetch/mod.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::config::Config;

pub mod page;
pub mod search;

pub use page::{html_to_text, scrape_website};
pub use search::{search_bond_info, SearchHit};

/// HTTP client carrying the configured User-Agent and timeout.
pub fn build_client(cfg: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .timeout(cfg.timeout())
        .cookie_store(true)
        .gzip(true)
        .build()
        .context("building HTTP client")
}

/// GET `url` and return the body, retrying transport errors and 5xx
/// responses up to `cfg.max_retries` attempts in total.
pub async fn get_text(client: &Client, cfg: &Config, url: &Url) -> Result<String> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        let retry = attempt < cfg.max_retries;

        match client.get(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => return Ok(body),
                Err(e) if retry => warn!(%url, attempt, "reading body failed: {}", e),
                Err(e) => return Err(e).with_context(|| format!("reading body from {}", url)),
            },
            Ok(resp) if resp.status().is_server_error() && retry => {
                warn!(%url, attempt, status = %resp.status(), "server error")
            }
            Ok(resp) => return Err(anyhow!("HTTP error: {} for {}", resp.status(), url)),
            Err(e) if retry => warn!(%url, attempt, "request failed: {}", e),
            Err(e) => return Err(e).with_context(|| format!("GET {}", url)),
        }

        sleep(cfg.retry_delay()).await;
    }
}
