// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Names the YAML file to load before env overrides are applied.
pub const CONFIG_PATH_VAR: &str = "BONDSCRAPER_CONFIG";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Scraping and output settings. Every field has a default, so a YAML file
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    /// Scraped page text is cut to this many characters.
    pub max_page_chars: usize,
    /// Upper bound on search hits kept per query.
    pub max_results: usize,
    pub search_url: String,
    /// Fetch the first search hit's page and mine it for yields too.
    pub scrape_top_hit: bool,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1_000,
            max_page_chars: 4_000,
            max_results: 10,
            search_url: "https://html.duckduckgo.com/html/".to_string(),
            scrape_top_hit: true,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `BONDSCRAPER_CONFIG` (if set),
    /// then `BONDSCRAPER_*` env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `BONDSCRAPER_*` overrides from `lookup` (normally the process env).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BONDSCRAPER_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = lookup("BONDSCRAPER_TIMEOUT_SECS") {
            self.timeout_secs = v
                .parse()
                .with_context(|| format!("BONDSCRAPER_TIMEOUT_SECS={v:?}"))?;
        }
        if let Some(v) = lookup("BONDSCRAPER_MAX_RETRIES") {
            self.max_retries = v
                .parse()
                .with_context(|| format!("BONDSCRAPER_MAX_RETRIES={v:?}"))?;
        }
        if let Some(v) = lookup("BONDSCRAPER_SCRAPE_TOP_HIT") {
            self.scrape_top_hit = v
                .parse()
                .with_context(|| format!("BONDSCRAPER_SCRAPE_TOP_HIT={v:?}"))?;
        }
        if let Some(v) = lookup("BONDSCRAPER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.output_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.output_dir.join("processed")
    }
}
