// src/pipeline.rs

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::{
    config::Config,
    fetch::{page, search},
    output::save_to_json,
    process::{Analysis, BondDataProcessor},
};

/// Everything one query produced, plus where it was written.
#[derive(Debug)]
pub struct QueryOutcome {
    pub raw: Value,
    pub analysis: Analysis,
    pub rows: usize,
    pub raw_path: PathBuf,
    pub analysis_path: PathBuf,
    pub csv_path: Option<PathBuf>,
}

/// Text of every result element: bare strings as-is, records by `content`.
pub fn result_text(raw: &Value) -> String {
    let Some(Value::Array(items)) = raw.get("results") else {
        return String::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("content").and_then(Value::as_str),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `source` of the first result record that points at a web page.
pub fn top_hit_url(raw: &Value) -> Option<&str> {
    let Some(Value::Array(items)) = raw.get("results") else {
        return None;
    };
    items
        .iter()
        .filter_map(|item| item.get("source").and_then(Value::as_str))
        .find(|src| src.starts_with("http://") || src.starts_with("https://"))
}

/// Mine the result text, followed by `page_text`, for tenor yields. When any
/// are found and the raw result has no `yields` of its own, attach them.
/// Returns how many tenors were attached.
pub fn attach_extracted_yields(
    raw: &mut Value,
    processor: &BondDataProcessor,
    page_text: &str,
) -> usize {
    let mut text = result_text(raw);
    if !page_text.is_empty() {
        text.push('\n');
        text.push_str(page_text);
    }
    let yields = processor.extract_yield_data(&text);
    match raw {
        Value::Object(obj) if !yields.is_empty() && !obj.contains_key("yields") => {
            let n = yields.len();
            obj.insert(
                "yields".to_string(),
                Value::Object(
                    yields
                        .into_iter()
                        .map(|(tenor, v)| (tenor, Value::from(v)))
                        .collect(),
                ),
            );
            n
        }
        _ => 0,
    }
}

/// Search, persist the raw result, optionally scrape the top hit, normalize,
/// analyze, persist the analysis and export the table. `tag` distinguishes this query's output files.
pub async fn run_query(
    client: &Client,
    cfg: &Config,
    processor: &mut BondDataProcessor,
    query: &str,
    tag: &str,
) -> Result<QueryOutcome> {
    info!("Processing query: {}", query);

    let mut raw = search::search_bond_info(client, cfg, query).await;
    let raw_path = cfg.raw_dir().join(format!("bond_data_{tag}.json"));
    save_to_json(&raw, &raw_path)?;

    let page_text = match top_hit_url(&raw) {
        Some(url) if cfg.scrape_top_hit => page::scrape_website(client, cfg, url).await,
        _ => String::new(),
    };

    let attached = attach_extracted_yields(&mut raw, processor, &page_text);
    if attached > 0 {
        info!(attached, "extracted yields from search results");
    }

    let rows = processor.process_value(&raw).len();
    let analysis = processor.analyze_trends();

    let analysis_path = cfg
        .processed_dir()
        .join(format!("bond_analysis_{tag}.json"));
    save_to_json(&analysis, &analysis_path)?;

    let csv_path = if rows > 0 {
        let path = cfg.processed_dir().join(format!("bond_data_{tag}.csv"));
        processor.export_to_csv(&path).then_some(path)
    } else {
        None
    };

    Ok(QueryOutcome {
        raw,
        analysis,
        rows,
        raw_path,
        analysis_path,
        csv_path,
    })
}
