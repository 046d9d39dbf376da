// src/bin/reprocess.rs
//
// Re-run normalization and trend analysis over raw search results saved by
// the main binary. Usage: `reprocess [RAW_DIR] [--export]`.

use anyhow::{Context, Result};
use bondscraper::{output::load_from_json, BondDataProcessor, Config};
use glob::glob;
use std::{env, fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bondscraper=info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    let cfg = Config::load()?;
    let mut export = false;
    let mut raw_dir = cfg.raw_dir();
    for arg in env::args().skip(1) {
        if arg == "--export" {
            export = true;
        } else {
            raw_dir = PathBuf::from(arg);
        }
    }

    let pattern = format!("{}/*.json", raw_dir.display());
    let mut paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    paths.sort();

    if paths.is_empty() {
        warn!("no raw results under {}", raw_dir.display());
        return Ok(());
    }
    info!("{} raw results to reprocess", paths.len());
    if export {
        fs::create_dir_all(cfg.processed_dir())?;
    }

    let mut processor = BondDataProcessor::new();
    for path in &paths {
        let raw = load_from_json(path);
        let rows = processor.process_value(&raw).len();
        let analysis = processor.analyze_trends();

        println!("\n{} ({} rows)", path.display(), rows);
        println!("{}", serde_json::to_string_pretty(&analysis)?);

        if export && rows > 0 {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "bond_data".to_string());
            let out = cfg.processed_dir().join(format!("{}.parquet", stem));
            if processor.export_to_parquet(&out) {
                info!("wrote {}", out.display());
            }
        }
    }

    Ok(())
}
