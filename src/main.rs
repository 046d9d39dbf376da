use anyhow::Result;
use bondscraper::{
    fetch::build_client,
    output::{get_timestamp, setup_output_directories},
    pipeline::run_query,
    BondDataProcessor, Config,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_QUERIES: &[&str] = &[
    "What are the current US Treasury bond yields?",
    "Find information about corporate bond market trends",
    "What are the latest government bond rates?",
];

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bondscraper=info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // ─── 2) config + output dirs ─────────────────────────────────────
    let cfg = Config::load()?;
    setup_output_directories(&cfg)?;
    let client = build_client(&cfg)?;
    let mut processor = BondDataProcessor::new();

    // ─── 3) queries from argv, else the defaults ─────────────────────
    let args: Vec<String> = env::args().skip(1).collect();
    let queries: Vec<String> = if args.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        args
    };

    // ─── 4) one query at a time; a failure never stops the run ───────
    for (i, query) in queries.iter().enumerate() {
        let tag = format!("{}_{}", get_timestamp(), i + 1);
        match run_query(&client, &cfg, &mut processor, query, &tag).await {
            Ok(outcome) => {
                info!(
                    rows = outcome.rows,
                    raw = %outcome.raw_path.display(),
                    analysis = %outcome.analysis_path.display(),
                    csv = ?outcome.csv_path,
                    "query done"
                );
                println!("\nResults for query: {}", query);
                println!("Raw Results:");
                println!("{}", serde_json::to_string_pretty(&outcome.raw)?);
                println!("\nAnalysis:");
                println!("{}", serde_json::to_string_pretty(&outcome.analysis)?);
            }
            Err(e) => error!("Error processing query '{}': {:#}", query, e),
        }
    }

    info!("all done");
    Ok(())
}
