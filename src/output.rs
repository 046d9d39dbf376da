// src/output.rs

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{error, info};

use crate::config::Config;

/// Local wall-clock stamp used in output file names, e.g. `20240301_093000`.
pub fn get_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Create `<output>/`, `<output>/raw` and `<output>/processed`.
pub fn setup_output_directories(cfg: &Config) -> Result<()> {
    for d in [cfg.output_dir.clone(), cfg.raw_dir(), cfg.processed_dir()] {
        fs::create_dir_all(&d).with_context(|| format!("creating {}", d.display()))?;
    }
    Ok(())
}

/// Pretty-print `data` as JSON to `path`.
pub fn save_to_json<T: Serialize + ?Sized>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, data)
        .with_context(|| format!("serializing JSON to {}", path.display()))?;
    w.write_all(b"\n")?;
    w.flush()?;
    info!("Successfully saved data to {}", path.display());
    Ok(())
}

/// Parse JSON from `path`; an empty object on any failure.
pub fn load_from_json(path: impl AsRef<Path>) -> Value {
    let path = path.as_ref();
    let loaded = File::open(path)
        .with_context(|| format!("opening {}", path.display()))
        .and_then(|f| {
            serde_json::from_reader::<_, Value>(BufReader::new(f))
                .with_context(|| format!("parsing {}", path.display()))
        });
    match loaded {
        Ok(v) => {
            info!("Successfully loaded data from {}", path.display());
            v
        }
        Err(e) => {
            error!("Error loading data from {}: {:#}", path.display(), e);
            Value::Object(Map::new())
        }
    }
}
