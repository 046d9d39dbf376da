// src/process/mod.rs

pub mod analyze;
pub mod export;
pub mod extract;
pub mod normalize;

pub use analyze::{Analysis, AnalysisReport, Summary, Trends, YieldChange, YieldStats};
pub use extract::{extract_yields, Tenor, YieldMap};
pub use normalize::{Column, Payload, RawResult, ResultRecord, Row, RowKind, Table};

use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

use crate::error::Result;

/// Holds the most recently normalized table and runs analysis/export on it.
///
/// Every call to `process_*` replaces the table; nothing is merged across
/// calls. Not meant to be shared between threads without external locking.
#[derive(Debug, Default)]
pub struct BondDataProcessor {
    table: Table,
}

impl BondDataProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-built table.
    pub fn with_table(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn try_extract_yield_data(&self, text: &str) -> Result<YieldMap> {
        extract_yields(text)
    }

    /// Yields found in `text`; empty on any extraction failure.
    pub fn extract_yield_data(&self, text: &str) -> YieldMap {
        self.try_extract_yield_data(text).unwrap_or_else(|e| {
            error!("Error extracting yield data: {}", e);
            YieldMap::new()
        })
    }

    /// Normalize `raw` into the held table. On failure the held table is
    /// cleared, so a later analysis never reports a stale result.
    pub fn try_process_bond_data(&mut self, raw: &RawResult) -> Result<&Table> {
        match normalize::normalize(raw) {
            Ok(table) => {
                self.table = table;
                Ok(&self.table)
            }
            Err(e) => {
                self.table = Table::default();
                Err(e)
            }
        }
    }

    pub fn process_bond_data(&mut self, raw: &RawResult) -> &Table {
        if let Err(e) = self.try_process_bond_data(raw) {
            error!("Error processing bond data: {}", e);
        }
        &self.table
    }

    /// Like [`Self::try_process_bond_data`] for untyped collaborator output.
    pub fn try_process_value(&mut self, value: &Value) -> Result<&Table> {
        match RawResult::from_value(value) {
            Ok(raw) => self.try_process_bond_data(&raw),
            Err(e) => {
                self.table = Table::default();
                Err(e)
            }
        }
    }

    pub fn process_value(&mut self, value: &Value) -> &Table {
        if let Err(e) = self.try_process_value(value) {
            error!("Error processing bond data: {}", e);
        }
        &self.table
    }

    pub fn try_analyze_trends(&self) -> Result<AnalysisReport> {
        analyze::analyze(&self.table)
    }

    /// Report over the held table, or `{"error": ...}` when there is nothing
    /// to analyze or the computation fails.
    pub fn analyze_trends(&self) -> Analysis {
        let res = self.try_analyze_trends();
        if let Err(e) = &res {
            error!("Error analyzing trends: {}", e);
        }
        Analysis::from(res)
    }

    pub fn try_export_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        export::write_csv(&self.table, path.as_ref())?;
        info!("Data exported to {}", path.as_ref().display());
        Ok(())
    }

    /// `true` once the held table is on disk; `false` (and no file) when the
    /// table is empty or the write fails.
    pub fn export_to_csv(&self, path: impl AsRef<Path>) -> bool {
        if self.table.is_empty() {
            return false;
        }
        match self.try_export_to_csv(path) {
            Ok(()) => true,
            Err(e) => {
                error!("Error exporting data: {}", e);
                false
            }
        }
    }

    pub fn try_export_to_parquet(&self, path: impl AsRef<Path>) -> Result<()> {
        export::write_parquet(&self.table, path.as_ref())?;
        info!("Data exported to {}", path.as_ref().display());
        Ok(())
    }

    pub fn export_to_parquet(&self, path: impl AsRef<Path>) -> bool {
        if self.table.is_empty() {
            return false;
        }
        match self.try_export_to_parquet(path) {
            Ok(()) => true,
            Err(e) => {
                error!("Error exporting data: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use approx::assert_relative_eq;
    use serde_json::json;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,bondscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    #[test]
    fn test_extract_yield_data() {
        init_test_logging();
        let processor = BondDataProcessor::new();
        let text = r#"
    10-year Treasury yield: 3.5%
    2-year bond yield: 4.2%
    30-year Treasury yield: 3.8%
    "#;
        let yields = processor.extract_yield_data(text);
        assert_eq!(yields["10_year"], 3.5);
        assert_eq!(yields["2_year"], 4.2);
        assert_eq!(yields["30_year"], 3.8);

        // malformed capture empties the whole call
        assert!(processor
            .extract_yield_data("10-year Treasury yield: 3.5.")
            .is_empty());
    }

    #[test]
    fn test_process_bond_data() {
        init_test_logging();
        let mut processor = BondDataProcessor::new();
        let table = processor.process_value(&json!({
            "yields": {"10_year": 3.5, "2_year": 4.2},
            "results": [{"source": "test_source", "content": "test content"}]
        }));
        assert_eq!(table.len(), 3);
        assert!(table.has_column(Column::BondType));
        assert!(table.has_column(Column::Yield));
        assert!(table.has_column(Column::Timestamp));
        assert!(table.has_column(Column::Source));
    }

    #[test]
    fn test_single_tenor_yields_one_row() {
        let mut processor = BondDataProcessor::new();
        let raw = RawResult::new().with_yields(YieldMap::from([("10_year".to_string(), 3.5)]));
        let table = processor.process_bond_data(&raw);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].bond_type(), Some("10_year"));
        assert_eq!(table.rows()[0].yield_value(), Some(3.5));
    }

    #[test]
    fn test_each_call_replaces_table() {
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({"yields": {"10_year": 3.5, "2_year": 4.2}}));
        assert_eq!(processor.table().len(), 2);

        processor.process_value(&json!({"results": [{"source": "a"}]}));
        assert_eq!(processor.table().len(), 1);
        assert_eq!(processor.table().yields(), Vec::<f64>::new());

        processor.process_value(&json!({}));
        assert!(processor.table().is_empty());
    }

    #[test]
    fn test_failed_normalization_clears_table() {
        init_test_logging();
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({"yields": {"10_year": 3.5}}));

        let err = processor
            .try_process_value(&json!({"yields": {"10_year": {"nested": true}}}))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Normalization(_)));
        assert!(processor.table().is_empty());
        assert!(processor.process_value(&json!({"yields": "3.5"})).is_empty());
    }

    #[test]
    fn test_analyze_trends() {
        init_test_logging();
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({"yields": {"10_year": 3.5, "2_year": 4.2}}));

        let analysis = processor.analyze_trends();
        assert!(!analysis.is_error());
        let stats = analysis.report().unwrap().summary.yield_stats.as_ref().unwrap();
        assert_relative_eq!(stats.mean, 3.85, epsilon = 1e-12);
        assert_eq!(stats.min, 3.5);
        assert_eq!(stats.max, 4.2);

        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json.get("summary").is_some());
        assert!(json.get("trends").is_some());
        assert!(json["summary"].get("yield_stats").is_some());
    }

    #[test]
    fn test_trend_follows_supplied_tenor_order() {
        let mut processor = BondDataProcessor::new();
        let table = processor.process_value(&json!({"yields": {"2_year": 4.2, "10_year": 3.5}}));
        let tenors: Vec<_> = table.iter().filter_map(Row::bond_type).collect();
        assert_eq!(tenors, vec!["2_year", "10_year"]);

        let analysis = processor.analyze_trends();
        let change = analysis.report().unwrap().trends.yield_change.as_ref().unwrap();
        assert_eq!(change.latest, 3.5);
        assert_relative_eq!(change.change, -0.7, epsilon = 1e-12);
        assert_relative_eq!(change.percent_change, -0.7 / 4.2 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_analyze_empty_reports_error() {
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({}));
        let analysis = processor.analyze_trends();
        assert_eq!(
            serde_json::to_value(&analysis).unwrap(),
            json!({"error": "No data available for analysis"})
        );
    }

    #[test]
    fn test_export_to_csv() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_export.csv");
        let mut processor = BondDataProcessor::new();

        assert!(!processor.export_to_csv(&path));
        assert!(!path.exists());

        processor.process_value(&json!({"yields": {"10_year": 3.5, "2_year": 4.2}}));
        assert!(processor.export_to_csv(&path));

        let back = export::read_csv(&path).unwrap();
        assert_eq!(back.len(), processor.table().len());
        assert!(back.has_column(Column::BondType));
        assert!(back.has_column(Column::Yield));
        assert_eq!(back.yields(), processor.table().yields());
    }

    #[test]
    fn test_csv_round_trip_with_blank_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        let raw = RawResult::from_value(&json!({
            "yields": {"": 3.5},
            "results": [{"source": "", "content": "c"}]
        }))
        .unwrap();
        // CSV keeps microseconds, so pin the clock to a whole second
        let at = chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let table = normalize::normalize_with_clock(&raw, || at).unwrap();
        let processor = BondDataProcessor::with_table(table);
        assert_eq!(processor.table().len(), 2);
        assert!(processor.export_to_csv(&path));

        let back = export::read_csv(&path).unwrap();
        assert_eq!(&back, processor.table());
    }

    #[test]
    fn test_export_to_unwritable_path_is_false() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({"yields": {"10_year": 3.5}}));
        assert!(!processor.export_to_csv(&path));
        assert!(!processor.export_to_parquet(dir.path().join("missing").join("out.parquet")));
    }

    #[test]
    fn test_export_to_parquet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bonds.parquet");
        let mut processor = BondDataProcessor::new();
        processor.process_value(&json!({
            "yields": {"30_year": 4.6},
            "results": [{"source": "s", "content": "c"}]
        }));
        assert!(processor.export_to_parquet(&path));
        assert!(path.exists());
    }
}
