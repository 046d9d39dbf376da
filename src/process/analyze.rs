// src/process/analyze.rs

use serde::Serialize;

use super::normalize::{Column, Row, Table};
use crate::error::{ProcessError, Result};

/// Descriptive statistics over every row that carries a yield.
///
/// `std` is the sample standard deviation and is NaN for a single value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Movement between the earliest and latest yield observation.
///
/// `percent_change` is infinite or NaN when the first yield is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldChange {
    pub latest: f64,
    pub change: f64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_stats: Option<YieldStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trends {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_change: Option<YieldChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: Summary,
    pub trends: Trends,
}

/// Outcome of a fail-soft analysis: the report, or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Analysis {
    Report(AnalysisReport),
    Error { error: String },
}

impl Analysis {
    pub fn is_error(&self) -> bool {
        matches!(self, Analysis::Error { .. })
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Analysis::Report(r) => Some(r),
            Analysis::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Analysis::Error { error } => Some(error),
            Analysis::Report(_) => None,
        }
    }
}

impl From<Result<AnalysisReport>> for Analysis {
    fn from(res: Result<AnalysisReport>) -> Self {
        match res {
            Ok(report) => Analysis::Report(report),
            Err(e) => Analysis::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Build the report for `table`.
pub fn analyze(table: &Table) -> Result<AnalysisReport> {
    if table.is_empty() {
        return Err(ProcessError::NoData);
    }

    let mut report = AnalysisReport::default();
    if !table.has_column(Column::Yield) {
        return Ok(report);
    }

    let values = table.yields();
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ProcessError::Analysis(format!(
            "non-finite yield value {bad}"
        )));
    }
    report.summary.yield_stats = Some(yield_stats(&values));

    // every row carries a timestamp, so the yield column is the only gate
    if table.len() > 1 {
        report.trends.yield_change = yield_change(table);
    }

    Ok(report)
}

fn yield_stats(values: &[f64]) -> YieldStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        f64::NAN
    } else {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    YieldStats {
        mean,
        std,
        min,
        max,
    }
}

/// First and last yield after a stable sort by timestamp; the table itself
/// keeps its processing order.
fn yield_change(table: &Table) -> Option<YieldChange> {
    let mut ordered: Vec<&Row> = table.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut observed = ordered.iter().filter_map(|r| r.yield_value());
    let first = observed.next()?;
    let latest = observed.last().unwrap_or(first);
    let change = latest - first;
    Some(YieldChange {
        latest,
        change,
        percent_change: change / first * 100.0,
    })
}
