// src/process/normalize.rs

use chrono::{Local, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use super::extract::YieldMap;
use crate::error::{ProcessError, Result};

/// ISO-8601 layout used for row timestamps on the wire and on disk.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One element of a search result listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRecord {
    /// A record-shaped element; missing fields default during normalization.
    Record {
        source: Option<String>,
        content: Option<String>,
    },
    /// Anything else (bare strings, numbers, arrays). Skipped by the normalizer.
    Other(Value),
}

impl ResultRecord {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        ResultRecord::Record {
            source: Some(source.into()),
            content: Some(content.into()),
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(obj) => ResultRecord::Record {
                source: obj.get("source").and_then(value_as_text),
                content: obj.get("content").and_then(value_as_text),
            },
            other => ResultRecord::Other(other.clone()),
        }
    }
}

/// Strings pass through; other scalars are rendered; null counts as missing.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The two shapes a collaborator can hand to the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Yields(YieldMap),
    Results(Vec<ResultRecord>),
}

/// A search/scrape outcome, reduced to the payloads the core cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    payloads: Vec<Payload>,
}

impl RawResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_yields(mut self, yields: YieldMap) -> Self {
        self.payloads.push(Payload::Yields(yields));
        self
    }

    pub fn with_results(mut self, results: Vec<ResultRecord>) -> Self {
        self.payloads.push(Payload::Results(results));
        self
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Probe loosely-typed JSON for a `yields` object and a `results` array.
    ///
    /// Non-objects and objects carrying neither key give an empty result.
    /// A `yields` entry that is not an object, or a yield value that is
    /// neither a number nor a numeric string, is a normalization failure.
    /// A non-array `results` entry is ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            debug!("raw result is not an object; treating as empty");
            return Ok(Self::default());
        };

        let mut raw = Self::default();

        if let Some(yields) = obj.get("yields") {
            let Value::Object(map) = yields else {
                return Err(ProcessError::Normalization(format!(
                    "`yields` must be an object, got {}",
                    json_kind(yields)
                )));
            };
            let mut parsed = YieldMap::new();
            for (tenor, v) in map {
                parsed.insert(tenor.clone(), yield_from_value(tenor, v)?);
            }
            raw = raw.with_yields(parsed);
        }

        match obj.get("results") {
            Some(Value::Array(items)) => {
                raw = raw.with_results(items.iter().map(ResultRecord::from_value).collect());
            }
            Some(other) => warn!(kind = json_kind(other), "ignoring non-array `results`"),
            None => {}
        }

        Ok(raw)
    }
}

fn yield_from_value(tenor: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ProcessError::Normalization(format!("yield for {tenor:?} is not numeric: {value}"))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fields a row carries, by origin. A row is one or the other, never a mix.
#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Yield { bond_type: String, value: f64 },
    Result { source: String, content: String },
}

/// One normalized record of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub timestamp: NaiveDateTime,
}

impl Row {
    pub fn yield_row(bond_type: impl Into<String>, value: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            kind: RowKind::Yield {
                bond_type: bond_type.into(),
                value,
            },
            timestamp,
        }
    }

    pub fn result_row(
        source: impl Into<String>,
        content: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            kind: RowKind::Result {
                source: source.into(),
                content: content.into(),
            },
            timestamp,
        }
    }

    pub fn bond_type(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Yield { bond_type, .. } => Some(bond_type),
            RowKind::Result { .. } => None,
        }
    }

    pub fn yield_value(&self) -> Option<f64> {
        match self.kind {
            RowKind::Yield { value, .. } => Some(value),
            RowKind::Result { .. } => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Result { source, .. } => Some(source),
            RowKind::Yield { .. } => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Result { content, .. } => Some(content),
            RowKind::Yield { .. } => None,
        }
    }

    pub fn timestamp_iso(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Named columns of a table, in the order they are first introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    BondType,
    Yield,
    Source,
    Content,
    Timestamp,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::BondType => "bond_type",
            Column::Yield => "yield",
            Column::Source => "source",
            Column::Content => "content",
            Column::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bond_type" => Some(Column::BondType),
            "yield" => Some(Column::Yield),
            "source" => Some(Column::Source),
            "content" => Some(Column::Content),
            "timestamp" => Some(Column::Timestamp),
            _ => None,
        }
    }

    /// This column's value in `row`, rendered as text; `None` if not applicable.
    pub fn render(self, row: &Row) -> Option<String> {
        match self {
            Column::BondType => row.bond_type().map(str::to_string),
            Column::Yield => row.yield_value().map(|v| v.to_string()),
            Column::Source => row.source().map(str::to_string),
            Column::Content => row.content().map(str::to_string),
            Column::Timestamp => Some(row.timestamp_iso()),
        }
    }
}

/// Ordered rows produced by one normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Yield values of every row that has one, in table order.
    pub fn yields(&self) -> Vec<f64> {
        self.rows.iter().filter_map(Row::yield_value).collect()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns().contains(&column)
    }

    /// Columns present in this table, in first-appearance order.
    ///
    /// Yield rows introduce `bond_type, yield, timestamp`; result rows
    /// introduce `source, content, timestamp`.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = Vec::with_capacity(5);
        for row in &self.rows {
            let introduced: &[Column] = match row.kind {
                RowKind::Yield { .. } => &[Column::BondType, Column::Yield, Column::Timestamp],
                RowKind::Result { .. } => &[Column::Source, Column::Content, Column::Timestamp],
            };
            for col in introduced {
                if !cols.contains(col) {
                    cols.push(*col);
                }
            }
            if cols.len() == 5 {
                break;
            }
        }
        cols
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Normalize `raw` into a table, stamping each row with the local wall clock.
pub fn normalize(raw: &RawResult) -> Result<Table> {
    normalize_with_clock(raw, || Local::now().naive_local())
}

/// Same as [`normalize`] with an injectable clock.
///
/// Yield payloads are emitted before result payloads regardless of the
/// order they were attached in. Non-record result elements are skipped,
/// and missing `source`/`content` become `"unknown"`/`""`.
pub fn normalize_with_clock<F>(raw: &RawResult, mut now: F) -> Result<Table>
where
    F: FnMut() -> NaiveDateTime,
{
    let (yields, results): (Vec<&Payload>, Vec<&Payload>) = raw
        .payloads()
        .iter()
        .partition(|p| matches!(p, Payload::Yields(_)));

    let mut rows = Vec::new();
    for payload in yields.into_iter().chain(results) {
        match payload {
            Payload::Yields(map) => {
                for (tenor, &value) in map {
                    if !value.is_finite() {
                        return Err(ProcessError::Normalization(format!(
                            "yield for {tenor:?} is not finite: {value}"
                        )));
                    }
                    rows.push(Row::yield_row(tenor.clone(), value, now()));
                }
            }
            Payload::Results(records) => {
                for record in records {
                    match record {
                        ResultRecord::Record { source, content } => rows.push(Row::result_row(
                            source.as_deref().unwrap_or("unknown"),
                            content.as_deref().unwrap_or(""),
                            now(),
                        )),
                        ResultRecord::Other(v) => {
                            debug!(kind = json_kind(v), "skipping non-record result element")
                        }
                    }
                }
            }
        }
    }

    Ok(Table::from_rows(rows))
}
