// src/process/export.rs

use arrow::{
    array::{ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::NaiveDateTime;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Deserialize;
use std::{fs::File, path::Path, sync::Arc};
use tracing::debug;

use super::normalize::{Column, Row, Table, TIMESTAMP_FORMAT};
use crate::error::{ProcessError, Result};

/// Write `table` as CSV with a header of the columns it actually has.
///
/// Inapplicable fields are left empty. An empty table is rejected before
/// anything touches the filesystem.
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    if table.is_empty() {
        return Err(ProcessError::EmptyExport);
    }
    let columns = table.columns();

    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(columns.iter().map(|c| c.name()))?;
    for row in table {
        wtr.write_record(
            columns
                .iter()
                .map(|c| c.render(row).unwrap_or_default()),
        )?;
    }
    wtr.flush()?;

    debug!(path = %path.as_ref().display(), rows = table.len(), "wrote csv");
    Ok(())
}

/// Flat view of one CSV line; any column may be absent from the header.
/// Only `yield` is optional: an empty cell there marks a result row, while
/// empty text cells are read back as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRecord {
    bond_type: String,
    #[serde(rename = "yield")]
    yield_value: Option<f64>,
    source: String,
    content: String,
    timestamp: String,
}

/// Read a table back from a file produced by [`write_csv`].
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let mut rows = Vec::new();

    for (i, record) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = record?;
        let timestamp = NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| {
                ProcessError::Normalization(format!(
                    "line {}: bad timestamp {:?}: {e}",
                    i + 2,
                    record.timestamp
                ))
            })?;

        let row = match record.yield_value {
            Some(value) => Row::yield_row(record.bond_type, value, timestamp),
            None => Row::result_row(record.source, record.content, timestamp),
        };
        rows.push(row);
    }

    Ok(Table::from_rows(rows))
}

fn arrow_field(column: Column) -> Field {
    let ty = match column {
        Column::Yield => DataType::Float64,
        Column::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        Column::BondType | Column::Source | Column::Content => DataType::Utf8,
    };
    Field::new(column.name(), ty, column != Column::Timestamp)
}

fn arrow_array(column: Column, rows: &[Row]) -> ArrayRef {
    match column {
        Column::Yield => Arc::new(Float64Array::from(
            rows.iter().map(Row::yield_value).collect::<Vec<_>>(),
        )),
        Column::Timestamp => Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| r.timestamp.and_utc().timestamp_micros()),
        )),
        Column::BondType | Column::Source | Column::Content => Arc::new(StringArray::from(
            rows.iter().map(|r| column.render(r)).collect::<Vec<_>>(),
        )),
    }
}

/// Columnar copy of `table`, one Arrow column per table column.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let columns = table.columns();
    let schema = Arc::new(Schema::new(
        columns.iter().map(|c| arrow_field(*c)).collect::<Vec<_>>(),
    ));
    let arrays = columns
        .iter()
        .map(|c| arrow_array(*c, table.rows()))
        .collect::<Vec<_>>();
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Write `table` as a single-batch Snappy-compressed Parquet file.
pub fn write_parquet(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    if table.is_empty() {
        return Err(ProcessError::EmptyExport);
    }
    let batch = to_record_batch(table)?;

    let file = File::create(path.as_ref())?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    debug!(path = %path.as_ref().display(), rows = table.len(), "wrote parquet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::{Duration, NaiveDate};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn sample_table() -> Table {
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_micro_opt(8, 0, 0, 500)
            .unwrap();
        Table::from_rows(vec![
            Row::yield_row("10_year", 3.5, t0),
            Row::yield_row("2_year", 4.2, t0 + Duration::milliseconds(3)),
            Row::result_row("example.com", "yields, rising \"fast\"", t0 + Duration::seconds(1)),
        ])
    }

    #[test]
    fn test_csv_header_and_row_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bonds.csv");
        write_csv(&sample_table(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("bond_type,yield,timestamp,source,content")
        );
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_csv_round_trip_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bonds.csv");
        let table = sample_table();
        write_csv(&table, &path).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.yields(), vec![3.5, 4.2]);
    }

    #[test]
    fn test_csv_round_trip_keeps_empty_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let table = Table::from_rows(vec![
            Row::yield_row("", 3.5, t0),
            Row::result_row("", "c", t0 + Duration::seconds(1)),
            Row::result_row("wire", "", t0 + Duration::seconds(2)),
        ]);
        write_csv(&table, &path).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.rows()[0].bond_type(), Some(""));
        assert_eq!(back.rows()[1].source(), Some(""));
        assert_eq!(back.rows()[2].content(), Some(""));
    }

    #[test]
    fn test_yields_only_csv_has_no_result_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("yields.csv");
        let t0 = NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let table = Table::from_rows(vec![Row::yield_row("30_year", 4.8, t0)]);
        write_csv(&table, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("bond_type,yield,timestamp"));
        assert_eq!(read_csv(&path).unwrap(), table);
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("empty.csv");
        let pq_path = dir.path().join("empty.parquet");
        assert!(matches!(
            write_csv(&Table::default(), &csv_path),
            Err(ProcessError::EmptyExport)
        ));
        assert!(matches!(
            write_parquet(&Table::default(), &pq_path),
            Err(ProcessError::EmptyExport)
        ));
        assert!(!csv_path.exists());
        assert!(!pq_path.exists());
    }

    #[test]
    fn test_parquet_has_nullable_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bonds.parquet");
        write_parquet(&sample_table(), &path).unwrap();

        let file = File::open(&path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 5);

        let yields = batch
            .column_by_name("yield")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(yields.value(0), 3.5);
        assert_eq!(yields.value(1), 4.2);
        assert!(yields.is_null(2));
    }
}
