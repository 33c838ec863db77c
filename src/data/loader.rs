use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Observation, ObservationTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an observation table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row; `Age`, `Height`, `Weight` located by name
/// * `.json`    – `[{ "Age": 24, "Height": 180.0, "Weight": null, ... }, ...]`
/// * `.parquet` – numeric `Age`, `Height`, `Weight` columns
///
/// Any other column is ignored.
pub fn load_file(path: &Path) -> Result<ObservationTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    info!(
        "loaded {} rows from {} (missing: Age={}, Height={}, Weight={})",
        table.len(),
        path.display(),
        table.missing_count(Column::Age),
        table.missing_count(Column::Height),
        table.missing_count(Column::Weight),
    );
    Ok(table)
}

/// Same as [`load_file`], wrapped for sharing across callers.
pub fn load_shared(path: &Path) -> Result<Arc<ObservationTable>> {
    load_file(path).map(Arc::new)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one athlete per record.
/// Empty cells and the pandas markers `NA` / `NaN` are missing.
fn load_csv(path: &Path) -> Result<ObservationTable> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<ObservationTable> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let positions = Column::ALL.map(|col| headers.iter().position(|h| h == col.label()));
    for (col, pos) in Column::ALL.iter().zip(&positions) {
        if pos.is_none() {
            bail!("CSV missing '{col}' column");
        }
    }

    let mut observations = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut cells = [None; 3];
        for (slot, (col, pos)) in cells.iter_mut().zip(Column::ALL.iter().zip(&positions)) {
            let raw = pos.and_then(|p| record.get(p)).unwrap_or("");
            *slot = parse_cell(raw, row_no, *col)?;
        }

        observations.push(Observation::new(cells[0], cells[1], cells[2]));
    }

    Ok(ObservationTable::from_observations(observations))
}

fn parse_cell(s: &str, row: usize, col: Column) -> Result<Option<f64>> {
    let tok = s.trim();
    if tok.is_empty() || tok.eq_ignore_ascii_case("na") || tok.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    tok.parse::<f64>()
        .map(Some)
        .with_context(|| format!("Row {row}, {col}: '{tok}' is not a number"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Name": "A Dijiang", "Age": 24, "Height": 180.0, "Weight": 80.0 },
///   { "Name": "A Lamusi",  "Age": 23, "Height": 170.0, "Weight": null },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<ObservationTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<ObservationTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut observations = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = [None; 3];
        for (slot, col) in cells.iter_mut().zip(Column::ALL) {
            *slot = json_to_cell(obj.get(col.label()), i, col)?;
        }
        observations.push(Observation::new(cells[0], cells[1], cells[2]));
    }

    Ok(ObservationTable::from_observations(observations))
}

fn json_to_cell(val: Option<&JsonValue>, row: usize, col: Column) -> Result<Option<f64>> {
    match val {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(Some)
            .with_context(|| format!("Row {row}, {col}: number out of range")),
        Some(other) => bail!("Row {row}, {col}: expected a number, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing athlete records.
///
/// `Age`, `Height` and `Weight` may be stored as Int32, Int64, Float32 or
/// Float64; nulls are missing cells.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<ObservationTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut observations = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mut arrays = Vec::with_capacity(Column::ALL.len());
        for col in Column::ALL {
            let idx = schema
                .index_of(col.label())
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{col}' column"))?;
            arrays.push(batch.column(idx));
        }

        for row in 0..batch.num_rows() {
            let mut cells = [None; 3];
            for (slot, (col, array)) in cells.iter_mut().zip(Column::ALL.iter().zip(&arrays)) {
                *slot = extract_f64(array, row)
                    .with_context(|| format!("Row {row}: failed to read '{col}'"))?;
            }
            observations.push(Observation::new(cells[0], cells[1], cells[2]));
        }
    }

    Ok(ObservationTable::from_observations(observations))
}

// -- Parquet / Arrow helpers --

/// Extract a numeric cell from an Arrow column at the given row.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col)?.value(row),
        DataType::Float32 => downcast::<Float32Array>(col)?.value(row) as f64,
        DataType::Int64 => downcast::<Int64Array>(col)?.value(row) as f64,
        DataType::Int32 => downcast::<Int32Array>(col)?.value(row) as f64,
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(Some(value))
}

fn downcast<T: 'static>(col: &Arc<dyn Array>) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array layout for {:?}", col.data_type()))
}
