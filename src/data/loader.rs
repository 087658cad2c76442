use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    ListArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::Measurement;

/// Optional column carrying a free-form label per spectrum.
const LABEL_COLUMN: &str = "label";
/// Optional column carrying the resolution estimate per spectrum.
const FWHM_COLUMN: &str = "fwhm";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load measurements from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Parquet file with `x` and `y` list columns (recommended)
/// * `.json`    – `[{ "x": [...], "y": [...], "label": "...", "fwhm": 9.5 }, ...]`
/// * `.csv`     – columns `x` and `y` containing semicolon-separated floats
///
/// `label` and `fwhm` are optional everywhere; other columns are ignored.
pub fn load_file(path: &Path) -> Result<Vec<Measurement>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let measurements = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    if measurements.is_empty() {
        bail!("{} contains no spectra", path.display());
    }
    log::debug!("loaded {} spectra from {}", measurements.len(), path.display());
    Ok(measurements)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "x": [200.0, 202.0, ...],
///     "y": [0.12,  0.14,  ...],
///     "label": "WP-00123",
///     "fwhm": 9.5
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Measurement>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

fn parse_json(text: &str) -> Result<Vec<Measurement>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut measurements = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let x = json_array_to_f64(obj.get("x"), i, "x")?;
        let y = json_array_to_f64(obj.get("y"), i, "y")?;

        if x.len() != y.len() {
            bail!("Row {i}: x has {} values but y has {}", x.len(), y.len());
        }

        let label = match obj.get(LABEL_COLUMN) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        let fwhm = match obj.get(FWHM_COLUMN) {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(
                v.as_f64()
                    .with_context(|| format!("Row {i}: '{FWHM_COLUMN}' is not a number"))?,
            ),
        };

        measurements.push(Measurement { x, y, label, fwhm });
    }

    Ok(measurements)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `x` and `y` columns contain semicolon-separated floats:
///   `"200.0;202.0;204.0"`, `"0.12;0.14;0.11"`
/// Optional `label` and `fwhm` columns; anything else is ignored.
fn load_csv(path: &Path) -> Result<Vec<Measurement>> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Measurement>> {
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let x_idx = column("x").context("CSV missing 'x' column")?;
    let y_idx = column("y").context("CSV missing 'y' column")?;
    let label_idx = column(LABEL_COLUMN);
    let fwhm_idx = column(FWHM_COLUMN);

    let mut measurements = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let x = parse_semicolon_floats(record.get(x_idx).unwrap_or(""), row_no, "x")?;
        let y = parse_semicolon_floats(record.get(y_idx).unwrap_or(""), row_no, "y")?;

        if x.len() != y.len() {
            bail!(
                "CSV row {row_no}: x has {} values but y has {}",
                x.len(),
                y.len()
            );
        }

        let label = label_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let fwhm = match fwhm_idx.and_then(|i| record.get(i)).map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<f64>()
                    .with_context(|| format!("CSV row {row_no}: '{s}' is not a resolution"))?,
            ),
        };

        measurements.push(Measurement { x, y, label, fwhm });
    }

    Ok(measurements)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing measurements.
///
/// Expected schema:
/// - `x`: List<Float64> or LargeList<Float64> – wavenumber arrays
/// - `y`: List<Float64> or LargeList<Float64> – intensity arrays
/// - `label` (optional): Utf8
/// - `fwhm` (optional): Float64 / Float32 / Int
///
/// This is the layout `generate_sample` writes.
fn load_parquet(path: &Path) -> Result<Vec<Measurement>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut measurements = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let x_idx = schema
            .index_of("x")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'x' column"))?;
        let y_idx = schema
            .index_of("y")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'y' column"))?;

        let x_col = batch.column(x_idx);
        let y_col = batch.column(y_idx);
        let label_col = schema.index_of(LABEL_COLUMN).ok().map(|i| batch.column(i));
        let fwhm_col = schema.index_of(FWHM_COLUMN).ok().map(|i| batch.column(i));

        for row in 0..n_rows {
            let x = extract_f64_list(x_col, row)
                .with_context(|| format!("Row {row}: failed to read 'x'"))?;
            let y = extract_f64_list(y_col, row)
                .with_context(|| format!("Row {row}: failed to read 'y'"))?;

            if x.len() != y.len() {
                bail!("Row {row}: x has {} values but y has {}", x.len(), y.len());
            }

            let label = label_col.and_then(|col| extract_string(col, row));
            let fwhm = match fwhm_col {
                Some(col) => extract_f64(col, row)
                    .with_context(|| format!("Row {row}: failed to read '{FWHM_COLUMN}'"))?,
                None => None,
            };

            measurements.push(Measurement { x, y, label, fwhm });
        }
    }

    Ok(measurements)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// A string cell, or `None` when null or not a string column.
fn extract_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
}

/// A numeric cell as `f64`; null gives `Ok(None)`, a non-numeric column is an error.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any.downcast_ref::<Float64Array>().map(|a| a.value(row)),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int32 => any.downcast_ref::<Int32Array>().map(|a| a.value(row) as f64),
        DataType::Int64 => any.downcast_ref::<Int64Array>().map(|a| a.value(row) as f64),
        other => bail!("expected a numeric column, got {other:?}"),
    };
    value.map(Some).context("column type does not match its array")
}
