use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, ColumnType, Table};
use super::transform::looks_like_date;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, schema inferred per column
/// * `.json`    – records-oriented array: `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat columnar file (strings, ints, floats, bools)
pub fn load_file(path: &Path) -> Result<Table, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    if table.columns().is_empty() {
        return Err(LoadError::Empty);
    }
    log::info!(
        "loaded {}: {} rows, {} columns",
        path.display(),
        table.len(),
        table.columns().len()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Column coherence
// ---------------------------------------------------------------------------

/// Unify a column of per-cell guesses into a single coherent dtype:
/// Integer widens to Float (ints converted), any other mix degrades to
/// String (cells stringified). Inference happens once here; transforms
/// later validate against the resulting schema.
fn finish_column(name: String, cells: Vec<CellValue>) -> Column {
    let col = Column::infer(name, cells);
    match col.dtype {
        ColumnType::Float => {
            let values = col
                .values
                .into_iter()
                .map(|v| match v {
                    CellValue::Integer(i) => CellValue::Float(i as f64),
                    other => other,
                })
                .collect();
            Column::new(col.name, ColumnType::Float, values)
        }
        ColumnType::String => {
            let values = col
                .values
                .into_iter()
                .map(|v| match v {
                    CellValue::Null => CellValue::Null,
                    CellValue::String(s) => CellValue::String(s),
                    other => CellValue::String(other.to_string()),
                })
                .collect();
            Column::new(col.name, ColumnType::String, values)
        }
        _ => col,
    }
}

fn build_table(columns: Vec<Column>, format: &'static str) -> Result<Table, LoadError> {
    Table::new(columns).map_err(|reason| LoadError::Malformed { format, reason })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Guess the type of one raw CSV cell. Only the empty string counts as
/// missing; tokens like `"N/A"` stay as text so a later cast can fail
/// loudly instead of silently losing data.
fn guess_cell(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    if looks_like_date(s) {
        return CellValue::Date(s.to_string());
    }
    CellValue::String(s.to_string())
}

fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
        csv::ErrorKind::Io(_) => LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        },
        _ => LoadError::Malformed {
            format: "csv",
            reason: e.to_string(),
        },
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Malformed {
            format: "csv",
            reason: format!("reading headers: {e}"),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::Malformed {
            format: "csv",
            reason: format!("row {row_no}: {e}"),
        })?;
        if record.len() != headers.len() {
            return Err(LoadError::Malformed {
                format: "csv",
                reason: format!(
                    "row {row_no}: {} fields, expected {}",
                    record.len(),
                    headers.len()
                ),
            });
        }
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(guess_cell(value.trim()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| finish_column(name, values))
        .collect();
    build_table(columns, "csv")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "company": "A", "valuation": 1.5e9, "founded": 1998 },
///   ...
/// ]
/// ```
///
/// Objects may omit keys; absent cells become nulls. Column order follows
/// first appearance across the records.
fn load_json(path: &Path) -> Result<Table, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| LoadError::Malformed {
        format: "json",
        reason: e.to_string(),
    })?;

    let records = root.as_array().ok_or(LoadError::Malformed {
        format: "json",
        reason: "expected a top-level array of objects".to_string(),
    })?;

    let mut order: Vec<String> = Vec::new();
    let mut cells: BTreeMap<String, Vec<CellValue>> = BTreeMap::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| LoadError::Malformed {
            format: "json",
            reason: format!("row {i} is not an object"),
        })?;
        for (key, val) in obj {
            if !cells.contains_key(key) {
                order.push(key.clone());
                // Backfill nulls for rows seen before this column appeared.
                cells.insert(key.clone(), vec![CellValue::Null; i]);
            }
        }
        for key in &order {
            let column = cells.get_mut(key).unwrap_or_else(|| unreachable!());
            column.push(obj.get(key).map_or(CellValue::Null, json_to_cell));
        }
    }

    let columns = order
        .into_iter()
        .map(|name| {
            let values = cells.remove(&name).unwrap_or_default();
            finish_column(name, values)
        })
        .collect();
    build_table(columns, "json")
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) if looks_like_date(s) => CellValue::Date(s.clone()),
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`); nested
/// columns are not supported and degrade to their debug representation.
fn load_parquet(path: &Path) -> Result<Table, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| LoadError::Malformed {
            format: "parquet",
            reason: format!("reading metadata: {e}"),
        })?;
    let reader = builder.build().map_err(|e| LoadError::Malformed {
        format: "parquet",
        reason: format!("building reader: {e}"),
    })?;

    let mut order: Vec<String> = Vec::new();
    let mut cells: BTreeMap<String, Vec<CellValue>> = BTreeMap::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| LoadError::Malformed {
            format: "parquet",
            reason: format!("reading record batch: {e}"),
        })?;
        let schema = batch.schema();

        for (col_idx, field) in schema.fields().iter().enumerate() {
            let name = field.name();
            if !cells.contains_key(name) {
                order.push(name.clone());
                cells.insert(name.clone(), Vec::new());
            }
            let column = cells.get_mut(name).unwrap_or_else(|| unreachable!());
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                column.push(extract_cell(array, row));
            }
        }
    }

    let columns = order
        .into_iter()
        .map(|name| {
            let values = cells.remove(&name).unwrap_or_default();
            finish_column(name, values)
        })
        .collect();
    build_table(columns, "parquet")
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let text = if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                s.value(row).to_string()
            } else {
                // LargeStringArray
                col.as_string::<i64>().value(row).to_string()
            };
            if looks_like_date(&text) {
                CellValue::Date(text)
            } else {
                CellValue::String(text)
            }
        }
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(CellValue::Null, |a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(CellValue::Null, |a| CellValue::Float(a.value(row))),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map_or(CellValue::Null, |a| CellValue::Bool(a.value(row))),
        other => CellValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_infers_column_types() {
        let file = write_csv("age,name,score,joined\n30,ann,1.5,2020-01-02\n40,bob,2.0,2021-03-04\n");
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("age").unwrap().dtype, ColumnType::Integer);
        assert_eq!(table.column("name").unwrap().dtype, ColumnType::String);
        assert_eq!(table.column("score").unwrap().dtype, ColumnType::Float);
        assert_eq!(table.column("joined").unwrap().dtype, ColumnType::Date);
    }

    #[test]
    fn csv_mixed_column_degrades_to_string() {
        let file = write_csv("v\n1\nabc\n");
        let table = load_file(file.path()).unwrap();
        let col = table.column("v").unwrap();
        assert_eq!(col.dtype, ColumnType::String);
        assert_eq!(col.values[0], CellValue::String("1".into()));
    }

    #[test]
    fn csv_empty_cell_is_null_but_na_token_is_text() {
        let file = write_csv("v\n\nN/A\n");
        let table = load_file(file.path()).unwrap();
        let col = table.column("v").unwrap();
        assert_eq!(col.values[0], CellValue::Null);
        assert_eq!(col.values[1], CellValue::String("N/A".into()));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("data.xyz")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ref e) if e == "xyz"));
    }

    #[test]
    fn json_records_with_missing_keys() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"[{"a": 1, "b": "x"}, {"a": 2}]"#).unwrap();
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("b").unwrap().values[1], CellValue::Null);
    }

    #[test]
    fn json_int_and_float_widen_to_float() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"[{"v": 1}, {"v": 2.5}]"#).unwrap();
        let table = load_file(file.path()).unwrap();
        let col = table.column("v").unwrap();
        assert_eq!(col.dtype, ColumnType::Float);
        assert_eq!(col.values[0], CellValue::Float(1.0));
    }
}
