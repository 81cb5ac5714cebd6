use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::arff;
use super::model::{Column, Dataset, Domain, Row, Schema, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.arff`    – attribute-relation file with declared column domains
/// * `.csv`     – header row; all-numeric columns become numeric, others nominal
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat numeric / string / boolean columns
///
/// The loaded dataset has no target column set.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "arff" => load_arff(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    debug!(
        "loaded {}: {} row(s) x {} column(s)",
        path.display(),
        dataset.len(),
        dataset.column_count()
    );
    Ok(dataset)
}

fn relation_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

// ---------------------------------------------------------------------------
// ARFF loader
// ---------------------------------------------------------------------------

fn load_arff(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading ARFF file")?;
    arff::parse(&text, &relation_name(path)).context("parsing ARFF")
}

// ---------------------------------------------------------------------------
// Domain inference for untyped formats
// ---------------------------------------------------------------------------

/// Numeric if every present value is a number, otherwise nominal over the
/// distinct values in order of first appearance.
fn infer_column(name: &str, cells: Vec<Value>) -> (Column, Vec<Value>) {
    let numeric = cells
        .iter()
        .all(|v| matches!(v, Value::Number(_) | Value::Missing));
    if numeric {
        return (Column::new(name, Domain::Numeric), cells);
    }

    let mut seen = BTreeSet::new();
    let mut labels = Vec::new();
    let cells: Vec<Value> = cells
        .into_iter()
        .map(|v| match v {
            Value::Missing => Value::Missing,
            other => {
                let label = other.to_string();
                if seen.insert(label.clone()) {
                    labels.push(label.clone());
                }
                Value::Text(label)
            }
        })
        .collect();
    (Column::new(name, Domain::Nominal(labels)), cells)
}

/// Build a dataset from column-major cells.
fn from_columns(relation: String, columns: Vec<(String, Vec<Value>)>, n_rows: usize) -> Result<Dataset> {
    let mut schema_columns = Vec::with_capacity(columns.len());
    let mut rows: Vec<Vec<Value>> = vec![Vec::with_capacity(columns.len()); n_rows];

    for (name, cells) in columns {
        if cells.len() != n_rows {
            bail!("column '{name}' has {} value(s), expected {n_rows}", cells.len());
        }
        let (column, cells) = infer_column(&name, cells);
        schema_columns.push(column);
        for (row, cell) in rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }

    let schema = Arc::new(Schema::new(relation, schema_columns));
    Ok(Dataset::new(schema, rows.into_iter().map(Row::new).collect())?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
/// Empty cells and `?` are missing values.
fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<(String, Vec<Value>)> =
        headers.iter().map(|h| (h.clone(), Vec::new())).collect();
    let mut n_rows = 0;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} field(s), header has {}",
                record.len(),
                headers.len()
            );
        }
        for ((_, cells), field) in columns.iter_mut().zip(record.iter()) {
            cells.push(guess_value(field));
        }
        n_rows += 1;
    }

    from_columns(relation_name(path), columns, n_rows)
}

fn guess_value(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() || s == "?" {
        return Value::Missing;
    }
    match s.parse::<f64>() {
        Ok(f) => Value::Number(f),
        Err(_) => Value::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "x": 4.2, "label": "a" },
///   { "x": 1.0, "label": "b" }
/// ]
/// ```
///
/// Columns are the union of all keys, in sorted order. Absent keys and
/// `null` are missing values.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: BTreeSet<&str> = BTreeSet::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        names.extend(obj.keys().map(String::as_str));
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let cells = records
                .iter()
                .map(|rec| json_to_value(rec.get(name)))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("column '{name}'"))?;
            Ok((name.to_string(), cells))
        })
        .collect::<Result<Vec<_>>>()?;

    from_columns(relation_name(path), columns, records.len())
}

fn json_to_value(val: Option<&JsonValue>) -> Result<Value> {
    Ok(match val {
        None | Some(JsonValue::Null) => Value::Missing,
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .map(Value::Number)
            .with_context(|| format!("{n} is not representable as f64"))?,
        Some(JsonValue::String(s)) => Value::Text(s.clone()),
        Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
        Some(other) => bail!("nested value {other} is not supported"),
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Integer and float columns become numeric; string and boolean columns
/// become nominal. Nested columns are rejected.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let arrow_schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<(String, Vec<Value>)> = arrow_schema
        .fields()
        .iter()
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();
    let mut n_rows = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, (name, cells)) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                let value = extract_value(array, row)
                    .with_context(|| format!("Row {}: failed to read '{name}'", n_rows + row))?;
                cells.push(value);
            }
        }
        n_rows += batch.num_rows();
    }

    from_columns(relation_name(path), columns, n_rows)
}

// -- Arrow helpers --

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Missing);
    }
    let value = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Value::Text(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Value::Number(arr.value(row) as f64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Value::Number(arr.value(row) as f64)
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Value::Number(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Value::Number(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Value::Text(arr.value(row).to_string())
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_csv_infers_domains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iris.csv");
        std::fs::write(&path, "len,species\n5.1,setosa\n?,virginica\n4.9,setosa\n").unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.schema().relation, "iris");
        assert_eq!(ds.schema().column(0).unwrap().domain, Domain::Numeric);
        assert_eq!(
            ds.schema().column(1).unwrap().domain,
            Domain::Nominal(vec!["setosa".into(), "virginica".into()])
        );
        assert_eq!(ds.len(), 3);
        assert!(ds.rows()[1].get(0).unwrap().is_missing());
        assert_eq!(ds.target_index(), None);
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        std::fs::write(
            &path,
            r#"[{"x": 1.5, "label": "a"}, {"x": 2, "label": null}, {"label": "b"}]"#,
        )
        .unwrap();

        let ds = load_file(&path).unwrap();
        let names: Vec<&str> = ds.schema().columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["label", "x"]);
        assert_eq!(ds.schema().column(1).unwrap().domain, Domain::Numeric);
        assert_eq!(ds.rows()[1].get(0), Some(&Value::Missing));
        assert_eq!(ds.rows()[2].get(1), Some(&Value::Missing));
        assert_eq!(ds.rows()[1].get(1), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("data.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn test_missing_file_reports_context() {
        let err = load_file(Path::new("/definitely/not/here.arff")).unwrap_err();
        assert!(format!("{err:#}").contains("reading ARFF file"));
    }
}
