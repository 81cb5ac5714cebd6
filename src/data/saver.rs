use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use log::{debug, warn};
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value as JsonValue};

use super::arff;
use super::model::{Dataset, Domain, Value};

/// Save a dataset to a file, choosing the format by extension (same set as
/// [`super::loader::load_file`]). An existing file is overwritten.
pub fn save_file(dataset: &Dataset, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "arff" => std::fs::write(path, arff::render(dataset)).context("writing ARFF file")?,
        "csv" => save_csv(dataset, path)?,
        "json" => save_json(dataset, path)?,
        "parquet" | "pq" => save_parquet(dataset, path)?,
        other => bail!("Unsupported file extension: .{other}"),
    }
    debug!("saved {} row(s) to {}", dataset.len(), path.display());
    Ok(())
}

/// Missing values are written as `?`. CSV keeps no quoting the reader can see,
/// so a text cell that is itself `?` or empty reloads as missing; such cells
/// are counted and logged.
fn save_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let ambiguous = ambiguous_csv_cells(dataset);
    if ambiguous > 0 {
        warn!(
            "{}: {ambiguous} text cell(s) equal to '?' or empty will reload as missing",
            path.display()
        );
    }
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer
        .write_record(dataset.schema().columns().iter().map(|c| c.name.as_str()))
        .context("writing CSV header")?;
    for row in dataset.rows() {
        writer
            .write_record(row.values().iter().map(|v| v.to_string()))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn ambiguous_csv_cells(dataset: &Dataset) -> usize {
    dataset
        .rows()
        .iter()
        .flat_map(|row| row.values())
        .filter(|v| matches!(v, Value::Text(s) | Value::Date(s) if s.trim().is_empty() || s.trim() == "?"))
        .count()
}

fn save_json(dataset: &Dataset, path: &Path) -> Result<()> {
    let columns = dataset.schema().columns();
    let records: Vec<JsonValue> = dataset
        .rows()
        .iter()
        .map(|row| {
            let obj: Map<String, JsonValue> = columns
                .iter()
                .zip(row.values())
                .map(|(col, v)| {
                    let json = match v {
                        Value::Missing => JsonValue::Null,
                        Value::Number(n) => serde_json::Number::from_f64(*n)
                            .map(JsonValue::Number)
                            .unwrap_or(JsonValue::Null),
                        Value::Text(s) | Value::Date(s) => JsonValue::String(s.clone()),
                    };
                    (col.name.clone(), json)
                })
                .collect();
            JsonValue::Object(obj)
        })
        .collect();
    let text = serde_json::to_string_pretty(&records).context("serialising JSON")?;
    std::fs::write(path, text).context("writing JSON file")?;
    Ok(())
}

/// Numeric columns are written as nullable Float64, everything else as
/// nullable Utf8.
fn save_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let columns = dataset.schema().columns();
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| {
            let data_type = match c.domain {
                Domain::Numeric => DataType::Float64,
                _ => DataType::Utf8,
            };
            Field::new(&c.name, data_type, true)
        })
        .collect();
    let schema = Arc::new(ArrowSchema::new(fields));

    let arrays: Vec<ArrayRef> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| -> ArrayRef {
            let cells = dataset.column_values(i);
            match c.domain {
                Domain::Numeric => Arc::new(Float64Array::from(
                    cells.map(Value::as_f64).collect::<Vec<Option<f64>>>(),
                )),
                _ => Arc::new(StringArray::from(
                    cells.map(Value::as_str).collect::<Vec<Option<&str>>>(),
                )),
            }
        })
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_file;
    use crate::data::model::{Column, Row, Schema};

    fn sample() -> Dataset {
        let schema = Arc::new(Schema::new(
            "sample",
            vec![
                Column::new("x", Domain::Numeric),
                Column::new("label", Domain::Nominal(vec!["a".into(), "b".into()])),
            ],
        ));
        let rows = vec![
            Row::new(vec![Value::Number(0.5), Value::Text("a".into())]),
            Row::new(vec![Value::Missing, Value::Text("b".into())]),
        ];
        Dataset::new(schema, rows).unwrap()
    }

    #[test]
    fn test_each_format_reloads() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["arff", "csv", "json", "parquet"] {
            let path = dir.path().join(format!("out.{ext}"));
            save_file(&sample(), &path).unwrap();
            let back = load_file(&path).unwrap();
            assert_eq!(back.len(), 2, "{ext}");
            let x = back.schema().index_of("x").unwrap();
            assert_eq!(back.rows()[0].get(x), Some(&Value::Number(0.5)), "{ext}");
            assert!(back.rows()[1].get(x).unwrap().is_missing(), "{ext}");
        }
    }

    #[test]
    fn test_csv_writes_missing_as_question_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_file(&sample(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "x,label\n0.5,a\n?,b\n");
    }

    #[test]
    fn test_csv_flags_text_that_reads_back_as_missing() {
        let schema = Arc::new(Schema::new("s", vec![Column::new("note", Domain::Text)]));
        let rows = ["?", "", "ok"]
            .into_iter()
            .map(|s| Row::new(vec![Value::Text(s.into())]))
            .collect();
        let ds = Dataset::new(schema, rows).unwrap();
        assert_eq!(ambiguous_csv_cells(&ds), 2);
        assert_eq!(ambiguous_csv_cells(&sample()), 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        save_file(&ds, &path).unwrap();
        let back = load_file(&path).unwrap();
        assert!(back.rows()[0].get(0).unwrap().is_missing());
        assert_eq!(back.rows()[2].get(0), Some(&Value::Text("ok".into())));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_file(&sample(), &dir.path().join("out.txt")).is_err());
    }
}
