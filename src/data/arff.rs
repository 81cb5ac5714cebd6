//! ARFF, the attribute-relation text format: a `@relation` line, one
//! `@attribute` line per column, then comma-separated `@data` rows with `?`
//! for missing values.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::model::{Column, Dataset, Domain, Row, Schema, Value};

const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ss";

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Split on `sep`, honouring single/double quotes and backslash escapes.
/// Each field carries whether it was quoted, so `'?'` is not read as missing.
fn split_fields(line: &str, sep: char) -> Result<Vec<(String, bool)>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) if c == '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                quoted = true;
            }
            None if c == sep => {
                fields.push((current.trim().to_string(), quoted));
                current.clear();
                quoted = false;
            }
            None => current.push(c),
        }
    }
    if quote.is_some() {
        bail!("unterminated quote");
    }
    fields.push((current.trim().to_string(), quoted));
    Ok(fields)
}

/// Split off the first (possibly quoted) word. Quoted words take the same
/// backslash escapes as [`split_fields`].
fn take_word(s: &str) -> Result<(String, &str)> {
    let s = s.trim_start();
    match s.chars().next() {
        Some(q @ ('\'' | '"')) => {
            let mut word = String::new();
            let mut chars = s.char_indices().skip(1);
            while let Some((i, c)) = chars.next() {
                if c == q {
                    return Ok((word, &s[i + c.len_utf8()..]));
                }
                if c == '\\' {
                    if let Some((_, next)) = chars.next() {
                        word.push(next);
                    }
                } else {
                    word.push(c);
                }
            }
            bail!("unterminated quote in '{s}'")
        }
        Some(_) => {
            let end = s.find(char::is_whitespace).unwrap_or(s.len());
            Ok((s[..end].to_string(), &s[end..]))
        }
        None => bail!("expected a name"),
    }
}

fn parse_attribute(rest: &str) -> Result<Column> {
    let (name, rest) = take_word(rest)?;
    let rest = rest.trim();

    let domain = if let Some(body) = rest.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .with_context(|| format!("attribute '{name}': unterminated label list"))?;
        let labels = split_fields(body, ',')?
            .into_iter()
            .map(|(label, _)| label)
            .filter(|label| !label.is_empty())
            .collect();
        Domain::Nominal(labels)
    } else {
        let (kind, format) = take_word(rest)
            .with_context(|| format!("attribute '{name}': missing type"))?;
        match kind.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => Domain::Numeric,
            "string" => Domain::Text,
            "date" => {
                let format = format.trim();
                if format.is_empty() {
                    Domain::Date(DEFAULT_DATE_FORMAT.to_string())
                } else {
                    Domain::Date(take_word(format)?.0)
                }
            }
            other => bail!("attribute '{name}': unsupported type '{other}'"),
        }
    };
    Ok(Column::new(name, domain))
}

fn parse_value(raw: &str, quoted: bool, column: &Column) -> Result<Value> {
    if raw == "?" && !quoted {
        return Ok(Value::Missing);
    }
    match &column.domain {
        Domain::Numeric => raw
            .parse::<f64>()
            .map(Value::Number)
            .with_context(|| format!("'{raw}' is not a number")),
        Domain::Nominal(labels) => {
            if !labels.iter().any(|l| l == raw) {
                bail!("'{raw}' is not a declared label of '{}'", column.name);
            }
            Ok(Value::Text(raw.to_string()))
        }
        Domain::Text => Ok(Value::Text(raw.to_string())),
        Domain::Date(_) => Ok(Value::Date(raw.to_string())),
    }
}

/// Parse ARFF text. `fallback_relation` is used when there is no `@relation`.
pub fn parse(text: &str, fallback_relation: &str) -> Result<Dataset> {
    let mut relation = fallback_relation.to_string();
    let mut columns = Vec::new();
    let mut lines = text.lines().enumerate();

    // header
    let mut in_data = false;
    for (no, line) in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let (keyword, rest) = line.split_at(line.find(char::is_whitespace).unwrap_or(line.len()));
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => relation = take_word(rest).with_context(|| format!("line {}", no + 1))?.0,
            "@attribute" => columns.push(parse_attribute(rest).with_context(|| format!("line {}", no + 1))?),
            "@data" => {
                in_data = true;
                break;
            }
            other => bail!("line {}: unexpected '{other}' in header", no + 1),
        }
    }
    if !in_data {
        bail!("missing @data section");
    }
    if columns.is_empty() {
        bail!("no @attribute declarations");
    }

    let mut rows = Vec::new();
    for (no, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        if line.starts_with('{') {
            bail!("line {}: sparse rows are not supported", no + 1);
        }
        let fields = split_fields(line, ',').with_context(|| format!("line {}", no + 1))?;
        if fields.len() != columns.len() {
            bail!(
                "line {}: {} value(s), expected {}",
                no + 1,
                fields.len(),
                columns.len()
            );
        }
        let values = fields
            .iter()
            .zip(&columns)
            .map(|((raw, quoted), col)| parse_value(raw, *quoted, col))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("line {}", no + 1))?;
        rows.push(Row::new(values));
    }

    Ok(Dataset::new(Arc::new(Schema::new(relation, columns)), rows)?)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s == "?"
        || s.chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '%' | '{' | '}' | '\\'));
    if !needs_quotes {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Render a dataset as ARFF text.
pub fn render(dataset: &Dataset) -> String {
    let schema = dataset.schema();
    let mut out = format!("@relation {}\n\n", quote(&schema.relation));
    for col in schema.columns() {
        let kind = match &col.domain {
            Domain::Numeric => "numeric".to_string(),
            Domain::Text => "string".to_string(),
            Domain::Date(format) => format!("date {}", quote(format)),
            Domain::Nominal(labels) => format!(
                "{{{}}}",
                labels.iter().map(|l| quote(l)).collect::<Vec<_>>().join(",")
            ),
        };
        out.push_str(&format!("@attribute {} {kind}\n", quote(&col.name)));
    }
    out.push_str("\n@data\n");
    for row in dataset.rows() {
        let line = row
            .values()
            .iter()
            .map(|v| match v {
                Value::Missing => "?".to_string(),
                Value::Number(n) => n.to_string(),
                Value::Text(s) | Value::Date(s) => quote(s),
            })
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
