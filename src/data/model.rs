use std::fmt;
use std::sync::Arc;

use crate::error::{IndexError, SchemaError};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Filters keep values in ordered sets and sort rows by them, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    /// Nominal labels and free text.
    Text(String),
    /// Date kept in its textual form.
    Date(String),
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Text(_) => 2,
                Date(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) | Value::Date(s) => s.hash(state),
            Value::Number(f) => f.to_bits().hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "?"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Text(s) | Value::Date(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

// ---------------------------------------------------------------------------
// Schema – relation name and ordered column descriptors
// ---------------------------------------------------------------------------

/// The set of values a column may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Domain {
    Numeric,
    /// Categorical column with its declared labels, in declaration order.
    Nominal(Vec<String>),
    Text,
    /// Date column with its textual format.
    Date(String),
}

impl Domain {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Domain::Numeric)
    }

    /// Same kind of domain; nominal domains must also declare the same labels.
    pub fn is_compatible(&self, other: &Domain) -> bool {
        match (self, other) {
            (Domain::Nominal(a), Domain::Nominal(b)) => a == b,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub domain: Domain,
}

impl Column {
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        Column {
            name: name.into(),
            domain,
        }
    }
}

/// Ordered column descriptors. Column count and order never change once a
/// dataset has been built on top of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub relation: String,
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(relation: impl Into<String>, columns: Vec<Column>) -> Self {
        Schema {
            relation: relation.into(),
            columns,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Resolve a target-column spec against this schema.
    ///
    /// * `first` → 0
    /// * `last` → last column
    /// * a non-negative integer → itself, if it names an existing column
    ///
    /// Everything else is [`IndexError::InvalidIndex`].
    pub fn resolve_target_index(&self, spec: &str) -> Result<usize, IndexError> {
        let invalid = || IndexError::InvalidIndex {
            spec: spec.to_string(),
            columns: self.len(),
        };
        if self.is_empty() {
            return Err(invalid());
        }
        match spec.trim() {
            "first" => Ok(0),
            "last" => Ok(self.len() - 1),
            other => match other.parse::<usize>() {
                Ok(i) if i < self.len() => Ok(i),
                _ => Err(invalid()),
            },
        }
    }

    /// Column count matches and every pair of domains is compatible.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        self.len() == other.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.domain.is_compatible(&b.domain))
    }
}

// ---------------------------------------------------------------------------
// Row – one record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A schema, its rows, and the designated target (class) column.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Vec<Row>,
    target_index: Option<usize>,
}

impl Dataset {
    /// Build a dataset, checking every row has one value per column.
    pub fn new(schema: Arc<Schema>, rows: Vec<Row>) -> Result<Self, SchemaError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != schema.len()) {
            return Err(SchemaError::RowWidth {
                expected: schema.len(),
                found: bad.len(),
            });
        }
        Ok(Dataset {
            schema,
            rows,
            target_index: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    pub fn target_index(&self) -> Option<usize> {
        self.target_index
    }

    pub fn set_target_index(&mut self, index: usize) -> Result<(), IndexError> {
        if index >= self.schema.len() {
            return Err(IndexError::OutOfRange {
                index,
                columns: self.schema.len(),
            });
        }
        self.target_index = Some(index);
        Ok(())
    }

    pub fn clear_target_index(&mut self) {
        self.target_index = None;
    }

    /// Resolve `spec` against this dataset's own schema and apply it.
    pub fn resolve_target_index(&mut self, spec: &str) -> Result<usize, IndexError> {
        let index = self.schema.resolve_target_index(spec)?;
        self.set_target_index(index)?;
        Ok(index)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |r| r.get(index))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
