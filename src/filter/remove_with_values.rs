use std::collections::BTreeSet;

use crate::data::model::{Domain, Row, Schema, Value};
use crate::error::{FilterResult, SchemaError};

use super::options::resolve_index;
use super::{FilterKind, FilterOptions, IndexRange, Negotiated};

/// Options of [`RemoveWithValues`].
///
/// * `-C <col>` column to test (1-based, `first`, `last`; default `last`)
/// * `-L <labels>` nominal labels that match (1-based range; default all)
/// * `-S <split>` numeric columns match below this value (default 0)
/// * `-M` missing values match
/// * `-V` keep matching rows instead of removing them
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveWithValuesConfig {
    pub column: String,
    pub labels: IndexRange,
    pub split_point: f64,
    pub match_missing: bool,
    pub invert: bool,
}

impl Default for RemoveWithValuesConfig {
    fn default() -> Self {
        Self {
            column: "last".into(),
            labels: IndexRange::all(),
            split_point: 0.0,
            match_missing: false,
            invert: false,
        }
    }
}

/// Removes the rows whose value in one column matches.
///
/// A row matches when:
/// * its value is missing and `-M` is set
/// * the column is nominal and the value is one of the selected labels
/// * the column is numeric and the value is below the split point
#[derive(Debug, Default)]
pub struct RemoveWithValues {
    config: RemoveWithValuesConfig,
    column: usize,
    /// Selected labels, when the column is nominal.
    selected: Option<BTreeSet<Value>>,
}

impl RemoveWithValues {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(Self::default())
    }

    fn matches(&self, value: &Value) -> bool {
        match (value, &self.selected) {
            (Value::Missing, _) => self.config.match_missing,
            (Value::Number(v), None) => *v < self.config.split_point,
            (other, Some(selected)) => selected.contains(other),
            _ => false,
        }
    }
}

impl FilterKind for RemoveWithValues {
    fn name(&self) -> &'static str {
        "RemoveWithValues"
    }

    fn set_options(&mut self, mut options: FilterOptions) -> FilterResult<()> {
        let name = self.name();
        let defaults = RemoveWithValuesConfig::default();
        let config = RemoveWithValuesConfig {
            column: options.take_value(name, "-C")?.unwrap_or(defaults.column),
            labels: options
                .take_value(name, "-L")?
                .map(IndexRange::new)
                .unwrap_or(defaults.labels),
            split_point: options
                .take_parsed(name, "-S")?
                .unwrap_or(defaults.split_point),
            match_missing: options.take_flag("-M"),
            invert: options.take_flag("-V"),
        };
        options.finish(name)?;
        self.config = config;
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut out = vec![
            "-C".into(),
            self.config.column.clone(),
            "-L".into(),
            self.config.labels.to_string(),
            "-S".into(),
            self.config.split_point.to_string(),
        ];
        if self.config.match_missing {
            out.push("-M".into());
        }
        if self.config.invert {
            out.push("-V".into());
        }
        out
    }

    fn negotiate(
        &mut self,
        input: &Schema,
        target_index: Option<usize>,
    ) -> FilterResult<Negotiated> {
        let column = resolve_index(&self.config.column, input.len())
            .map_err(|e| SchemaError::Rejected(format!("column: {e}")))?;
        let Some(col) = input.column(column) else {
            return Err(SchemaError::Rejected(format!("no column {column}")).into());
        };

        self.selected = match &col.domain {
            Domain::Nominal(labels) => {
                let picked = self
                    .config
                    .labels
                    .resolve(labels.len())
                    .map_err(|e| SchemaError::Rejected(format!("labels of '{}': {e}", col.name)))?;
                Some(
                    picked
                        .into_iter()
                        .map(|i| Value::Text(labels[i].clone()))
                        .collect(),
                )
            }
            Domain::Numeric => None,
            _ => {
                return Err(SchemaError::Rejected(format!(
                    "column '{}' is neither nominal nor numeric",
                    col.name
                ))
                .into())
            }
        };
        self.column = column;

        Ok(Negotiated {
            columns: input.columns().to_vec(),
            target_index,
        })
    }

    fn transform(&self, row: Row) -> Option<Row> {
        let matched = row.get(self.column).is_some_and(|v| self.matches(v));
        if matched == self.config.invert {
            Some(row)
        } else {
            None
        }
    }
}
