use std::cmp::Ordering;

use crate::data::model::{Row, Schema};
use crate::error::{FilterResult, SchemaError};

use super::options::resolve_index;
use super::{Buffering, FilterKind, FilterOptions, Negotiated};

/// `-C <col>` (1-based, `first`, `last`; default `first`) and `-R` for
/// descending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    pub column: String,
    pub descending: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            column: "first".into(),
            descending: false,
        }
    }
}

/// Stable sort of each batch by one column, missing values last.
///
/// Rows are only emitted once end-of-input is signalled, since the last row
/// consumed may be the first one out.
#[derive(Debug, Default)]
pub struct Sort {
    config: SortConfig,
    column: usize,
}

impl Sort {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(Self::default())
    }
}

impl FilterKind for Sort {
    fn name(&self) -> &'static str {
        "Sort"
    }

    fn set_options(&mut self, mut options: FilterOptions) -> FilterResult<()> {
        let column = options
            .take_value(self.name(), "-C")?
            .unwrap_or_else(|| SortConfig::default().column);
        let descending = options.take_flag("-R");
        options.finish(self.name())?;
        self.config = SortConfig { column, descending };
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut out = vec!["-C".into(), self.config.column.clone()];
        if self.config.descending {
            out.push("-R".into());
        }
        out
    }

    fn buffering(&self) -> Buffering {
        Buffering::EveryBatch
    }

    fn negotiate(
        &mut self,
        input: &Schema,
        target_index: Option<usize>,
    ) -> FilterResult<Negotiated> {
        self.column = resolve_index(&self.config.column, input.len())
            .map_err(|e| SchemaError::Rejected(format!("sort column: {e}")))?;
        Ok(Negotiated {
            columns: input.columns().to_vec(),
            target_index,
        })
    }

    fn transform(&self, row: Row) -> Option<Row> {
        Some(row)
    }

    fn order(&self, rows: &mut [Row]) {
        let col = self.column;
        let descending = self.config.descending;
        rows.sort_by(|a, b| match (a.get(col), b.get(col)) {
            (Some(x), Some(y)) => match (x.is_missing(), y.is_missing()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ if descending => y.cmp(x),
                _ => x.cmp(y),
            },
            _ => Ordering::Equal,
        });
    }
}
