use crate::data::model::{Row, Schema};
use crate::error::{FilterResult, SchemaError};

use super::{FilterKind, FilterOptions, IndexRange, Negotiated};

/// `-R <range>` selects columns (1-based), `-V` keeps the selection instead
/// of removing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveConfig {
    pub range: IndexRange,
    pub invert: bool,
}

/// Drops a set of columns. Purely a schema change: rows stream through.
#[derive(Debug, Default)]
pub struct Remove {
    config: RemoveConfig,
    kept: Vec<usize>,
}

impl Remove {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(Self::default())
    }
}

impl FilterKind for Remove {
    fn name(&self) -> &'static str {
        "Remove"
    }

    fn set_options(&mut self, mut options: FilterOptions) -> FilterResult<()> {
        let range = options
            .take_value(self.name(), "-R")?
            .map(IndexRange::new)
            .unwrap_or_default();
        let invert = options.take_flag("-V");
        options.finish(self.name())?;
        self.config = RemoveConfig { range, invert };
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.config.range.as_str().is_empty() {
            out.push("-R".into());
            out.push(self.config.range.to_string());
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
        let selected = self
            .config
            .range
            .resolve(input.len())
            .map_err(|e| SchemaError::Rejected(format!("column range: {e}")))?;
        let kept: Vec<usize> = (0..input.len())
            .filter(|i| selected.binary_search(i).is_ok() == self.config.invert)
            .collect();
        if kept.is_empty() {
            return Err(SchemaError::Rejected("every column would be removed".into()).into());
        }

        let columns = kept
            .iter()
            .filter_map(|&i| input.column(i).cloned())
            .collect();
        // the target follows its column, or is dropped with it
        let target_index = target_index.and_then(|t| kept.iter().position(|&k| k == t));
        self.kept = kept;
        Ok(Negotiated {
            columns,
            target_index,
        })
    }

    fn transform(&self, row: Row) -> Option<Row> {
        let values = row.values();
        Some(Row::new(
            self.kept.iter().map(|&i| values[i].clone()).collect(),
        ))
    }
}
