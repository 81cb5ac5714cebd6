use crate::data::model::{Row, Schema};
use crate::error::FilterResult;

use super::{FilterKind, FilterOptions, Negotiated};

/// Passes every row through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllFilter;

impl AllFilter {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(AllFilter)
    }
}

impl FilterKind for AllFilter {
    fn name(&self) -> &'static str {
        "AllFilter"
    }

    fn set_options(&mut self, options: FilterOptions) -> FilterResult<()> {
        options.finish(self.name())
    }

    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    fn negotiate(
        &mut self,
        input: &Schema,
        target_index: Option<usize>,
    ) -> FilterResult<Negotiated> {
        Ok(Negotiated {
            columns: input.columns().to_vec(),
            target_index,
        })
    }

    fn transform(&self, row: Row) -> Option<Row> {
        Some(row)
    }
}
