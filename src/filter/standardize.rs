use crate::data::model::{Row, Schema, Value};
use crate::error::FilterResult;

use super::{numeric_features, Buffering, FilterKind, FilterOptions, Negotiated};

/// Zero mean, unit variance for every numeric non-target column, using the
/// mean and sample standard deviation of the first batch.
#[derive(Debug, Default)]
pub struct Standardize {
    columns: Vec<usize>,
    /// `(mean, std_dev)` per entry of `columns`, once fitted.
    moments: Option<Vec<(f64, f64)>>,
}

impl Standardize {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(Self::default())
    }
}

fn moments(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

impl FilterKind for Standardize {
    fn name(&self) -> &'static str {
        "Standardize"
    }

    fn set_options(&mut self, options: FilterOptions) -> FilterResult<()> {
        options.finish(self.name())
    }

    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    fn buffering(&self) -> Buffering {
        Buffering::FirstBatch
    }

    fn negotiate(
        &mut self,
        input: &Schema,
        target_index: Option<usize>,
    ) -> FilterResult<Negotiated> {
        self.columns = numeric_features(input, target_index);
        self.moments = None;
        Ok(Negotiated {
            columns: input.columns().to_vec(),
            target_index,
        })
    }

    fn fit(&mut self, rows: &[Row]) -> FilterResult<()> {
        self.moments = Some(
            self.columns
                .iter()
                .map(|&col| {
                    let values: Vec<f64> = rows
                        .iter()
                        .filter_map(|r| r.get(col).and_then(Value::as_f64))
                        .filter(|v| !v.is_nan())
                        .collect();
                    moments(&values)
                })
                .collect(),
        );
        Ok(())
    }

    fn transform(&self, row: Row) -> Option<Row> {
        let Some(moments) = &self.moments else {
            return Some(row);
        };
        let mut values = row.into_values();
        for (&col, &(mean, sd)) in self.columns.iter().zip(moments) {
            if let Some(Value::Number(v)) = values.get_mut(col) {
                *v = if sd > 0.0 { (*v - mean) / sd } else { *v - mean };
            }
        }
        Some(Row::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::numeric_dataset;
    use crate::filter::Filter;

    #[test]
    fn test_moments() {
        assert_eq!(moments(&[]), (0.0, 0.0));
        assert_eq!(moments(&[4.0]), (4.0, 0.0));
        assert_eq!(moments(&[1.0, 3.0]), (2.0, 2f64.sqrt()));
    }

    #[test]
    fn test_target_column_untouched() {
        let mut ds = numeric_dataset(&[[1.0, 10.0, 7.0], [3.0, 10.0, 9.0]]);
        ds.set_target_index(2).unwrap();
        let mut filter = Filter::new(Standardize::boxed());
        let out = filter.batch_apply(&ds).unwrap();

        let a: Vec<f64> = out.column_values(0).filter_map(Value::as_f64).collect();
        let b: Vec<f64> = out.column_values(1).filter_map(Value::as_f64).collect();
        let c: Vec<f64> = out.column_values(2).filter_map(Value::as_f64).collect();
        let sd = 2f64.sqrt();
        assert_eq!(a, vec![-1.0 / sd, 1.0 / sd]);
        // constant column is only centred
        assert_eq!(b, vec![0.0, 0.0]);
        assert_eq!(c, vec![7.0, 9.0]);
    }

    #[test]
    fn test_second_batch_uses_first_moments() {
        let mut filter = Filter::new(Standardize::boxed());
        filter
            .batch_apply(&numeric_dataset(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]))
            .unwrap();
        let out = filter
            .batch_apply(&numeric_dataset(&[[1.0 + 2f64.sqrt(), 5.0, 0.0]]))
            .unwrap();
        let a = out.rows()[0].get(0).and_then(Value::as_f64).unwrap();
        assert!((a - 1.0).abs() < 1e-12);
        assert_eq!(out.rows()[0].get(1), Some(&Value::Number(5.0)));
    }
}
