use crate::data::model::{Row, Schema, Value};
use crate::error::FilterResult;

use super::{numeric_features, Buffering, FilterKind, FilterOptions, Negotiated};

/// `-S <scale>` and `-T <translation>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeConfig {
    pub scale: f64,
    pub translation: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: 0.0,
        }
    }
}

/// Min-max rescaling of every numeric column except the target.
///
/// The minimum and maximum are learned from the first batch only. Later
/// batches are rescaled with those frozen bounds, so their values may land
/// outside `[translation, translation + scale]`.
#[derive(Debug, Default)]
pub struct Normalize {
    config: NormalizeConfig,
    columns: Vec<usize>,
    /// `(min, max)` per entry of `columns`, once fitted.
    bounds: Option<Vec<(f64, f64)>>,
}

impl Normalize {
    pub fn boxed() -> Box<dyn FilterKind> {
        Box::new(Self::default())
    }

    pub fn config(&self) -> NormalizeConfig {
        self.config
    }
}

impl FilterKind for Normalize {
    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn set_options(&mut self, mut options: FilterOptions) -> FilterResult<()> {
        let defaults = NormalizeConfig::default();
        let config = NormalizeConfig {
            scale: options
                .take_parsed(self.name(), "-S")?
                .unwrap_or(defaults.scale),
            translation: options
                .take_parsed(self.name(), "-T")?
                .unwrap_or(defaults.translation),
        };
        options.finish(self.name())?;
        self.config = config;
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        vec![
            "-S".into(),
            self.config.scale.to_string(),
            "-T".into(),
            self.config.translation.to_string(),
        ]
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
        self.bounds = None;
        Ok(Negotiated {
            columns: input.columns().to_vec(),
            target_index,
        })
    }

    fn fit(&mut self, rows: &[Row]) -> FilterResult<()> {
        let bounds = self
            .columns
            .iter()
            .map(|&col| {
                rows.iter()
                    .filter_map(|r| r.get(col).and_then(Value::as_f64))
                    .filter(|v| !v.is_nan())
                    .fold((f64::NAN, f64::NAN), |(lo, hi), v| (lo.min(v), hi.max(v)))
            })
            .collect();
        self.bounds = Some(bounds);
        Ok(())
    }

    fn transform(&self, row: Row) -> Option<Row> {
        let Some(bounds) = &self.bounds else {
            return Some(row);
        };
        let mut values = row.into_values();
        for (&col, &(min, max)) in self.columns.iter().zip(bounds) {
            if let Some(Value::Number(v)) = values.get_mut(col) {
                *v = if min.is_nan() || max == min {
                    0.0
                } else {
                    (*v - min) / (max - min) * self.config.scale + self.config.translation
                };
            }
        }
        Some(Row::new(values))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::model::{Column, Dataset, Domain};
    use crate::filter::Filter;

    fn labelled(xs: &[f64]) -> Dataset {
        let schema = Arc::new(Schema::new(
            "points",
            vec![
                Column::new("x", Domain::Numeric),
                Column::new("label", Domain::Nominal(vec!["a".into(), "b".into()])),
            ],
        ));
        let rows = xs
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let label = if i % 2 == 0 { "a" } else { "b" };
                Row::new(vec![Value::Number(*x), Value::Text(label.into())])
            })
            .collect();
        let mut ds = Dataset::new(schema, rows).unwrap();
        ds.resolve_target_index("last").unwrap();
        ds
    }

    fn xs(ds: &Dataset) -> Vec<f64> {
        ds.column_values(0).filter_map(Value::as_f64).collect()
    }

    #[test]
    fn test_fit_on_first_apply_to_second() {
        let first = labelled(&[2.0, 4.0, 6.0, 10.0]);
        let second = labelled(&[0.0, 14.0, 6.0]);
        assert_eq!(first.target_index(), Some(1));

        let mut filter = Filter::new(Normalize::boxed());
        filter.configure(FilterOptions::default()).unwrap();
        assert!(!filter.negotiate_schema(&first).unwrap());

        let out1 = filter.batch_apply(&first).unwrap();
        assert_eq!(out1.schema().columns(), first.schema().columns());
        assert_eq!(xs(&out1), vec![0.0, 0.25, 0.5, 1.0]);
        assert_eq!(out1.column_values(1).collect::<Vec<_>>(), first.column_values(1).collect::<Vec<_>>());

        // bounds stay those of the first dataset: 0 and 14 fall outside [0, 1]
        let out2 = filter.batch_apply(&second).unwrap();
        assert_eq!(xs(&out2), vec![-0.25, 1.5, 0.5]);
        assert!(xs(&out2).iter().any(|v| !(0.0..=1.0).contains(v)));
        assert_eq!(out2.target_index(), Some(1));
    }

    #[test]
    fn test_scale_and_translation() {
        let ds = labelled(&[0.0, 5.0, 10.0]);
        let mut filter = Filter::new(Normalize::boxed());
        filter
            .configure(FilterOptions::new(["-S", "2", "-T", "-1"]))
            .unwrap();
        let out = filter.batch_apply(&ds).unwrap();
        assert_eq!(xs(&out), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let ds = labelled(&[3.0, 3.0]);
        let mut filter = Filter::new(Normalize::boxed());
        let out = filter.batch_apply(&ds).unwrap();
        assert_eq!(xs(&out), vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_values_stay_missing() {
        let schema = Arc::new(Schema::new("m", vec![Column::new("x", Domain::Numeric)]));
        let rows = vec![
            Row::new(vec![Value::Number(1.0)]),
            Row::new(vec![Value::Missing]),
            Row::new(vec![Value::Number(3.0)]),
        ];
        let ds = Dataset::new(schema, rows).unwrap();
        let mut filter = Filter::new(Normalize::boxed());
        let out = filter.batch_apply(&ds).unwrap();
        assert_eq!(
            out.column_values(0).cloned().collect::<Vec<_>>(),
            vec![Value::Number(0.0), Value::Missing, Value::Number(1.0)]
        );
    }

    #[test]
    fn test_options_last_write_wins() {
        let mut n = Normalize::default();
        n.set_options(FilterOptions::new(["-S", "5"])).unwrap();
        n.set_options(FilterOptions::new(["-T", "1"])).unwrap();
        assert_eq!(
            n.config(),
            NormalizeConfig {
                scale: 1.0,
                translation: 1.0
            }
        );
        assert_eq!(n.options(), vec!["-S", "1", "-T", "1"]);
    }
}
