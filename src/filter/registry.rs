//! Name → constructor table of the filter variants.
//!
//! Names are matched case-insensitively, and dotted class-style names
//! (`weka.filters.unsupervised.attribute.Normalize`) are matched by their last
//! segment.

use log::debug;

use super::{AllFilter, Filter, FilterKind, Normalize, Remove, RemoveWithValues, Sort, Standardize};
use crate::error::{FilterError, FilterResult};

type Constructor = fn() -> Box<dyn FilterKind>;

const FILTERS: &[(&str, Constructor)] = &[
    ("AllFilter", AllFilter::boxed),
    ("Normalize", Normalize::boxed),
    ("Standardize", Standardize::boxed),
    ("Remove", Remove::boxed),
    ("RemoveWithValues", RemoveWithValues::boxed),
    ("Sort", Sort::boxed),
];

/// Registered filter names.
pub fn available() -> Vec<&'static str> {
    FILTERS.iter().map(|(name, _)| *name).collect()
}

/// Instantiate the filter registered under `name`.
pub fn create(name: &str) -> FilterResult<Filter> {
    let short = name.rsplit('.').next().unwrap_or(name).trim();
    let (registered, constructor) = FILTERS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(short))
        .ok_or_else(|| FilterError::UnknownFilter {
            name: name.to_string(),
            available: available().join(", "),
        })?;
    debug!("filter '{name}' resolved to {registered}");
    Ok(Filter::new(constructor()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_name_creates_its_filter() {
        for name in available() {
            assert_eq!(create(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_lookup_by_class_name_and_case() {
        assert_eq!(
            create("weka.filters.unsupervised.attribute.Normalize")
                .unwrap()
                .name(),
            "Normalize"
        );
        assert_eq!(create("allfilter").unwrap().name(), "AllFilter");
    }

    #[test]
    fn test_unknown_filter() {
        let err = create("Discretize").unwrap_err();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("Discretize"));
        assert!(msg.contains("Normalize"));
    }
}
