use std::fmt;
use std::str::FromStr;

use crate::error::{FilterError, FilterResult};

// ---------------------------------------------------------------------------
// FilterOptions – the flat token list handed to a filter
// ---------------------------------------------------------------------------

/// Flat, ordered option tokens such as `["-S", "2.0", "-V"]`.
///
/// Each filter variant consumes the tokens it understands into its own
/// config struct and then calls [`FilterOptions::finish`], which rejects
/// anything left over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    tokens: Vec<String>,
}

impl FilterOptions {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterOptions {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Remove a boolean flag. Returns whether it was present.
    pub fn take_flag(&mut self, flag: &str) -> bool {
        match self.tokens.iter().position(|t| t == flag) {
            Some(pos) => {
                self.tokens.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove `flag value` and return the value. The value may itself start
    /// with `-` (e.g. `-T -1`).
    pub fn take_value(&mut self, filter: &str, flag: &str) -> FilterResult<Option<String>> {
        let Some(pos) = self.tokens.iter().position(|t| t == flag) else {
            return Ok(None);
        };
        if pos + 1 >= self.tokens.len() {
            return Err(FilterError::invalid_option(
                filter,
                format!("option {flag} requires a value"),
            ));
        }
        let value = self.tokens.remove(pos + 1);
        self.tokens.remove(pos);
        Ok(Some(value))
    }

    /// Like [`take_value`](Self::take_value), parsing the value.
    pub fn take_parsed<T>(&mut self, filter: &str, flag: &str) -> FilterResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.take_value(filter, flag)? {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
                FilterError::invalid_option(filter, format!("{flag} '{raw}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Fail if any token was not consumed.
    pub fn finish(self, filter: &str) -> FilterResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FilterError::invalid_option(
                filter,
                format!("unrecognised option(s): {}", self.tokens.join(" ")),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Index specs: 1-based, with `first` / `last`
// ---------------------------------------------------------------------------

fn resolve_one(token: &str, count: usize) -> Result<usize, String> {
    let index = match token.trim() {
        "first" => 1,
        "last" => count,
        other => other
            .parse::<usize>()
            .map_err(|_| format!("'{other}' is not an index"))?,
    };
    if index == 0 || index > count {
        return Err(format!("index {index} out of range (1..={count})"));
    }
    Ok(index - 1)
}

/// Resolve a single 1-based index spec (`first`, `last`, `3`) to a 0-based
/// position among `count` items.
pub fn resolve_index(spec: &str, count: usize) -> Result<usize, String> {
    resolve_one(spec, count)
}

/// A 1-based index range such as `first-3,5,last`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRange(String);

impl IndexRange {
    pub fn new(spec: impl Into<String>) -> Self {
        IndexRange(spec.into())
    }

    pub fn all() -> Self {
        IndexRange::new("first-last")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sorted, de-duplicated 0-based indices selected among `count` items.
    pub fn resolve(&self, count: usize) -> Result<Vec<usize>, String> {
        let mut selected = Vec::new();
        for part in self.0.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((from, to)) => {
                    let from = resolve_one(from, count)?;
                    let to = resolve_one(to, count)?;
                    if from > to {
                        return Err(format!("descending range '{part}'"));
                    }
                    selected.extend(from..=to);
                }
                None => selected.push(resolve_one(part, count)?),
            }
        }
        selected.sort_unstable();
        selected.dedup();
        Ok(selected)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
