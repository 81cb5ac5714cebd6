//! Filters: the negotiate / consume / produce lifecycle and its variants.
//!
//! ```text
//!   registry::create("Normalize")
//!        │
//!        ▼
//!   ┌──────────────┐  configure(options)
//!   │ Unconfigured │
//!   └──────────────┘
//!        │ negotiate_schema(dataset 1)   ← fixes output schema, resets state
//!        ▼
//!   ┌──────────────┐  consume_row / finish_input / produce_row
//!   │  Negotiated  │──────────────────────────────▶ Ready
//!   └──────────────┘
//!        │ batch_apply(dataset 1), batch_apply(dataset 2), ...
//!        ▼
//!   ┌──────────────┐
//!   │   Batched    │  learned state stays frozen across datasets
//!   └──────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::data::model::{Column, Dataset, Row, Schema};
use crate::error::{FilterResult, ProtocolError, SchemaError};

pub mod options;
pub mod registry;

mod all_filter;
mod normalize;
mod remove;
mod remove_with_values;
mod sort;
mod standardize;

pub use all_filter::AllFilter;
pub use normalize::{Normalize, NormalizeConfig};
pub use options::{FilterOptions, IndexRange};
pub use remove::{Remove, RemoveConfig};
pub use remove_with_values::{RemoveWithValues, RemoveWithValuesConfig};
pub use sort::{Sort, SortConfig};
pub use standardize::Standardize;

// ---------------------------------------------------------------------------
// FilterKind – what a concrete filter variant provides
// ---------------------------------------------------------------------------

/// How many input rows a variant must see before it can emit anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffering {
    /// Every row is transformed as soon as it arrives.
    Streaming,
    /// The whole first batch is needed to learn parameters; later batches
    /// stream through the frozen parameters.
    FirstBatch,
    /// Every batch is held until end-of-input (reordering filters).
    EveryBatch,
}

/// Output format decided by a variant during negotiation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub columns: Vec<Column>,
    pub target_index: Option<usize>,
}

/// A concrete transformation. [`Filter`] drives the lifecycle; variants only
/// describe their schema mapping and per-row behaviour.
pub trait FilterKind: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Parse option tokens into the variant's config. Replaces any previous
    /// configuration.
    fn set_options(&mut self, options: FilterOptions) -> FilterResult<()>;

    /// Current configuration as option tokens.
    fn options(&self) -> Vec<String>;

    fn buffering(&self) -> Buffering {
        Buffering::Streaming
    }

    /// Decide the output format for `input` and forget anything learned from
    /// earlier data.
    fn negotiate(&mut self, input: &Schema, target_index: Option<usize>)
        -> FilterResult<Negotiated>;

    /// Learn parameters from the complete first batch.
    fn fit(&mut self, _rows: &[Row]) -> FilterResult<()> {
        Ok(())
    }

    /// Transform one row. `None` drops it.
    fn transform(&self, row: Row) -> Option<Row>;

    /// Reorder a complete batch before it is emitted.
    fn order(&self, _rows: &mut [Row]) {}
}

/// Numeric columns other than the target, the ones statistics filters touch.
pub(crate) fn numeric_features(schema: &Schema, target_index: Option<usize>) -> Vec<usize> {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, c)| c.domain.is_numeric() && Some(*i) != target_index)
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Filter – the lifecycle state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Unconfigured,
    Negotiated,
    /// First batch finished; rows stream through the frozen state.
    Ready,
    /// At least one dataset went through [`Filter::batch_apply`].
    Batched,
}

#[derive(Debug)]
pub struct Filter {
    kind: Box<dyn FilterKind>,
    state: FilterState,
    input_schema: Option<Arc<Schema>>,
    output_schema: Option<Arc<Schema>>,
    output_target: Option<usize>,
    /// Rows held back until end-of-input.
    pending: Vec<Row>,
    /// Transformed rows waiting for `produce_row`.
    queue: VecDeque<Row>,
    first_batch_done: bool,
}

impl Filter {
    pub fn new(kind: Box<dyn FilterKind>) -> Self {
        Filter {
            kind,
            state: FilterState::Unconfigured,
            input_schema: None,
            output_schema: None,
            output_target: None,
            pending: Vec::new(),
            queue: VecDeque::new(),
            first_batch_done: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Apply option tokens. Only allowed before negotiation; the last call wins.
    pub fn configure(&mut self, options: FilterOptions) -> FilterResult<()> {
        if self.state != FilterState::Unconfigured {
            return Err(ProtocolError::AlreadyNegotiated.into());
        }
        self.kind.set_options(options)
    }

    pub fn options(&self) -> Vec<String> {
        self.kind.options()
    }

    /// `name` followed by the current options, as typed on a command line.
    pub fn description(&self) -> String {
        std::iter::once(self.name().to_string())
            .chain(self.options())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fix the output schema for `input` (whose target index must already be
    /// set) and reset anything learned before.
    ///
    /// Returns `true` when rows can be produced as soon as they are consumed,
    /// `false` when the filter must see a whole batch first.
    pub fn negotiate_schema(&mut self, input: &Dataset) -> FilterResult<bool> {
        let negotiated = self.kind.negotiate(input.schema(), input.target_index())?;

        let relation = format!(
            "{}-{}{}",
            input.schema().relation,
            self.name(),
            self.options().concat()
        );
        let output = Arc::new(Schema::new(relation, negotiated.columns));
        debug!(
            "{}: negotiated {} -> {} column(s), target {:?} -> {:?}",
            self.name(),
            input.column_count(),
            output.len(),
            input.target_index(),
            negotiated.target_index
        );

        self.input_schema = Some(input.schema().clone());
        self.output_schema = Some(output);
        self.output_target = negotiated.target_index;
        self.pending.clear();
        self.queue.clear();
        self.first_batch_done = false;
        self.state = FilterState::Negotiated;

        Ok(self.kind.buffering() == Buffering::Streaming)
    }

    pub fn output_schema(&self) -> Option<&Arc<Schema>> {
        self.output_schema.as_ref()
    }

    pub fn output_target_index(&self) -> Option<usize> {
        self.output_target
    }

    /// Feed one row. Returns whether at least one output row is available.
    pub fn consume_row(&mut self, row: Row) -> FilterResult<bool> {
        let input = self
            .input_schema
            .as_ref()
            .ok_or(ProtocolError::NotNegotiated)?;
        if row.len() != input.len() {
            return Err(SchemaError::RowWidth {
                expected: input.len(),
                found: row.len(),
            }
            .into());
        }

        let hold = match self.kind.buffering() {
            Buffering::Streaming => false,
            Buffering::FirstBatch => !self.first_batch_done,
            Buffering::EveryBatch => true,
        };
        if hold {
            self.pending.push(row);
        } else if let Some(out) = self.kind.transform(row) {
            self.queue.push_back(out);
        }
        Ok(!self.queue.is_empty())
    }

    /// Signal end-of-input for the current batch. Returns whether output is
    /// available.
    pub fn finish_input(&mut self) -> FilterResult<bool> {
        if self.input_schema.is_none() {
            return Err(ProtocolError::NotNegotiated.into());
        }

        let rows = std::mem::take(&mut self.pending);
        match self.kind.buffering() {
            Buffering::Streaming => {}
            Buffering::FirstBatch => {
                if !self.first_batch_done {
                    self.kind.fit(&rows)?;
                    debug!("{}: learned parameters from {} row(s)", self.name(), rows.len());
                }
                let kind = &self.kind;
                self.queue
                    .extend(rows.into_iter().filter_map(|r| kind.transform(r)));
            }
            Buffering::EveryBatch => {
                let kind = &self.kind;
                let mut out: Vec<Row> = rows.into_iter().filter_map(|r| kind.transform(r)).collect();
                kind.order(&mut out);
                self.queue.extend(out);
            }
        }

        self.first_batch_done = true;
        if self.state == FilterState::Negotiated {
            self.state = FilterState::Ready;
        }
        Ok(!self.queue.is_empty())
    }

    /// Take the next output row.
    pub fn produce_row(&mut self) -> FilterResult<Row> {
        self.queue
            .pop_front()
            .ok_or_else(|| ProtocolError::NoRowAvailable.into())
    }

    pub fn has_output(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_output(&self) -> usize {
        self.queue.len()
    }

    /// Filter a whole dataset.
    ///
    /// Negotiates against `input` only if nothing has been negotiated yet. A
    /// filter that already negotiated keeps its output schema and learned
    /// parameters, so the same transformation is applied to every dataset
    /// passed here.
    pub fn batch_apply(&mut self, input: &Dataset) -> FilterResult<Dataset> {
        if self.output_schema.is_none() {
            self.negotiate_schema(input)?;
        }
        if !self.queue.is_empty() || !self.pending.is_empty() {
            warn!(
                "{}: discarding {} unread row(s) from earlier streaming",
                self.name(),
                self.queue.len() + self.pending.len()
            );
            self.queue.clear();
            self.pending.clear();
        }

        for row in input.rows() {
            self.consume_row(row.clone())?;
        }
        self.finish_input()?;

        let rows: Vec<Row> = self.queue.drain(..).collect();
        let schema = self
            .output_schema
            .clone()
            .ok_or(ProtocolError::NotNegotiated)?;
        let mut output = Dataset::new(schema, rows)?;
        if let Some(target) = self.output_target {
            output.set_target_index(target)?;
        }
        debug!(
            "{}: {} row(s) in, {} row(s) out",
            self.name(),
            input.len(),
            output.len()
        );

        self.state = FilterState::Batched;
        Ok(output)
    }
}
