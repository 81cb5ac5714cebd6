/// Data layer: core types, loading, and saving.
///
/// Architecture:
/// ```text
///  .arff / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Dataset    │  Arc<Schema>, Vec<Row>, target index
///   └──────────────┘
///        │   (crate::filter)
///        ▼
///   ┌──────────┐
///   │  saver   │  Dataset → file, format by extension
///   └──────────┘
/// ```
pub mod arff;
pub mod loader;
pub mod model;
pub mod saver;
