//! Price data ingestion
//!
//! Reads a day-ahead price export, reconciles its timestamps and normalizes the
//! target column into a gap-free hourly series.

pub mod error;
pub mod normalize;
pub mod reconcile;
pub mod table;

pub use error::{DataError, DataResult};
pub use normalize::{DuplicatePolicy, Observation, PriceSeries, SeriesNormalizer};
pub use reconcile::{LayoutStrategy, Reconciled, TimestampLayout, TimestampReconciler};
pub use table::RawTable;
