#![forbid(unsafe_code)]
//! ukbpq-exec: runs one conversion from TSV export to Parquet parts.
//!
//! - `runtime`: the `Converter` pipeline (checks, planning, streaming, README).
//! - `scheduler`: how rows are spread over part files.

pub mod runtime;
pub mod scheduler;

pub use runtime::{ConversionJob, Converter, ExecError, DEFAULT_BATCH_ROWS};
pub use scheduler::{even_row_counts, PartCursor, PartitionPlan};
