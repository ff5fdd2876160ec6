#![forbid(unsafe_code)]
//! ukbpq-core: shared kernel for the ukbpq converter.
//!
//! This crate contains only *pure* types and small helpers that the other
//! crates build on. There is **no file I/O** here.
//!
//! Crates that use this:
//! - ukbpq-planner: parses configs and resolves `ColumnPlan`s from a `DtypeTable`.
//! - ukbpq-io: fills `RowBatch`es from TSV input and writes them as Parquet.
//! - ukbpq-exec: orchestrates a conversion and emits a `RunManifest`.

pub mod config;
pub mod dictionary;
pub mod dtype;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod plan;
pub mod schema;
pub mod stats;
pub mod types;

#[cfg(feature = "arrow")]
pub mod arrow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
